//! Loader for ASCII PLY files with triangle faces.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use super::{Mesh, MeshLoadError};
use crate::geometry::WorldPoint;

pub fn load(path: &Path) -> Result<Mesh, MeshLoadError> {
    parse(BufReader::new(File::open(path)?))
}

pub fn parse(input: impl BufRead) -> Result<Mesh, MeshLoadError> {
    let mut lines = Lines {
        inner: input.lines(),
        number: 0,
    };

    let header = parse_header(&mut lines)?;

    let mut mesh = Mesh {
        vertices: Vec::with_capacity(header.vertex_count),
        indices: Vec::with_capacity(header.face_count),
    };

    for _ in 0..header.vertex_count {
        let line = lines.expect_next("vertex")?;
        let mut fields = line.split_whitespace();
        let mut coordinate = || lines.parse_field::<f32>(fields.next(), "vertex coordinate");
        mesh.vertices
            .push(WorldPoint::new(coordinate()?, coordinate()?, coordinate()?));
    }

    for _ in 0..header.face_count {
        let line = lines.expect_next("face")?;
        let mut fields = line.split_whitespace();
        let count = lines.parse_field::<u32>(fields.next(), "face vertex count")?;
        if count != 3 {
            return Err(lines.error(format!("Only triangles are supported, face has {count} vertices")));
        }
        let mut index = || lines.parse_field::<u32>(fields.next(), "vertex index");
        mesh.indices.push([index()?, index()?, index()?]);
    }

    while let Some(line) = lines.next()? {
        if !line.trim().is_empty() {
            return Err(lines.error("Unexpected data after the last face"));
        }
    }

    Ok(mesh)
}

struct Header {
    vertex_count: usize,
    face_count: usize,
}

fn parse_header(lines: &mut Lines<impl BufRead>) -> Result<Header, MeshLoadError> {
    if lines.expect_next("header")?.trim() != "ply" {
        return Err(lines.error("Missing `ply` magic"));
    }
    if lines.expect_next("header")?.trim() != "format ascii 1.0" {
        return Err(lines.error("Only `format ascii 1.0` is supported"));
    }

    let mut vertex_count = None;
    let mut face_count = None;

    loop {
        let line = lines.expect_next("header")?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["end_header"] => break,
            ["element", "vertex", count] => {
                vertex_count = Some(lines.parse_field::<usize>(Some(*count), "vertex count")?)
            }
            ["element", "face", count] => {
                face_count = Some(lines.parse_field::<usize>(Some(*count), "face count")?)
            }
            ["element", ..] => return Err(lines.error(format!("Unsupported element: {line}"))),
            _ => {}
        }
    }

    match (vertex_count, face_count) {
        (Some(vertex_count), Some(face_count)) => Ok(Header {
            vertex_count,
            face_count,
        }),
        _ => Err(lines.error("Header must declare both vertex and face elements")),
    }
}

/// Line iterator that remembers the current line number for error messages.
struct Lines<R> {
    inner: std::io::Lines<R>,
    number: usize,
}

impl<R: BufRead> Lines<R> {
    fn next(&mut self) -> Result<Option<String>, MeshLoadError> {
        match self.inner.next() {
            Some(line) => {
                self.number += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn expect_next(&mut self, what: &str) -> Result<String, MeshLoadError> {
        self.next()?
            .ok_or_else(|| self.error(format!("Unexpected end of file, expected {what}")))
    }

    fn parse_field<T: FromStr>(&self, field: Option<&str>, what: &str) -> Result<T, MeshLoadError> {
        let field = field.ok_or_else(|| self.error(format!("Missing {what}")))?;
        field
            .parse()
            .map_err(|_| self.error(format!("Invalid {what}: {field:?}")))
    }

    fn error(&self, message: impl Into<String>) -> MeshLoadError {
        MeshLoadError::Ply {
            line: self.number,
            message: message.into(),
        }
    }
}
