//! Portable binary dump of a hierarchy and its mesh.
//!
//! All arrays are written as tightly packed little-endian records:
//!
//! * `<prefix>.node.bin`: 32 byte nodes, `min: 3 x f32, max: 3 x f32, begin: u32,
//!   num_primitives: u8, axis: u8` and two zero bytes of padding. Node 0 is the root.
//! * `<prefix>.primitive.bin`: `u32` triangle permutation.
//! * `<prefix>.vertex.bin`: `3 x f32` vertex positions.
//! * `<prefix>.index.bin`: `3 x u32` triangle vertex indices.
//! * `<prefix>.stats.yaml`: array lengths and byte sizes as `key: value` lines.
//!
//! The node layout matches a C struct with natural alignment, so the file can be
//! mapped directly (e.g. `np.dtype(..., align=True)`).

use std::{
    ffi::OsString,
    fmt::{self, Display},
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use tracing::debug;

use super::{Bvh, BvhNode};
use crate::geometry::{Aabb, WorldPoint};

pub const NODE_RECORD_SIZE: usize = 32;

const _: () = assert!(std::mem::size_of::<BvhNode>() == NODE_RECORD_SIZE);

/// Array sizes written next to the binary files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sidecar {
    pub num_vertices: usize,
    pub num_indices: usize,
    pub num_primitives: usize,
    pub num_nodes: usize,
    pub max_primitive: u8,
}

impl Sidecar {
    pub fn vertex_bytes(&self) -> usize {
        self.num_vertices * 3 * size_of::<f32>()
    }

    pub fn index_bytes(&self) -> usize {
        self.num_indices * 3 * size_of::<u32>()
    }

    pub fn primitive_bytes(&self) -> usize {
        self.num_primitives * size_of::<u32>()
    }

    pub fn node_bytes(&self) -> usize {
        self.num_nodes * NODE_RECORD_SIZE
    }
}

impl Display for Sidecar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "num_vertices: {}", self.num_vertices)?;
        writeln!(f, "num_indices: {}", self.num_indices)?;
        writeln!(f, "num_primitives: {}", self.num_primitives)?;
        writeln!(f, "num_nodes: {}", self.num_nodes)?;
        writeln!(f, "max_primitive: {}", self.max_primitive)?;
        writeln!(f, "vertex_bytes: {}", self.vertex_bytes())?;
        writeln!(f, "index_bytes: {}", self.index_bytes())?;
        writeln!(f, "primitive_bytes: {}", self.primitive_bytes())?;
        writeln!(f, "node_bytes: {}", self.node_bytes())
    }
}

/// Paths of all files produced by one export.
#[derive(Clone, Debug)]
pub struct ExportedFiles {
    pub nodes: PathBuf,
    pub primitives: PathBuf,
    pub vertices: PathBuf,
    pub indices: PathBuf,
    pub sidecar: PathBuf,
}

impl ExportedFiles {
    pub fn new(prefix: &Path) -> ExportedFiles {
        let with_suffix = |suffix: &str| {
            let mut path = OsString::from(prefix.as_os_str());
            path.push(suffix);
            PathBuf::from(path)
        };
        ExportedFiles {
            nodes: with_suffix(".node.bin"),
            primitives: with_suffix(".primitive.bin"),
            vertices: with_suffix(".vertex.bin"),
            indices: with_suffix(".index.bin"),
            sidecar: with_suffix(".stats.yaml"),
        }
    }
}

impl Bvh<'_> {
    pub fn sidecar(&self) -> Sidecar {
        Sidecar {
            num_vertices: self.vertices.len(),
            num_indices: self.indices.len(),
            num_primitives: self.primitives.len(),
            num_nodes: self.nodes.len(),
            max_primitive: self.max_primitive,
        }
    }

    /// Writes the hierarchy and the mesh it was built over to files starting with `prefix`.
    #[tracing::instrument(skip_all, fields(prefix = %prefix.display()))]
    pub fn export(&self, prefix: &Path) -> io::Result<ExportedFiles> {
        let files = ExportedFiles::new(prefix);

        write_nodes(self.nodes.as_raw_slice(), &mut BufWriter::new(File::create(&files.nodes)?))?;
        write_primitives(
            &self.primitives,
            &mut BufWriter::new(File::create(&files.primitives)?),
        )?;
        write_vertices(self.vertices, &mut BufWriter::new(File::create(&files.vertices)?))?;
        write_indices(self.indices, &mut BufWriter::new(File::create(&files.indices)?))?;
        std::fs::write(&files.sidecar, self.sidecar().to_string())?;

        debug!(nodes = self.nodes.len(), "export finished");
        Ok(files)
    }
}

pub fn write_nodes(nodes: &[BvhNode], out: &mut impl Write) -> io::Result<()> {
    for node in nodes {
        out.write_all(&encode_node(node))?;
    }
    out.flush()
}

pub fn write_primitives(primitives: &[u32], out: &mut impl Write) -> io::Result<()> {
    for primitive in primitives {
        out.write_all(&primitive.to_le_bytes())?;
    }
    out.flush()
}

pub fn write_vertices(vertices: &[WorldPoint], out: &mut impl Write) -> io::Result<()> {
    for vertex in vertices {
        for coordinate in vertex.iter() {
            out.write_all(&coordinate.to_le_bytes())?;
        }
    }
    out.flush()
}

pub fn write_indices(indices: &[[u32; 3]], out: &mut impl Write) -> io::Result<()> {
    for index in indices.iter().flatten() {
        out.write_all(&index.to_le_bytes())?;
    }
    out.flush()
}

/// Reads back nodes written by `write_nodes`.
/// Fails with `InvalidData` if the input is not a whole number of records.
pub fn read_nodes(input: &mut impl Read) -> io::Result<Vec<BvhNode>> {
    let mut buffer = Vec::new();
    input.read_to_end(&mut buffer)?;

    if buffer.len() % NODE_RECORD_SIZE != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "node data is {} bytes long, not a multiple of {NODE_RECORD_SIZE}",
                buffer.len()
            ),
        ));
    }

    Ok(buffer
        .chunks_exact(NODE_RECORD_SIZE)
        .map(|chunk| {
            let mut record = [0u8; NODE_RECORD_SIZE];
            record.copy_from_slice(chunk);
            decode_node(&record)
        })
        .collect())
}

fn encode_node(node: &BvhNode) -> [u8; NODE_RECORD_SIZE] {
    let mut record = [0u8; NODE_RECORD_SIZE];
    let floats = node.bbox.min.iter().chain(node.bbox.max.iter());
    for (chunk, value) in record[..24].chunks_exact_mut(4).zip(floats) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    record[24..28].copy_from_slice(&node.begin.to_le_bytes());
    record[28] = node.num_primitives;
    record[29] = node.axis;
    record
}

fn decode_node(record: &[u8; NODE_RECORD_SIZE]) -> BvhNode {
    let float_at = |offset: usize| {
        f32::from_le_bytes([
            record[offset],
            record[offset + 1],
            record[offset + 2],
            record[offset + 3],
        ])
    };
    let bbox = Aabb::new(
        WorldPoint::new(float_at(0), float_at(4), float_at(8)),
        WorldPoint::new(float_at(12), float_at(16), float_at(20)),
    );

    BvhNode {
        bbox,
        begin: u32::from_le_bytes([record[24], record[25], record[26], record[27]]),
        num_primitives: record[28],
        axis: record[29],
        padding: [0; 2],
    }
}
