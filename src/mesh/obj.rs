use std::{fs, path::Path};

use indexmap::IndexSet;
use tracing::warn;
use wavefront_obj::obj::{ObjSet, Primitive};

use super::{Mesh, MeshLoadError};
use crate::geometry::WorldPoint;

pub fn load(path: &Path) -> Result<Mesh, MeshLoadError> {
    let content = fs::read_to_string(path)?;
    parse(content)
}

pub fn parse(content: String) -> Result<Mesh, MeshLoadError> {
    from_obj_set(wavefront_obj::obj::parse(content)?)
}

/// Collects triangles of all objects into a single mesh.
/// Only positions that some triangle uses are kept, in the order they are first seen
/// in the parsed triangles. `wavefront_obj` rotates the corners of each face so that
/// its last vertex comes first (`f 1 2 3` becomes `(3, 1, 2)`). Winding is preserved.
fn from_obj_set(obj: ObjSet) -> Result<Mesh, MeshLoadError> {
    let mut indices = Vec::new();
    // (object, position index)
    let mut used_vertices = IndexSet::new();
    let mut skipped = 0usize;

    for (object_index, object) in obj.objects.iter().enumerate() {
        for geometry in &object.geometry {
            for shape in &geometry.shapes {
                let Primitive::Triangle(a, b, c) = shape.primitive else {
                    skipped += 1;
                    continue;
                };

                let mut handle_vertex = |position: usize| {
                    let (index, _) = used_vertices.insert_full((object_index, position));
                    u32::try_from(index).map_err(|_| MeshLoadError::TooManyVertices(index + 1))
                };

                indices.push([handle_vertex(a.0)?, handle_vertex(b.0)?, handle_vertex(c.0)?]);
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped non-triangle primitives");
    }

    let vertices = used_vertices
        .into_iter()
        .map(|(object_index, position)| {
            let vertex = &obj.objects[object_index].vertices[position];
            WorldPoint::new(vertex.x as f32, vertex.y as f32, vertex.z as f32)
        })
        .collect();

    Ok(Mesh { vertices, indices })
}
