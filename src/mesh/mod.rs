//! Indexed triangle meshes and loading them from files.

mod obj;
mod ply;

use std::{
    f32::consts::PI,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::geometry::{Aabb, WorldPoint};

/// Vertex positions and triangles indexing into them.
/// Triangles are wound counter-clockwise when seen from the front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<WorldPoint>,
    pub indices: Vec<[u32; 3]>,
}

#[derive(Debug, Error)]
pub enum MeshLoadError {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse OBJ file: {0}")]
    Obj(#[from] wavefront_obj::ParseError),

    #[error("Failed to parse PLY file, line {line}: {message}")]
    Ply { line: usize, message: String },

    #[error("Mesh has {0} vertices, indices would not fit 32 bits")]
    TooManyVertices(usize),

    #[error("Unsupported mesh format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl Mesh {
    /// Loads a mesh, the format is picked by file extension (`.obj` or `.ply`).
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Mesh, MeshLoadError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mesh = match extension.as_deref() {
            Some("obj") => obj::load(path)?,
            Some("ply") => ply::load(path)?,
            _ => return Err(MeshLoadError::UnsupportedFormat(path.to_owned())),
        };

        tracing::debug!(
            vertices = mesh.vertices.len(),
            triangles = mesh.indices.len(),
            "mesh loaded"
        );
        Ok(mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Bounding box of all vertices, None for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.vertices)
    }

    /// Small triangle at each of the eight corners of the [-1, 1] cube,
    /// all of them facing the (1, 1, 1) direction.
    /// Triangle order follows x, then y, then z, from -1 to 1.
    pub fn cube_corners() -> Mesh {
        let offsets = [
            WorldPoint::new(0.1, 0.0, 0.0),
            WorldPoint::new(0.0, 0.1, 0.0),
            WorldPoint::new(0.0, 0.0, 0.1),
        ];

        let mut mesh = Mesh::default();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    let first = mesh.vertices.len() as u32;
                    mesh.indices.push([first, first + 1, first + 2]);
                    mesh.vertices
                        .extend(offsets.iter().map(|o| WorldPoint::new(x, y, z) + o.coords));
                }
            }
        }
        mesh
    }

    /// Octahedron with vertices at (+-3, 0, 0), (0, +-2, 0) and (0, 0, +-1), faces pointing out.
    pub fn octahedron() -> Mesh {
        Mesh {
            vertices: vec![
                WorldPoint::new(3.0, 0.0, 0.0),
                WorldPoint::new(0.0, 2.0, 0.0),
                WorldPoint::new(0.0, 0.0, 1.0),
                WorldPoint::new(0.0, -2.0, 0.0),
                WorldPoint::new(0.0, 0.0, -1.0),
                WorldPoint::new(-3.0, 0.0, 0.0),
            ],
            indices: vec![
                [0, 1, 2],
                [0, 2, 3],
                [0, 3, 4],
                [0, 4, 1],
                [5, 2, 1],
                [5, 3, 2],
                [5, 4, 3],
                [5, 1, 4],
            ],
        }
    }

    /// Unit sphere centered at the origin, faces pointing out.
    /// `rings` is the number of latitude bands (at least 2), `segments` the number
    /// of longitude slices (at least 3).
    pub fn uv_sphere(rings: u32, segments: u32) -> Mesh {
        assert!(rings >= 2);
        assert!(segments >= 3);

        let vertices = (0..=rings)
            .flat_map(|i| {
                let theta = PI * i as f32 / rings as f32;
                (0..segments).map(move |j| {
                    let phi = 2.0 * PI * j as f32 / segments as f32;
                    WorldPoint::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
                })
            })
            .collect();

        let vertex = |i: u32, j: u32| i * segments + j % segments;
        let mut indices = Vec::new();
        for i in 0..rings {
            for j in 0..segments {
                let a = vertex(i, j);
                let b = vertex(i, j + 1);
                let c = vertex(i + 1, j + 1);
                let d = vertex(i + 1, j);

                // The other triangle of the quad collapses into the pole
                if i != 0 {
                    indices.push([a, b, c]);
                }
                if i != rings - 1 {
                    indices.push([a, c, d]);
                }
            }
        }

        Mesh { vertices, indices }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::geometry::{Triangle, WorldVector, test::world_point};

    use assert2::{assert, let_assert};
    use proptest::{collection::SizeRange, prelude::*};

    /// Meshes of unconnected random triangles
    pub fn arbitrary_mesh(triangles: impl Into<SizeRange>) -> BoxedStrategy<Mesh> {
        proptest::collection::vec([world_point(), world_point(), world_point()], triangles)
            .prop_map(|triangles| Mesh {
                vertices: triangles.iter().flatten().copied().collect(),
                indices: (0..triangles.len() as u32)
                    .map(|i| [3 * i, 3 * i + 1, 3 * i + 2])
                    .collect(),
            })
            .boxed()
    }

    fn triangles(mesh: &Mesh) -> impl Iterator<Item = Triangle<WorldPoint>> + '_ {
        (0..mesh.indices.len() as u32).map(|i| Triangle::from_mesh(&mesh.vertices, &mesh.indices, i))
    }

    #[test]
    fn cube_corners_face_the_diagonal() {
        let mesh = Mesh::cube_corners();
        assert!(mesh.triangle_count() == 8);
        assert!(mesh.vertices.len() == 24);
        for triangle in triangles(&mesh) {
            let_assert!(Some(normal) = triangle.unit_normal());
            assert!(normal.dot(&WorldVector::new(1.0, 1.0, 1.0)) > 1.7);
        }
        assert!(mesh.vertices[21] == WorldPoint::new(1.1, 1.0, 1.0));
    }

    #[test]
    fn octahedron_faces_point_out() {
        let mesh = Mesh::octahedron();
        for triangle in triangles(&mesh) {
            assert!(triangle.normal().dot(&triangle.centroid().coords) > 0.0);
        }
    }

    #[test]
    fn sphere_faces_point_out() {
        let mesh = Mesh::uv_sphere(8, 12);
        assert!(mesh.vertices.len() == 9 * 12);
        assert!(mesh.triangle_count() == 12 * (2 * 8 - 2));
        for triangle in triangles(&mesh) {
            assert!(triangle.area() > 0.0);
            assert!(triangle.normal().dot(&triangle.centroid().coords) > 0.0);
        }
    }

    #[test]
    fn sphere_bounding_box() {
        let_assert!(Some(bbox) = Mesh::uv_sphere(16, 32).bounding_box());
        assert!((bbox.max - WorldPoint::new(1.0, 1.0, 1.0)).norm() < 1e-5);
        assert!((bbox.min - WorldPoint::new(-1.0, -1.0, -1.0)).norm() < 1e-5);
    }

    #[test]
    fn unsupported_extension() {
        let_assert!(Err(MeshLoadError::UnsupportedFormat(path)) = Mesh::load("model.stl"));
        assert!(path == Path::new("model.stl"));
    }

    #[test]
    fn missing_file() {
        let_assert!(Err(MeshLoadError::Io(_)) = Mesh::load("/nonexistent/model.ply"));
    }
}
