pub mod bvh;
mod camera;
pub mod geometry;
pub mod mesh;
pub mod preview;
mod util;

pub use bvh::{Bvh, DEFAULT_MAX_PRIMITIVE, Hit, HitMode};
pub use camera::{Camera, CameraError};
pub use mesh::Mesh;
pub use util::Stats;
