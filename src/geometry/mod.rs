mod aabb;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::Aabb;
pub use triangle::Triangle;

pub type FloatType = f32;
pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;
pub type ScreenPoint = nalgebra::Point2<u32>;
pub type ScreenSize = nalgebra::Vector2<u32>;

/// Centroid spread below which a node is split in half by count instead of by position.
pub const SPLIT_EPSILON: FloatType = 1e-7;

/// Relative offset used to lift secondary rays off the surface they start on.
pub const EPSILON: FloatType = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: WorldPoint,
    /// Direction of the ray, not necessarily normalized.
    /// Distances along the ray are measured in multiples of its length.
    pub direction: WorldVector,
}

impl Ray {
    pub fn new(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray { origin, direction }
    }

    /// Ray with the direction normalized, distances along it are euclidean.
    pub fn normalized(origin: WorldPoint, direction: WorldVector) -> Ray {
        Ray {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn point_at(&self, distance: FloatType) -> WorldPoint {
        self.origin + self.direction * distance
    }
}
