use std::ops::Index;

use nalgebra::Unit;

use super::{Aabb, FloatType, WorldPoint, WorldVector};

/// Three corners of a triangle.
/// Counter-clockwise winding (as seen from the front) is the front face.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle<Point>([Point; 3]);

impl<Point> Triangle<Point> {
    pub fn new(a: Point, b: Point, c: Point) -> Triangle<Point> {
        Triangle([a, b, c])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }
}

impl<Point> Index<usize> for Triangle<Point> {
    type Output = Point;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl Triangle<WorldPoint> {
    /// Fetches the corners of triangle `primitive` from an indexed mesh.
    /// Panics if the indices are out of range.
    pub fn from_mesh(vertices: &[WorldPoint], indices: &[[u32; 3]], primitive: u32) -> Self {
        Triangle(indices[primitive as usize].map(|i| vertices[i as usize]))
    }

    pub fn centroid(&self) -> WorldPoint {
        WorldPoint::from(self.iter().map(|p| p.coords).sum::<WorldVector>() / 3.0)
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::new(
            self.0[0].inf(&self.0[1]).inf(&self.0[2]),
            self.0[0].sup(&self.0[1]).sup(&self.0[2]),
        )
    }

    /// Returns edge vectors, coming from self[0]
    pub fn edges(&self) -> [WorldVector; 2] {
        [self.0[1] - self.0[0], self.0[2] - self.0[0]]
    }

    /// Returns a normal vector of the triangle, not normalized.
    /// Its length is twice the area of the triangle.
    pub fn normal(&self) -> WorldVector {
        let [e1, e2] = self.edges();
        e1.cross(&e2)
    }

    /// Unit normal, None for degenerate triangles.
    pub fn unit_normal(&self) -> Option<Unit<WorldVector>> {
        Unit::try_new(self.normal(), 0.0)
    }

    pub fn area(&self) -> FloatType {
        self.normal().norm() / 2.0
    }
}
