use bytemuck::{Pod, Zeroable};

use super::{FloatType, WorldPoint, WorldVector};

/// Axis aligned box given by its minimum and maximum corner.
///
/// The layout is two consecutive `3 x f32` corners (24 bytes), which is what
/// the exported node records expect.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Aabb {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl Aabb {
    pub fn new(min: WorldPoint, max: WorldPoint) -> Aabb {
        Aabb { min, max }
    }

    /// Box that is the identity for `union`: everything is outside of it.
    pub fn empty() -> Aabb {
        Aabb {
            min: WorldPoint::from(WorldVector::repeat(FloatType::INFINITY)),
            max: WorldPoint::from(WorldVector::repeat(FloatType::NEG_INFINITY)),
        }
    }

    pub fn from_point(point: WorldPoint) -> Aabb {
        Aabb {
            min: point,
            max: point,
        }
    }

    /// Smallest box containing all of the points, None if there are no points.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> Option<Aabb> {
        points
            .into_iter()
            .map(|p| Aabb::from_point(*p))
            .reduce(|a, b| a.union(&b))
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn grow(&mut self, other: &Aabb) {
        *self = self.union(other);
    }

    /// Returns true if every corner coordinate of `other` lies within this box.
    /// Comparison is exact, a box contains itself.
    pub fn contains(&self, other: &Aabb) -> bool {
        (0..3).all(|axis| other.min[axis] >= self.min[axis] && other.max[axis] <= self.max[axis])
    }

    pub fn center(&self) -> WorldPoint {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> WorldVector {
        self.max - self.min
    }

    /// Index of the axis along which the box is largest.
    /// On ties the later axis wins.
    pub fn largest_axis(&self) -> usize {
        let size = self.size();
        (1..3).fold(0, |best, axis| if size[axis] < size[best] { best } else { axis })
    }
}
