use super::{Aabb, FloatType, Ray};

impl Aabb {
    /// Calculates ray intersection with the box (slab test).
    /// Returns the parametric distance where the ray enters the box and where it leaves it.
    /// The ray touches the box if entry <= exit.
    pub fn slab_distances(&self, ray: &Ray) -> (FloatType, FloatType) {
        // Componentwise distances along the ray to the box's min and max corners.
        // Zero direction components divide into infinities of the correct sign.
        // The quotient is NAN if the ray is starting on the slab bounding plane
        // and is parallel to it. In this case we blend to +-infinity, so that the range becomes infinite
        let to_box_min = (self.min - ray.origin)
            .component_div(&ray.direction)
            .map(|x| if x.is_nan() { FloatType::NEG_INFINITY } else { x });
        let to_box_max = (self.max - ray.origin)
            .component_div(&ray.direction)
            .map(|x| if x.is_nan() { FloatType::INFINITY } else { x });

        // Correctly ordered (near <= far)
        let near = to_box_min.zip_map(&to_box_max, FloatType::min);
        let far = to_box_min.zip_map(&to_box_max, FloatType::max);

        let entry = near.x.max(near.y).max(near.z);
        let exit = far.x.min(far.y).min(far.z);

        (entry, exit)
    }

    /// Returns the entry distance if the ray reaches the box closer than `t_max`.
    /// The entry distance is negative if the ray origin is inside the box, this counts
    /// as a hit regardless of `t_max`.
    /// Touching counts as a hit, so that flat boxes around axis aligned triangles can be hit.
    pub fn intersect(&self, ray: &Ray, t_max: FloatType) -> Option<FloatType> {
        let (entry, exit) = self.slab_distances(ray);
        let hit = entry <= exit && exit > 0.0 && (entry < 0.0 || entry < t_max);
        hit.then_some(entry)
    }
}

#[cfg(test)]
pub mod test {
    use assert2::{assert, let_assert};
    use test_case::{test_case, test_matrix};
    use test_strategy::proptest;

    use super::*;
    use crate::geometry::{
        WorldPoint, WorldVector,
        test::{NonzeroWorldVectorWrapper, WorldPointWrapper},
    };

    fn test_box() -> Aabb {
        Aabb::new([5.0, 5.0, 5.0].into(), [10.0, 10.0, 10.0].into())
    }

    /// Rays aimed from outside at a point inside the box hit it, entry distance lands on the surface.
    #[test_matrix(
        [5.5, 7.0, 9.5],
        [5.5, 7.0, 9.5],
        [5.5, 7.0, 9.5],
        [-1.0, 0.0, 2.0],
        [-1.0, 0.0, 2.0],
        [-1.0, 0.0, 2.0]
    )]
    fn hit_from_outside(px: f32, py: f32, pz: f32, dx: f32, dy: f32, dz: f32) {
        if dx == 0.0 && dy == 0.0 && dz == 0.0 {
            return;
        }

        let b = test_box();
        let target = WorldPoint::new(px, py, pz);
        let d = WorldVector::new(dx, dy, dz).normalize();
        let r = Ray::new(target - d * 20.0, d);

        let_assert!(Some(t) = b.intersect(&r, FloatType::INFINITY));
        assert!(t > 0.0);
        assert!(t < 20.0);
        assert!(point_is_on_box_surface(&r.point_at(t), &b), "{:?}", r.point_at(t));
    }

    /// Just a manual example of ray grazing along an edge.
    #[test]
    fn along_edge() {
        let r = Ray::new(
            WorldPoint::new(5.0, 5.0, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(test_box().slab_distances(&r) == (5.0, 10.0));
        assert!(test_box().intersect(&r, 100.0) == Some(5.0));
    }

    #[test]
    fn flat_box() {
        let flat = Aabb::new([-1.0, -1.0, 2.0].into(), [1.0, 1.0, 2.0].into());
        let r = Ray::new(
            WorldPoint::new(0.5, 0.5, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(flat.slab_distances(&r) == (2.0, 2.0));
        assert!(flat.intersect(&r, 3.0) == Some(2.0));
        assert!(flat.intersect(&r, 2.0).is_none());
    }

    #[test]
    fn origin_inside() {
        let r = Ray::new(
            WorldPoint::new(7.0, 7.0, 7.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        let_assert!(Some(t) = test_box().intersect(&r, 1.0));
        assert!(t == -2.0);
    }

    #[test]
    fn origin_inside_with_zero_range() {
        // The ray can't hit anything, but the box itself is still entered
        let r = Ray::new(
            WorldPoint::new(7.0, 7.0, 7.0),
            WorldVector::new(0.0, 1.0, 0.0),
        );
        assert!(test_box().intersect(&r, 0.0).is_some());
    }

    #[test_case(4.0 ; "before_box")]
    #[test_case(5.0 ; "exactly_at_entry")]
    #[test_case(-1.0 ; "negative")]
    fn too_short(t_max: FloatType) {
        let r = Ray::new(
            WorldPoint::new(7.0, 7.0, 0.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        assert!(test_box().intersect(&r, t_max).is_none());
    }

    #[test]
    fn pointing_away() {
        let r = Ray::new(
            WorldPoint::new(7.0, 7.0, 0.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        assert!(test_box().intersect(&r, FloatType::INFINITY).is_none());
    }

    /// Rays that lie parallel to one axis and start outside the corresponding slab
    /// must miss, even if they move toward the box on other axes or remain unchanged.
    #[test_case( 0.0,  7.0,  7.0,   0.0, 1.0, 0.0 ; "low_x_parallel_miss")]
    #[test_case(12.0,  7.0,  7.0,   0.0, 1.0, 0.0 ; "high_x_parallel_miss")]
    #[test_case( 7.0,  0.0,  7.0,   1.0, 0.0, 0.0 ; "low_y_parallel_miss")]
    #[test_case( 7.0, 12.0,  7.0,   1.0, 0.0, 0.0 ; "high_y_parallel_miss")]
    #[test_case( 7.0,  7.0,  0.0,   1.0, 0.0, 0.0 ; "low_z_parallel_miss")]
    #[test_case( 7.0,  7.0, 12.0,   1.0, 0.0, 0.0 ; "high_z_parallel_miss")]
    #[test_case( 0.0,  0.0,  0.0,  -1.0, 1.0, 1.0 ; "corner_miss")]
    fn only_misses(px: f32, py: f32, pz: f32, dx: f32, dy: f32, dz: f32) {
        let r = Ray::new(WorldPoint::new(px, py, pz), WorldVector::new(dx, dy, dz));
        assert!(test_box().intersect(&r, FloatType::INFINITY).is_none());
    }

    #[test]
    fn zero_direction_never_hits_from_outside() {
        let r = Ray::new(WorldPoint::new(0.0, 0.0, 0.0), WorldVector::zeros());
        assert!(test_box().intersect(&r, FloatType::INFINITY).is_none());
    }

    /// Scaling the direction scales the distances but doesn't change the outcome.
    #[proptest]
    fn direction_scale_invariance(
        origin: WorldPointWrapper,
        direction: NonzeroWorldVectorWrapper,
        #[strategy(0.5f32..4.0)] scale: f32,
    ) {
        let b = Aabb::new([-1.0, -2.0, -3.0].into(), [1.0, 2.0, 3.0].into());
        let r1 = Ray::new(*origin, *direction);
        let r2 = Ray::new(*origin, *direction * scale);

        let (entry1, exit1) = b.slab_distances(&r1);
        let (entry2, exit2) = b.slab_distances(&r2);

        if entry1.is_finite() && entry2.is_finite() {
            assert!((entry1 - entry2 * scale).abs() <= 1e-3 * (1.0 + entry1.abs()));
        }
        if exit1.is_finite() && exit2.is_finite() {
            assert!((exit1 - exit2 * scale).abs() <= 1e-3 * (1.0 + exit1.abs()));
        }
    }

    fn point_is_on_box_surface(p: &WorldPoint, b: &Aabb) -> bool {
        const TOLERANCE: f32 = 1e-3;

        let inside = (0..3)
            .all(|axis| p[axis] >= b.min[axis] - TOLERANCE && p[axis] <= b.max[axis] + TOLERANCE);
        let on_face = (0..3).any(|axis| {
            (p[axis] - b.min[axis]).abs() <= TOLERANCE || (p[axis] - b.max[axis]).abs() <= TOLERANCE
        });

        inside && on_face
    }
}
