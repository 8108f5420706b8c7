use nalgebra::{Matrix3x2, Vector2};

use super::{FloatType, Ray, Triangle, WorldPoint};

impl Triangle<WorldPoint> {
    /// Calculates ray intersection with the one sided triangle.
    ///
    /// Only the front (counter-clockwise) face can be hit, rays that see the back face
    /// or run parallel to the plane miss. Returns the distance along the ray if it is
    /// in the open interval (0, t_max) and the hit point is strictly inside the triangle.
    /// Points exactly on an edge are not hits.
    pub fn intersect(&self, ray: &Ray, t_max: FloatType) -> Option<FloatType> {
        let n = self.normal();
        let ray_dot_n = ray.direction.dot(&n);

        // Also rejects NaN from degenerate input
        if !(ray_dot_n < 0.0) {
            return None;
        }

        // <(o + t d) - v0, n> = 0
        let t = (self[0] - ray.origin).dot(&n) / ray_dot_n;
        if !(0.0 < t && t < t_max) {
            return None;
        }

        let st = self.barycentric(&ray.point_at(t))?;
        (st.x > 0.0 && st.y > 0.0 && st.x + st.y < 1.0).then_some(t)
    }

    /// Coordinates of `point` in the basis of the two edges coming from self[0].
    /// Least squares solution, so points off the plane get projected onto it.
    /// None for degenerate triangles.
    pub fn barycentric(&self, point: &WorldPoint) -> Option<Vector2<FloatType>> {
        let [e1, e2] = self.edges();
        let a = Matrix3x2::from_columns(&[e1, e2]);
        let a_t = a.transpose();
        let inverse = (a_t * a).try_inverse()?;
        Some(inverse * a_t * (point - self[0]))
    }
}
