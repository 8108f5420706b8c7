use bon::bon;
use nalgebra::Unit;
use thiserror::Error;

use crate::geometry::{EPSILON, FloatType, Ray, ScreenPoint, ScreenSize, WorldPoint, WorldVector};

/// Pinhole camera.
#[derive(Copy, Clone, Debug)]
pub struct Camera {
    eye: WorldPoint,

    resolution: ScreenSize,

    forward: Unit<WorldVector>,
    up: Unit<WorldVector>,
    right: Unit<WorldVector>,

    /// Half of the film size, at unit distance from the eye
    half_width: FloatType,
    half_height: FloatType,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CameraError {
    #[error("Resolution must be non-zero, got {}x{}", .0.x, .0.y)]
    ZeroResolution(ScreenSize),

    #[error("Vertical field of view must be between 0 and pi radians, got {0}")]
    InvalidFieldOfView(FloatType),

    #[error("Eye and look-at point must differ")]
    ZeroViewDirection,

    #[error("Up vector must not be parallel to the view direction")]
    UpParallelToView,
}

#[bon]
impl Camera {
    #[builder]
    pub fn new(
        eye: WorldPoint,
        look_at: WorldPoint,
        #[builder(default = WorldVector::y())] up: WorldVector,
        // Vertical, in radians
        #[builder(default = 39.0f32.to_radians())]
        y_fov: FloatType,
        resolution: ScreenSize,
    ) -> Result<Self, CameraError> {
        if resolution.x == 0 || resolution.y == 0 {
            return Err(CameraError::ZeroResolution(resolution));
        }
        if !(y_fov > 0.0 && y_fov < std::f32::consts::PI) {
            return Err(CameraError::InvalidFieldOfView(y_fov));
        }

        let forward =
            Unit::try_new(look_at - eye, EPSILON).ok_or(CameraError::ZeroViewDirection)?;
        let right = Unit::try_new(forward.cross(&up), EPSILON)
            .ok_or(CameraError::UpParallelToView)?;
        let up = Unit::new_normalize(right.cross(&forward));

        let half_height = (y_fov / 2.0).tan();
        let half_width = half_height * resolution.x as FloatType / resolution.y as FloatType;

        Ok(Camera {
            eye,
            resolution,
            forward,
            up,
            right,
            half_width,
            half_height,
        })
    }
}

impl Camera {
    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    /// Normalized ray through the center of the given pixel.
    /// Pixel (0, 0) is the top left corner of the image.
    pub fn sample_ray(&self, point: &ScreenPoint) -> Ray {
        let u = ((point.x as FloatType + 0.5) / self.resolution.x as FloatType) * 2.0 - 1.0;
        let v = 1.0 - ((point.y as FloatType + 0.5) / self.resolution.y as FloatType) * 2.0;

        let direction = self.forward.as_ref()
            + self.right.as_ref() * (u * self.half_width)
            + self.up.as_ref() * (v * self.half_height);

        Ray::normalized(self.eye, direction)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::{assert, let_assert};

    fn camera() -> Camera {
        // X goes right, Y goes away, Z goes up
        let_assert!(
            Ok(camera) = Camera::builder()
                .eye(WorldPoint::new(0.0, 0.0, 0.0))
                .look_at(WorldPoint::new(0.0, 10.0, 0.0))
                .up(WorldVector::new(0.0, 0.0, 1.0))
                .y_fov(90.0f32.to_radians())
                .resolution(ScreenSize::new(800, 600))
                .build()
        );
        camera
    }

    #[test]
    fn left_right_up_down() {
        let camera = camera();

        let ray_center = camera.sample_ray(&ScreenPoint::new(400, 300));
        let ray_left = camera.sample_ray(&ScreenPoint::new(0, 300));
        let ray_right = camera.sample_ray(&ScreenPoint::new(799, 300));
        let ray_up = camera.sample_ray(&ScreenPoint::new(400, 0));
        let ray_down = camera.sample_ray(&ScreenPoint::new(400, 599));

        assert!(ray_center.direction.x.abs() < 1e-2);
        assert!(ray_center.direction.z.abs() < 1e-2);
        assert!(ray_left.direction.x < ray_center.direction.x);
        assert!(ray_right.direction.x > ray_center.direction.x);
        assert!(ray_up.direction.z > ray_center.direction.z);
        assert!(ray_down.direction.z < ray_center.direction.z);
    }

    #[test]
    fn field_of_view() {
        let camera = camera();
        // Top edge pixel is half a pixel inside of the 45 degree half angle
        let ray_up = camera.sample_ray(&ScreenPoint::new(400, 0));
        let angle = ray_up.direction.z.atan2(ray_up.direction.y);
        assert!(angle < 45.0f32.to_radians());
        assert!(angle > 44.0f32.to_radians());
        assert!((ray_up.direction.norm() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn default_up_is_y() {
        let_assert!(
            Ok(camera) = Camera::builder()
                .eye(WorldPoint::new(5.0, 5.0, 5.0))
                .look_at(WorldPoint::origin())
                .resolution(ScreenSize::new(40, 40))
                .build()
        );
        let ray = camera.sample_ray(&ScreenPoint::new(20, 0));
        assert!(ray.origin == WorldPoint::new(5.0, 5.0, 5.0));
        assert!(camera.resolution() == ScreenSize::new(40, 40));
    }

    #[test]
    fn zero_resolution() {
        let_assert!(
            Err(CameraError::ZeroResolution(_)) = Camera::builder()
                .eye(WorldPoint::origin())
                .look_at(WorldPoint::new(1.0, 0.0, 0.0))
                .resolution(ScreenSize::new(0, 10))
                .build()
        );
    }

    #[test]
    fn eye_at_target() {
        let_assert!(
            Err(CameraError::ZeroViewDirection) = Camera::builder()
                .eye(WorldPoint::origin())
                .look_at(WorldPoint::origin())
                .resolution(ScreenSize::new(10, 10))
                .build()
        );
    }

    #[test]
    fn up_along_view() {
        let_assert!(
            Err(CameraError::UpParallelToView) = Camera::builder()
                .eye(WorldPoint::origin())
                .look_at(WorldPoint::new(0.0, 3.0, 0.0))
                .resolution(ScreenSize::new(10, 10))
                .build()
        );
    }

    #[test]
    fn bad_field_of_view() {
        let_assert!(
            Err(CameraError::InvalidFieldOfView(_)) = Camera::builder()
                .eye(WorldPoint::origin())
                .look_at(WorldPoint::new(1.0, 0.0, 0.0))
                .y_fov(0.0)
                .resolution(ScreenSize::new(10, 10))
                .build()
        );
    }
}
