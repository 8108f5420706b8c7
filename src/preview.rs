use image::RgbImage;
use itertools::iproduct;

use crate::{
    Camera,
    bvh::{Bvh, HitMode, StackCache},
    geometry::{EPSILON, FloatType, Ray, ScreenPoint, WorldVector},
    util::{Rgb, color_to_image},
};

/// Brightness multiplier of pixels that don't see the light.
const SHADOW_FACTOR: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct PreviewSettings {
    /// Direction towards the light, doesn't have to be normalized
    pub light_direction: WorldVector,
    pub shadows: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        PreviewSettings {
            light_direction: WorldVector::new(1.0, 2.0, 1.5),
            shadows: true,
        }
    }
}

/// Renders the mesh colored by surface normals, with optional hard shadows.
///
/// `on_row` is called after every finished image row with the row index.
#[tracing::instrument(skip_all, fields(width = camera.resolution().x, height = camera.resolution().y))]
pub fn render_preview(
    bvh: &Bvh,
    camera: &Camera,
    settings: &PreviewSettings,
    mut on_row: impl FnMut(u32),
) -> RgbImage {
    let resolution = camera.resolution();
    let light_direction = settings.light_direction.normalize();
    let mut stack = StackCache::new();
    let mut image = RgbImage::new(resolution.x, resolution.y);

    for (y, x) in iproduct!(0..resolution.y, 0..resolution.x) {
        let ray = camera.sample_ray(&ScreenPoint::new(x, y));
        let color = shade(bvh, &ray, &light_direction, settings.shadows, &mut stack);
        image.put_pixel(x, y, color_to_image(color));

        if x + 1 == resolution.x {
            on_row(y);
        }
    }

    image
}

fn shade(
    bvh: &Bvh,
    ray: &Ray,
    light_direction: &WorldVector,
    shadows: bool,
    stack: &mut StackCache,
) -> Rgb {
    let Some(hit) =
        bvh.intersect_with_stack(ray, FloatType::INFINITY, HitMode::Closest, stack)
    else {
        return Rgb::new(0.5, 0.5, 0.5);
    };

    let triangle = bvh.triangle(hit.primitive);
    let Some(normal) = triangle.unit_normal() else {
        // Degenerate triangles are never hit, but stay safe
        return Rgb::new(0.0, 0.0, 0.0);
    };

    let color = normal.map(|c| c * 0.5 + 0.5);
    let mut color = Rgb::new(color.x, color.y, color.z);

    if shadows {
        let shadow_ray = Ray::new(
            ray.point_at(hit.t) + normal.as_ref() * EPSILON,
            *light_direction,
        );
        let occluded = bvh
            .intersect_with_stack(&shadow_ray, FloatType::INFINITY, HitMode::Any, stack)
            .is_some();
        if occluded {
            color = Rgb::new(
                color.r * SHADOW_FACTOR,
                color.g * SHADOW_FACTOR,
                color.b * SHADOW_FACTOR,
            );
        }
    }

    color
}
