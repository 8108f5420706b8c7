mod stats;

pub use stats::Stats;

pub type Rgb = rgb::RGB<f32>;

/// Maps a 0-1 f32 rgb pixel to pixel type compatible with module image.
pub fn color_to_image(color: Rgb) -> image::Rgb<u8> {
    image::Rgb([
        (color.r * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.g * 255.0).round().clamp(0.0, 255.0) as u8,
        (color.b * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
