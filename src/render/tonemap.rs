use glam::Vec3;
use image::{Rgb, RgbImage};

pub fn filmic_curve(x: f32) -> f32 {
    let clamped = x.max(0.0);
    let numerator = clamped * ((2.51 * clamped) + 0.03);
    let denominator = clamped * ((2.43 * clamped) + 0.59) + 0.14;
    (numerator / denominator).clamp(0.0, 1.0)
}

pub fn filmic_tone_map(color: Vec3) -> Vec3 {
    Vec3::new(
        filmic_curve(color.x),
        filmic_curve(color.y),
        filmic_curve(color.z),
    )
}

pub fn to_rgb(color: Vec3) -> Rgb<u8> {
    let mapped = filmic_tone_map(color);
    let corrected = mapped.powf(1.0 / 2.2).clamp(Vec3::ZERO, Vec3::ONE);
    let r = (corrected.x * 255.999) as u8;
    let g = (corrected.y * 255.999) as u8;
    let b = (corrected.z * 255.999) as u8;
    Rgb([r, g, b])
}

/// Tone maps a resolved surface, row-major from the top-left texel.
/// Non-finite texels come out black.
pub fn surface_to_image(width: u32, height: u32, texels: &[[f32; 4]]) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let texel = texels
            .get((y * width + x) as usize)
            .copied()
            .unwrap_or([0.0; 4]);
        let color = Vec3::new(texel[0], texel[1], texel[2]);
        if color.is_finite() {
            to_rgb(color)
        } else {
            Rgb([0, 0, 0])
        }
    })
}
