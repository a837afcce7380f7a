use std::f32::consts::PI;

use glam::{Vec2, Vec3};

pub fn reflect(direction: Vec3, normal: Vec3) -> Vec3 {
    direction - (normal * (2.0 * direction.dot(normal)))
}

pub fn hash_u32(mut value: u32) -> u32 {
    value ^= value >> 16;
    value = value.wrapping_mul(0x7feb_352d);
    value ^= value >> 15;
    value = value.wrapping_mul(0x846c_a68b);
    value ^= value >> 16;
    value
}

/// Combines a pixel index with per-frame and per-bounce values into one seed.
/// The WGSL prelude carries the same function, keep them in sync.
pub fn path_seed(pixel: u32, frame: u32, frame_seed: u32, bounce: u32) -> u32 {
    let frame_hash = hash_u32(frame.wrapping_mul(0x9e37_79b9) ^ frame_seed);
    hash_u32(pixel ^ hash_u32(frame_hash ^ bounce.wrapping_mul(0x85eb_ca6b)))
}

/// Small counter-free generator used inside stage invocations. Every
/// invocation owns one, seeded by [`path_seed`].
#[derive(Clone, Copy, Debug)]
pub struct SampleRng {
    state: u32,
}

impl SampleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: hash_u32(seed),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = hash_u32(self.state.wrapping_add(0x9e37_79b9));
        self.state
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }
}

/// Builds two tangents orthogonal to a unit `normal` (branchless ONB).
pub fn orthonormal_basis(normal: Vec3) -> (Vec3, Vec3) {
    let sign = 1.0_f32.copysign(normal.z);
    let a = -1.0 / (sign + normal.z);
    let b = normal.x * normal.y * a;
    let tangent = Vec3::new(1.0 + sign * normal.x * normal.x * a, sign * b, -sign * normal.x);
    let bitangent = Vec3::new(b, sign + normal.y * normal.y * a, -normal.y);
    (tangent, bitangent)
}

pub fn cosine_sample_hemisphere(normal: Vec3, u1: f32, u2: f32) -> Vec3 {
    let r = u1.sqrt();
    let phi = 2.0 * PI * u2;
    let (tangent, bitangent) = orthonormal_basis(normal);
    let local_z = (1.0 - u1).max(0.0).sqrt();
    (tangent * (r * phi.cos()) + bitangent * (r * phi.sin()) + normal * local_z).normalize()
}

pub fn sample_unit_disk(u1: f32, u2: f32) -> Vec2 {
    let r = u1.sqrt();
    let theta = 2.0 * PI * u2;
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Maps a direction to equirectangular coordinates in `[0, 1]^2`, `v = 0`
/// at the zenith.
pub fn direction_to_equirect(direction: Vec3) -> Vec2 {
    let d = direction.normalize_or_zero();
    let u = 0.5 + d.z.atan2(d.x) / (2.0 * PI);
    let v = d.y.clamp(-1.0, 1.0).acos() / PI;
    Vec2::new(u, v)
}
