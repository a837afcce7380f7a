//! Device-visible data layouts. Every `#[repr(C)]` struct here mirrors a
//! struct in `device/gpu/shaders/common.wgsl`; field order and padding must
//! stay identical.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Ray {
    pub origin: [f32; 3],
    pub t_min: f32,
    pub direction: [f32; 3],
    pub t_max: f32,
}

impl Ray {
    pub const T_MAX: f32 = 1.0e30;

    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin: origin.to_array(),
            t_min: 0.0,
            direction: direction.to_array(),
            t_max: Self::T_MAX,
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from_array(self.origin)
    }

    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.direction)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin() + self.direction() * t
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Hit {
    pub t: f32,
    pub primitive: u32,
    pub u: f32,
    pub v: f32,
}

impl Hit {
    /// Sentinel primitive index of a ray that left the scene.
    pub const NO_HIT: u32 = u32::MAX;

    pub const MISS: Hit = Hit {
        t: Ray::T_MAX,
        primitive: Self::NO_HIT,
        u: 0.0,
        v: 0.0,
    };

    pub fn is_miss(&self) -> bool {
        self.primitive == Self::NO_HIT
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Triangle {
    pub p0: [f32; 3],
    pub material: u32,
    pub p1: [f32; 3],
    pub _pad0: u32,
    pub p2: [f32; 3],
    pub _pad1: u32,
}

impl Triangle {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3, material: u32) -> Self {
        Self {
            p0: p0.to_array(),
            material,
            p1: p1.to_array(),
            _pad0: 0,
            p2: p2.to_array(),
            _pad1: 0,
        }
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [
            Vec3::from_array(self.p0),
            Vec3::from_array(self.p1),
            Vec3::from_array(self.p2),
        ]
    }

    /// Unnormalized geometric normal, zero for degenerate triangles.
    pub fn cross(&self) -> Vec3 {
        let [p0, p1, p2] = self.vertices();
        (p1 - p0).cross(p2 - p0)
    }
}

pub const MATERIAL_KIND_DIFFUSE: u32 = 0;
pub const MATERIAL_KIND_MIRROR: u32 = 1;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialRecord {
    pub albedo: [f32; 3],
    pub kind: u32,
    pub emission: [f32; 3],
    pub _pad: f32,
}

/// Camera parameters bound to ray generation. `front`, `up` and `right`
/// form an orthonormal basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraData {
    pub origin: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub tan_half_fov: f32,
    pub aspect: f32,
    pub aperture: f32,
    pub focus_distance: f32,
    pub frame_count: u32,
}

impl CameraData {
    pub fn look_at(origin: Vec3, target: Vec3, world_up: Vec3, vfov_deg: f32, aspect: f32) -> Self {
        let front = (target - origin).normalize_or_zero();
        let right = front.cross(world_up).normalize_or_zero();
        let up = right.cross(front);
        Self {
            origin,
            front,
            up,
            right,
            tan_half_fov: (vfov_deg.to_radians() * 0.5).tan(),
            aspect,
            aperture: 0.0,
            focus_distance: (target - origin).length().max(1.0e-3),
            frame_count: 0,
        }
    }

    pub fn with_lens(mut self, aperture: f32, focus_distance: f32) -> Self {
        self.aperture = aperture;
        self.focus_distance = focus_distance;
        self
    }

    pub fn with_frame_count(mut self, frame_count: u32) -> Self {
        self.frame_count = frame_count;
        self
    }
}

impl Default for CameraData {
    fn default() -> Self {
        Self::look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 45.0, 1.0)
    }
}
