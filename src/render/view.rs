use glam::Vec3;

use crate::config::RenderFrameConfig;
use crate::kernels::CameraData;

#[derive(Clone, Copy, Debug)]
pub struct View {
    pub origin: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub vertical_fov_deg: f32,
    pub aperture: f32,
    /// `None` focuses on the target.
    pub focus_distance: Option<f32>,
}

impl View {
    pub fn from_frame(frame: &RenderFrameConfig) -> Self {
        Self {
            origin: Vec3::from_array(frame.camera_origin),
            target: Vec3::from_array(frame.camera_target),
            up: Vec3::Y,
            vertical_fov_deg: frame.vertical_fov_deg,
            aperture: frame.aperture,
            focus_distance: frame.focus_distance,
        }
    }

    pub fn camera_data(&self, aspect: f32, frame_count: u32) -> CameraData {
        let camera = CameraData::look_at(
            self.origin,
            self.target,
            self.up,
            self.vertical_fov_deg,
            aspect,
        );
        let focus_distance = self.focus_distance.unwrap_or(camera.focus_distance);
        camera
            .with_lens(self.aperture, focus_distance)
            .with_frame_count(frame_count)
    }
}
