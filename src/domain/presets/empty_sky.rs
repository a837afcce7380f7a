use glam::Vec3;

use crate::domain::{Environment, Scene};

pub const SCENE_ID: &str = "empty_sky";

/// No geometry: every primary ray misses.
pub fn build() -> Scene {
    Scene {
        id: SCENE_ID,
        objects: Vec::new(),
        materials: Vec::new(),
        environment: Environment::Gradient {
            horizon: Vec3::new(0.95, 0.92, 0.86),
            zenith: Vec3::new(0.32, 0.52, 0.9),
        },
    }
}
