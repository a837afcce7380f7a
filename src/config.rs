use serde::Deserialize;
use std::path::Path;

use glam::Vec3;

use crate::error::{RenderError, RenderResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrameConfig {
    pub width: u32,
    pub height: u32,
    pub output_path: String,
    pub max_bounces: u32,
    #[serde(default = "default_samples_per_pixel")]
    pub samples_per_pixel: u32,
    pub scene: String,
    #[serde(default = "default_renderer_mode")]
    pub renderer_mode: String,
    pub camera_origin: [f32; 3],
    pub camera_target: [f32; 3],
    #[serde(default = "default_vertical_fov_deg")]
    pub vertical_fov_deg: f32,
    #[serde(default)]
    pub aperture: f32,
    /// Distance to the plane in focus; defaults to the target distance.
    #[serde(default)]
    pub focus_distance: Option<f32>,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderBatchConfig {
    pub frames: Vec<RenderFrameConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IncomingConfig {
    Single(RenderFrameConfig),
    Batch(RenderBatchConfig),
}

impl IncomingConfig {
    pub fn into_frames(self) -> Vec<RenderFrameConfig> {
        match self {
            IncomingConfig::Single(frame) => vec![frame],
            IncomingConfig::Batch(batch) => batch.frames,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Cpu,
    Gpu,
}

impl RenderMode {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("gpu") {
            Self::Gpu
        } else {
            Self::Cpu
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DebugOptions {
    pub bounce_stats: bool,
}

impl DebugOptions {
    pub fn from_env() -> Self {
        let bounce_stats = std::env::var("COBAIA_BOUNCE_STATS")
            .ok()
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(false);

        Self { bounce_stats }
    }
}

const fn default_samples_per_pixel() -> u32 {
    1
}

fn default_renderer_mode() -> String {
    "cpu".into()
}

const fn default_vertical_fov_deg() -> f32 {
    38.0
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn validate_config(config: &RenderFrameConfig) -> RenderResult<()> {
    if config.width == 0 || config.height == 0 {
        return Err(RenderError::config("width and height must be positive"));
    }
    if config.width.checked_mul(config.height).is_none() {
        return Err(RenderError::config("width x height overflows the pixel count"));
    }

    let output_parent = Path::new(&config.output_path)
        .parent()
        .ok_or_else(|| RenderError::config("outputPath must include a parent directory"))?;

    // A bare file name has an empty parent: the working directory.
    if !output_parent.as_os_str().is_empty() && !output_parent.exists() {
        return Err(RenderError::config(format!(
            "output directory does not exist: {}",
            output_parent.display()
        )));
    }

    if config.max_bounces == 0 {
        return Err(RenderError::config("maxBounces must be at least 1"));
    }

    if config.samples_per_pixel == 0 {
        return Err(RenderError::config("samplesPerPixel must be at least 1"));
    }

    if config.scene.trim().is_empty() {
        return Err(RenderError::config("scene must be a non-empty identifier"));
    }

    if config.renderer_mode.trim().is_empty() {
        return Err(RenderError::config("rendererMode must be a non-empty string"));
    }

    let camera_origin = Vec3::from_array(config.camera_origin);
    let camera_target = Vec3::from_array(config.camera_target);
    if !camera_origin.is_finite() || !camera_target.is_finite() {
        return Err(RenderError::config("camera vectors must contain finite values"));
    }
    if (camera_origin - camera_target).length() < 0.0001 {
        return Err(RenderError::config("cameraOrigin must differ from cameraTarget"));
    }
    let direction = (camera_target - camera_origin).normalize();
    if direction.cross(Vec3::Y).length() < 1.0e-4 {
        return Err(RenderError::config("camera must not look straight up or down"));
    }

    if !config.vertical_fov_deg.is_finite()
        || config.vertical_fov_deg <= 0.0
        || config.vertical_fov_deg >= 180.0
    {
        return Err(RenderError::config(format!(
            "verticalFovDeg must be in (0, 180), got {}",
            config.vertical_fov_deg
        )));
    }

    if !config.aperture.is_finite() || config.aperture < 0.0 {
        return Err(RenderError::config(format!(
            "aperture must be finite and >= 0, got {}",
            config.aperture
        )));
    }

    if let Some(focus_distance) = config.focus_distance {
        if !focus_distance.is_finite() || focus_distance <= 0.0 {
            return Err(RenderError::config(format!(
                "focusDistance must be finite and > 0, got {focus_distance}"
            )));
        }
    }

    Ok(())
}
