use crate::config::{DebugOptions, RenderFrameConfig};
use crate::integrator::IntegratorSettings;

#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub max_bounces: u32,
    /// Progressive frames accumulated into one output image.
    pub samples_per_pixel: u32,
    pub seed: u64,
    pub output_path: String,
}

impl RenderSettings {
    pub fn from_frame(frame: &RenderFrameConfig) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            max_bounces: frame.max_bounces.max(1),
            samples_per_pixel: frame.samples_per_pixel.max(1),
            seed: frame.seed,
            output_path: frame.output_path.clone(),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn integrator_settings(&self, debug: &DebugOptions) -> IntegratorSettings {
        IntegratorSettings {
            seed: self.seed,
            collect_bounce_stats: debug.bounce_stats,
            ..IntegratorSettings::new(self.width, self.height, self.max_bounces)
        }
    }
}
