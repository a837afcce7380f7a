use std::collections::HashMap;
use std::io::{self, Read};
use std::time::Instant;

use env_logger::Env;
use image::RgbImage;

use cobaia_wavefront::config::{validate_config, DebugOptions, IncomingConfig, RenderMode};
use cobaia_wavefront::device::HostContext;
use cobaia_wavefront::domain::presets::build_scene;
use cobaia_wavefront::domain::Scene;
use cobaia_wavefront::error::{RenderError, RenderResult};
use cobaia_wavefront::render::{validate_scene, RenderSettings, Renderer, View};

#[cfg(feature = "gpu")]
use cobaia_wavefront::device::GpuContext;

/// One renderer per backend, created on first use.
#[derive(Default)]
struct Renderers {
    host: Option<Renderer<HostContext>>,
    #[cfg(feature = "gpu")]
    gpu: Option<Renderer<GpuContext>>,
}

impl Renderers {
    fn render(
        &mut self,
        mode: RenderMode,
        debug: DebugOptions,
        settings: &RenderSettings,
        view: &View,
        scene: &Scene,
    ) -> RenderResult<(RgbImage, RenderMode)> {
        #[cfg(feature = "gpu")]
        if mode == RenderMode::Gpu {
            if self.gpu.is_none() {
                let ctx = pollster::block_on(GpuContext::new())?;
                log::info!("using GPU adapter '{}'", ctx.adapter_name());
                self.gpu = Some(Renderer::new(ctx, debug));
            }
            if let Some(renderer) = self.gpu.as_mut() {
                return Ok((renderer.render_frame(settings, view, scene)?, RenderMode::Gpu));
            }
        }

        #[cfg(not(feature = "gpu"))]
        if mode == RenderMode::Gpu {
            log::warn!("built without the `gpu` feature, rendering on the CPU");
        }

        let renderer = self
            .host
            .get_or_insert_with(|| Renderer::new(HostContext::new(), debug));
        Ok((renderer.render_frame(settings, view, scene)?, RenderMode::Cpu))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;

    let incoming: IncomingConfig = serde_json::from_str(&raw)?;
    let frames = incoming.into_frames();
    if frames.is_empty() {
        return Err(RenderError::config("frames array must not be empty").into());
    }

    let total = frames.len();
    let mut prepared_frames = Vec::with_capacity(total);

    for frame in &frames {
        validate_config(frame)?;
        prepared_frames.push((
            RenderSettings::from_frame(frame),
            View::from_frame(frame),
            RenderMode::parse(&frame.renderer_mode),
            frame.scene.clone(),
        ));
    }

    let debug = DebugOptions::from_env();
    let mut scene_cache: HashMap<String, Scene> = HashMap::new();
    let mut renderers = Renderers::default();

    for (index, (settings, view, mode, scene_id)) in prepared_frames.iter().enumerate() {
        let cache_key = scene_id.to_ascii_lowercase();
        if !scene_cache.contains_key(&cache_key) {
            let scene = build_scene(scene_id).map_err(|error| {
                RenderError::scene(format!("failed to build scene '{scene_id}': {error}"))
            })?;
            validate_scene(&scene)?;
            scene_cache.insert(cache_key.clone(), scene);
        }
        let scene = scene_cache
            .get(&cache_key)
            .ok_or_else(|| RenderError::scene(format!("scene cache miss for '{scene_id}'")))?;

        let started = Instant::now();
        let (image, used_mode) = renderers.render(*mode, debug, settings, view, scene)?;
        let elapsed_ms = started.elapsed().as_millis();
        image.save(&settings.output_path).map_err(RenderError::from)?;

        println!(
            "[{}/{}] Rendered scene '{}' [{}] in {} ms: {}",
            index + 1,
            total,
            scene.id,
            used_mode.as_str(),
            elapsed_ms,
            settings.output_path
        );
    }

    // The GPU renderer lives as long as the process; some driver stacks
    // crash while tearing down wgpu objects on drop.
    #[cfg(feature = "gpu")]
    std::mem::forget(renderers.gpu.take());

    Ok(())
}
