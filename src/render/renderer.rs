use std::time::Instant;

use image::RgbImage;

use crate::accel::TriangleList;
use crate::config::DebugOptions;
use crate::device::WavefrontDevice;
use crate::domain::Scene;
use crate::error::{RenderError, RenderResult};
use crate::integrator::{SceneData, WavefrontIntegrator};

use super::{compile_scene, surface_to_image, RenderSettings, View};

struct LoadedScene<C: WavefrontDevice> {
    data: SceneData<C>,
    accel: TriangleList<C>,
}

/// Drives the integrator over a sequence of frames on one execution context.
/// The integrator is rebuilt only when its settings change and the scene is
/// uploaded again only when its id changes.
pub struct Renderer<C: WavefrontDevice> {
    ctx: C,
    debug: DebugOptions,
    integrator: Option<WavefrontIntegrator<C>>,
    scene: Option<LoadedScene<C>>,
    frame_count: u32,
}

impl<C: WavefrontDevice> Renderer<C> {
    pub fn new(ctx: C, debug: DebugOptions) -> Self {
        Self {
            ctx,
            debug,
            integrator: None,
            scene: None,
            frame_count: 0,
        }
    }

    pub fn context(&self) -> &C {
        &self.ctx
    }

    pub fn integrator(&self) -> Option<&WavefrontIntegrator<C>> {
        self.integrator.as_ref()
    }

    /// Samples accumulated by the current integrator, 0 before the first frame.
    pub fn sample_count(&mut self) -> RenderResult<u32> {
        match &self.integrator {
            Some(integrator) => integrator.sample_count(&mut self.ctx),
            None => Ok(0),
        }
    }

    /// Accumulates `samples_per_pixel` progressive frames of `scene` from a
    /// fresh history and returns the tone mapped result.
    pub fn render_frame(
        &mut self,
        settings: &RenderSettings,
        view: &View,
        scene: &Scene,
    ) -> RenderResult<RgbImage> {
        let started = Instant::now();
        self.ensure_integrator(settings)?;
        self.ensure_scene(scene)?;

        let (Some(integrator), Some(loaded)) = (self.integrator.as_mut(), self.scene.as_ref())
        else {
            return Err(RenderError::scene("renderer has no integrator or scene bound"));
        };
        integrator.set_scene_data(&loaded.data);

        for _ in 0..settings.samples_per_pixel {
            integrator.set_camera_data(view.camera_data(settings.aspect(), self.frame_count));
            integrator.integrate(&mut self.ctx, &loaded.accel)?;
            self.frame_count = self.frame_count.wrapping_add(1);
        }

        let texels = self.ctx.read_surface(integrator.surface())?;
        let image = surface_to_image(settings.width, settings.height, &texels);

        log::info!(
            "[{}] rendered '{}' {}x{} with {} samples in {} ms",
            self.ctx.backend_name(),
            scene.id,
            settings.width,
            settings.height,
            integrator.sample_count(&mut self.ctx)?,
            started.elapsed().as_millis()
        );
        Ok(image)
    }

    fn ensure_integrator(&mut self, settings: &RenderSettings) -> RenderResult<()> {
        let integrator_settings = settings.integrator_settings(&self.debug);
        if let Some(integrator) = &self.integrator {
            if *integrator.settings() == integrator_settings {
                return integrator.reset(&mut self.ctx);
            }
        }

        // Release the old buffers before allocating new ones.
        self.integrator = None;
        self.integrator = Some(WavefrontIntegrator::new(&mut self.ctx, integrator_settings)?);
        Ok(())
    }

    fn ensure_scene(&mut self, scene: &Scene) -> RenderResult<()> {
        let loaded_id = self.scene.as_ref().map(|loaded| loaded.data.id.as_str());
        if loaded_id == Some(scene.id) {
            return Ok(());
        }

        self.scene = None;
        let compiled = compile_scene(scene)?;
        let data = SceneData::upload(&mut self.ctx, &compiled)?;
        let accel = TriangleList::new(&data);
        log::debug!(
            "[{}] scene '{}' ready with {} triangles",
            self.ctx.backend_name(),
            scene.id,
            accel.triangle_count()
        );
        self.scene = Some(LoadedScene { data, accel });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::device::{ExecutionContext, HostContext};
    use crate::domain::presets::build_scene;

    fn settings(width: u32, height: u32, samples: u32) -> RenderSettings {
        RenderSettings {
            width,
            height,
            max_bounces: 3,
            samples_per_pixel: samples,
            seed: 5,
            output_path: "unused.png".into(),
        }
    }

    fn view() -> View {
        View {
            origin: Vec3::new(0.0, 0.0, 3.5),
            target: Vec3::ZERO,
            up: Vec3::Y,
            vertical_fov_deg: 40.0,
            aperture: 0.0,
            focus_distance: None,
        }
    }

    #[test]
    fn renders_sky_preset_at_requested_size() {
        let mut renderer = Renderer::new(HostContext::new(), DebugOptions::default());
        let scene = build_scene("empty_sky").expect("preset");

        let image = renderer
            .render_frame(&settings(8, 6, 2), &view(), &scene)
            .expect("render");

        assert_eq!(image.dimensions(), (8, 6));
        assert!(image.pixels().all(|pixel| pixel[2] > 0));
        assert_eq!(renderer.sample_count().expect("count"), 2);
    }

    #[test]
    fn cornell_box_lamp_lights_the_room() {
        let mut renderer = Renderer::new(HostContext::new(), DebugOptions::default());
        let scene = build_scene("cornell_box").expect("preset");

        let image = renderer
            .render_frame(&settings(16, 16, 4), &view(), &scene)
            .expect("render");

        let lit = image.pixels().filter(|pixel| pixel[0] > 0).count();
        assert!(lit > 0, "no pixel received light");
    }

    #[test]
    fn reuses_integrator_until_settings_change() {
        let mut renderer = Renderer::new(HostContext::new(), DebugOptions::default());
        let scene = build_scene("empty_sky").expect("preset");

        renderer
            .render_frame(&settings(4, 4, 1), &view(), &scene)
            .expect("first");
        let radiance = renderer.integrator().expect("integrator").radiance().clone();

        renderer
            .render_frame(&settings(4, 4, 1), &view(), &scene)
            .expect("second");
        assert!(renderer
            .integrator()
            .expect("integrator")
            .radiance()
            .ptr_eq(&radiance));

        renderer
            .render_frame(&settings(6, 4, 1), &view(), &scene)
            .expect("third");
        let integrator = renderer.integrator().expect("integrator");
        assert!(!integrator.radiance().ptr_eq(&radiance));
        assert_eq!(integrator.surface().width(), 6);
    }

    #[test]
    fn switching_scenes_rebinds_scene_data() {
        let mut renderer = Renderer::new(HostContext::new(), DebugOptions::default());
        let sky = build_scene("empty_sky").expect("preset");
        let mirror = build_scene("mirror_sphere_on_plane").expect("preset");

        renderer
            .render_frame(&settings(4, 4, 1), &view(), &sky)
            .expect("sky");
        renderer
            .render_frame(&settings(4, 4, 1), &view(), &mirror)
            .expect("mirror");

        let integrator = renderer.integrator().expect("integrator");
        assert_eq!(integrator.scene_id(), Some("mirror_sphere_on_plane"));
        assert_eq!(renderer.context().backend_name(), "cpu");
    }
}
