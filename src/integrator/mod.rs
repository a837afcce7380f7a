//! Wavefront integrator: runs one progressive frame as a fixed sequence of
//! stage dispatches over double-buffered ray sets.
//!
//! Per frame the host issues, in order: ray generation into set 0; then for
//! every bounce `b` intersection of set `b & 1`, miss shading, a clear of the
//! outgoing counter and hit shading that appends continuation rays into set
//! `(b + 1) & 1`; then one sample count increment and the resolve into the
//! display surface. The host only waits at resolve.

mod accumulation;
mod buffers;
mod scene;

#[cfg(test)]
mod tests;

pub use accumulation::AccumulationState;
pub use buffers::{parity, PathBuffers, RayBufferSet};
pub use scene::SceneData;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::accel::AccelerationStructure;
use crate::device::WavefrontDevice;
use crate::error::{RenderError, RenderResult};
use crate::kernels::{
    CameraData, ClearCounterArgs, RaygenArgs, ResolveArgs, ShadeHitArgs, ShadeMissArgs, Stage,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegratorSettings {
    pub width: u32,
    pub height: u32,
    pub max_bounces: u32,
    /// Seeds the generator that draws one random value per frame.
    pub seed: u64,
    /// Read both ray counters back after every bounce. Blocks the host.
    pub collect_bounce_stats: bool,
}

impl IntegratorSettings {
    pub fn new(width: u32, height: u32, max_bounces: u32) -> Self {
        Self {
            width,
            height,
            max_bounces,
            seed: 0,
            collect_bounce_stats: false,
        }
    }

    /// `None` when the resolution does not fit the ray counters.
    pub fn pixel_count(&self) -> Option<u32> {
        self.width.checked_mul(self.height)
    }

    fn validated_pixel_count(&self) -> RenderResult<u32> {
        self.validate()?;
        self.pixel_count()
            .ok_or_else(|| RenderError::config("pixel count overflows"))
    }

    fn validate(&self) -> RenderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::config("integrator width and height must be positive"));
        }
        if self.pixel_count().is_none() {
            return Err(RenderError::config(format!(
                "{}x{} pixels exceed the addressable ray count",
                self.width, self.height
            )));
        }
        if self.max_bounces == 0 {
            return Err(RenderError::config("maxBounces must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegratorState {
    Idle,
    Generating,
    Bouncing(u32),
    Advancing,
    Resolving,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BounceStats {
    pub bounce: u32,
    /// Active rays entering the bounce.
    pub incoming: u32,
    /// Continuation rays appended by hit shading.
    pub outgoing: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub primary_rays: u32,
    pub bounces: Vec<BounceStats>,
}

pub struct WavefrontIntegrator<C: WavefrontDevice> {
    settings: IntegratorSettings,
    state: IntegratorState,
    buffers: PathBuffers<C>,
    accumulation: AccumulationState<C>,
    surface: C::Surface,
    scene_id: Option<String>,
    frame_rng: SmallRng,
    raygen: Stage<RaygenArgs<C>>,
    shade_miss: Stage<ShadeMissArgs<C>>,
    clear_outgoing: Stage<ClearCounterArgs<C>>,
    shade_hit: Stage<ShadeHitArgs<C>>,
    resolve: Stage<ResolveArgs<C>>,
    last_stats: Option<FrameStats>,
}

impl<C: WavefrontDevice> WavefrontIntegrator<C> {
    /// Allocates every buffer, binds every stage and resets accumulation.
    /// Any allocation failure aborts construction.
    pub fn new(ctx: &mut C, settings: IntegratorSettings) -> RenderResult<Self> {
        let pixel_count = settings.validated_pixel_count()?;

        let buffers = PathBuffers::new(ctx, pixel_count)?;
        let accumulation = AccumulationState::new(ctx, pixel_count)?;
        let surface = ctx.create_surface("resolve-surface", settings.width, settings.height)?;

        let primary = buffers.incoming(0);
        let secondary = buffers.outgoing(0);
        let raygen = Stage::new(RaygenArgs {
            width: settings.width,
            height: settings.height,
            camera: CameraData::look_at(
                glam::Vec3::ZERO,
                glam::Vec3::NEG_Z,
                glam::Vec3::Y,
                45.0,
                settings.width as f32 / settings.height as f32,
            ),
            frame_seed: 0,
            sample_counter: accumulation.sample_counter().clone(),
            rays: primary.rays.clone(),
            ray_counter: primary.counter.clone(),
            pixel_indices: primary.pixel_indices.clone(),
            throughputs: buffers.throughputs.clone(),
        });
        let shade_miss = Stage::new(ShadeMissArgs {
            rays: primary.rays.clone(),
            ray_counter: primary.counter.clone(),
            pixel_indices: primary.pixel_indices.clone(),
            hits: buffers.hits.clone(),
            throughputs: buffers.throughputs.clone(),
            environment: None,
            environment_size: [0, 0],
            radiance: accumulation.radiance().clone(),
        });
        let clear_outgoing = Stage::new(ClearCounterArgs {
            counter: secondary.counter.clone(),
        });
        let shade_hit = Stage::new(ShadeHitArgs {
            incoming_rays: primary.rays.clone(),
            incoming_ray_counter: primary.counter.clone(),
            incoming_pixel_indices: primary.pixel_indices.clone(),
            hits: buffers.hits.clone(),
            triangles: None,
            materials: None,
            bounce: 0,
            frame_seed: 0,
            sample_counter: accumulation.sample_counter().clone(),
            throughputs: buffers.throughputs.clone(),
            outgoing_rays: secondary.rays.clone(),
            outgoing_ray_counter: secondary.counter.clone(),
            outgoing_pixel_indices: secondary.pixel_indices.clone(),
            radiance: accumulation.radiance().clone(),
        });
        let resolve = Stage::new(ResolveArgs {
            width: settings.width,
            height: settings.height,
            radiance: accumulation.radiance().clone(),
            sample_counter: accumulation.sample_counter().clone(),
            surface: surface.clone(),
        });

        let integrator = Self {
            settings,
            state: IntegratorState::Idle,
            buffers,
            accumulation,
            surface,
            scene_id: None,
            frame_rng: SmallRng::seed_from_u64(settings.seed),
            raygen,
            shade_miss,
            clear_outgoing,
            shade_hit,
            resolve,
            last_stats: None,
        };
        integrator.reset(ctx)?;

        log::debug!(
            "[{}] wavefront integrator {}x{}, {} bounces",
            ctx.backend_name(),
            settings.width,
            settings.height,
            settings.max_bounces
        );
        Ok(integrator)
    }

    /// Drops all accumulated samples. Calling it twice is the same as once.
    pub fn reset(&self, ctx: &mut C) -> RenderResult<()> {
        self.accumulation.reset(ctx)
    }

    pub fn set_camera_data(&mut self, camera: CameraData) {
        self.raygen.bind().camera = camera;
    }

    pub fn set_scene_data(&mut self, scene: &SceneData<C>) {
        {
            let miss = self.shade_miss.bind();
            miss.environment = Some(scene.environment.clone());
            miss.environment_size = scene.environment_size;
        }
        {
            let hit = self.shade_hit.bind();
            hit.triangles = Some(scene.triangles.clone());
            hit.materials = Some(scene.materials.clone());
        }
        self.scene_id = Some(scene.id.clone());
        log::debug!(
            "bound scene '{}': {} triangles, {} materials",
            scene.id,
            scene.triangle_count,
            scene.material_count
        );
    }

    /// Runs one full frame and resolves it into the surface. On error the
    /// frame is abandoned and the accumulated history is dropped, since the
    /// failed frame may already have added radiance without being counted.
    pub fn integrate<A>(&mut self, ctx: &mut C, accel: &A) -> RenderResult<()>
    where
        A: AccelerationStructure<C>,
    {
        if self.scene_id.is_none() {
            return Err(RenderError::scene("no scene data bound to the integrator"));
        }
        let result = self.run_frame(ctx, accel);
        if let Err(error) = &result {
            log::warn!("[{}] frame abandoned, dropping accumulation: {error}", ctx.backend_name());
            if let Err(reset_error) = self.accumulation.reset(ctx) {
                log::warn!("[{}] accumulation reset failed: {reset_error}", ctx.backend_name());
            }
        }
        self.transition(IntegratorState::Idle);
        result
    }

    /// Normalizes the accumulated radiance into the display surface.
    pub fn resolve(&mut self, ctx: &mut C) -> RenderResult<()> {
        let result = self.resolve_surface(ctx);
        self.transition(IntegratorState::Idle);
        result
    }

    fn run_frame<A>(&mut self, ctx: &mut C, accel: &A) -> RenderResult<()>
    where
        A: AccelerationStructure<C>,
    {
        let pixel_count = self.settings.validated_pixel_count()?;
        let frame_seed: u32 = self.frame_rng.gen();
        let mut stats = self.settings.collect_bounce_stats.then(FrameStats::default);

        self.transition(IntegratorState::Generating);
        self.raygen.bind().frame_seed = frame_seed;
        ctx.dispatch(&self.raygen, pixel_count)?;
        if let Some(stats) = stats.as_mut() {
            stats.primary_rays = ctx.read_counter(&self.buffers.incoming(0).counter)?;
        }

        for bounce in 0..self.settings.max_bounces {
            self.transition(IntegratorState::Bouncing(bounce));
            let incoming = self.buffers.incoming(bounce).clone();
            let outgoing = self.buffers.outgoing(bounce).clone();
            let incoming_count = match stats {
                Some(_) => ctx.read_counter(&incoming.counter)?,
                None => 0,
            };

            accel.intersect_rays(
                ctx,
                &incoming.rays,
                &incoming.counter,
                pixel_count,
                &self.buffers.hits,
            )?;

            {
                let miss = self.shade_miss.bind();
                miss.rays = incoming.rays.clone();
                miss.ray_counter = incoming.counter.clone();
                miss.pixel_indices = incoming.pixel_indices.clone();
            }
            ctx.dispatch(&self.shade_miss, pixel_count)?;

            // Hit shading appends through this counter.
            self.clear_outgoing.bind().counter = outgoing.counter.clone();
            ctx.dispatch(&self.clear_outgoing, 1)?;

            {
                let hit = self.shade_hit.bind();
                hit.incoming_rays = incoming.rays;
                hit.incoming_ray_counter = incoming.counter;
                hit.incoming_pixel_indices = incoming.pixel_indices;
                hit.bounce = bounce;
                hit.frame_seed = frame_seed;
                hit.outgoing_rays = outgoing.rays;
                hit.outgoing_ray_counter = outgoing.counter.clone();
                hit.outgoing_pixel_indices = outgoing.pixel_indices;
            }
            ctx.dispatch(&self.shade_hit, pixel_count)?;

            if let Some(stats) = stats.as_mut() {
                let outgoing_count = ctx.read_counter(&outgoing.counter)?;
                stats.bounces.push(BounceStats {
                    bounce,
                    incoming: incoming_count,
                    outgoing: outgoing_count,
                });
            }
        }

        self.transition(IntegratorState::Advancing);
        self.accumulation.advance_sample_count(ctx)?;

        self.resolve_surface(ctx)?;

        if let Some(stats) = stats.as_ref() {
            log::debug!(
                "[{}] frame stats: {} primary rays, bounces {:?}",
                ctx.backend_name(),
                stats.primary_rays,
                stats.bounces
            );
        }
        self.last_stats = stats;
        Ok(())
    }

    /// Acquire, write, drain, release. The surface is released even when the
    /// write fails, after the pipeline has drained.
    fn resolve_surface(&mut self, ctx: &mut C) -> RenderResult<()> {
        self.transition(IntegratorState::Resolving);
        let pixel_count = self.settings.validated_pixel_count()?;
        ctx.acquire_foreign(&self.surface)?;
        let written = ctx.dispatch(&self.resolve, pixel_count);
        let drained = ctx.drain();
        let released = ctx.release_foreign(&self.surface);
        written.and(drained).and(released)
    }

    fn transition(&mut self, next: IntegratorState) {
        log::trace!("integrator {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    pub fn state(&self) -> IntegratorState {
        self.state
    }

    pub fn surface(&self) -> &C::Surface {
        &self.surface
    }

    pub fn radiance(&self) -> &C::Buffer<[f32; 4]> {
        self.accumulation.radiance()
    }

    pub fn scene_id(&self) -> Option<&str> {
        self.scene_id.as_deref()
    }

    pub fn sample_count(&self, ctx: &mut C) -> RenderResult<u32> {
        self.accumulation.sample_count(ctx)
    }

    /// Current value of the counter of ray set `index` (0 or 1).
    pub fn active_ray_count(&self, ctx: &mut C, index: usize) -> RenderResult<u32> {
        ctx.read_counter(&self.buffers.set(index).counter)
    }

    pub fn last_frame_stats(&self) -> Option<&FrameStats> {
        self.last_stats.as_ref()
    }
}
