use std::cell::Cell;

use glam::Vec3;

use super::*;
use crate::accel::{AccelerationStructure, TriangleList};
use crate::device::{DispatchRecord, ExecutionContext, HostBuffer, HostContext, HostCounter};
use crate::kernels::types::{MATERIAL_KIND_DIFFUSE, MATERIAL_KIND_MIRROR};
use crate::kernels::{CameraData, Hit, Kernel, MaterialRecord, Ray, Triangle};
use crate::render::CompiledScene;

const SKY: [f32; 4] = [0.25, 0.5, 0.75, 1.0];

fn constant_sky() -> CompiledScene {
    CompiledScene {
        id: "constant_sky".into(),
        triangles: Vec::new(),
        materials: Vec::new(),
        environment: vec![SKY],
        environment_size: [1, 1],
    }
}

/// Large quad at `z` facing the default camera.
fn wall(z: f32, material: MaterialRecord) -> CompiledScene {
    let a = Vec3::new(-20.0, -20.0, z);
    let b = Vec3::new(20.0, -20.0, z);
    let c = Vec3::new(20.0, 20.0, z);
    let d = Vec3::new(-20.0, 20.0, z);
    CompiledScene {
        id: "wall".into(),
        triangles: vec![Triangle::new(a, b, c, 0), Triangle::new(a, c, d, 0)],
        materials: vec![material],
        environment: vec![SKY],
        environment_size: [1, 1],
    }
}

fn diffuse(albedo: f32, emission: f32) -> MaterialRecord {
    MaterialRecord {
        albedo: [albedo; 3],
        kind: MATERIAL_KIND_DIFFUSE,
        emission: [emission; 3],
        _pad: 0.0,
    }
}

fn setup(
    ctx: &mut HostContext,
    settings: IntegratorSettings,
    scene: &CompiledScene,
) -> (WavefrontIntegrator<HostContext>, TriangleList<HostContext>) {
    let mut integrator = WavefrontIntegrator::new(ctx, settings).expect("integrator");
    let data = SceneData::upload(ctx, scene).expect("scene upload");
    integrator.set_scene_data(&data);
    (integrator, TriangleList::new(&data))
}

fn resolved(ctx: &mut HostContext, integrator: &WavefrontIntegrator<HostContext>) -> Vec<[f32; 4]> {
    ctx.read_surface(integrator.surface()).expect("readback")
}

fn assert_close(texel: [f32; 4], expected: [f32; 3]) {
    for channel in 0..3 {
        assert!(
            (texel[channel] - expected[channel]).abs() < 1e-5,
            "{texel:?} != {expected:?}"
        );
    }
}

#[test]
fn all_miss_frame_resolves_to_environment_color() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(4, 4, 1), &constant_sky());

    integrator.integrate(&mut ctx, &accel).expect("integrate");

    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 1);
    let texels = resolved(&mut ctx, &integrator);
    assert_eq!(texels.len(), 16);
    for texel in texels {
        assert_close(texel, [SKY[0], SKY[1], SKY[2]]);
        assert_eq!(texel[3], 1.0);
    }
    assert_eq!(integrator.state(), IntegratorState::Idle);
}

#[test]
fn progressive_frames_converge_instead_of_growing() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(4, 4, 1), &constant_sky());

    integrator.integrate(&mut ctx, &accel).expect("frame 1");
    let first = resolved(&mut ctx, &integrator);
    integrator.integrate(&mut ctx, &accel).expect("frame 2");
    let second = resolved(&mut ctx, &integrator);

    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 2);
    assert_eq!(first, second);
    let sums = ctx.read_buffer(integrator.radiance()).expect("radiance");
    assert_close(sums[0], [2.0 * SKY[0], 2.0 * SKY[1], 2.0 * SKY[2]]);
}

#[test]
fn reset_then_resolve_writes_black() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(4, 4, 1), &constant_sky());
    integrator.integrate(&mut ctx, &accel).expect("integrate");

    integrator.reset(&mut ctx).expect("reset");
    integrator.resolve(&mut ctx).expect("resolve");

    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 0);
    for texel in resolved(&mut ctx, &integrator) {
        assert_eq!(texel, [0.0, 0.0, 0.0, 1.0]);
    }
}

#[test]
fn reset_twice_matches_reset_once() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(4, 4, 2), &constant_sky());
    integrator.integrate(&mut ctx, &accel).expect("integrate");

    integrator.reset(&mut ctx).expect("reset");
    let once = ctx.read_buffer(integrator.radiance()).expect("radiance");
    let once_count = integrator.sample_count(&mut ctx).expect("count");
    integrator.reset(&mut ctx).expect("reset again");
    let twice = ctx.read_buffer(integrator.radiance()).expect("radiance");

    assert_eq!(once, twice);
    assert_eq!(once_count, integrator.sample_count(&mut ctx).expect("count"));
}

#[test]
fn primary_ray_count_equals_pixel_count() {
    let mut ctx = HostContext::new();
    let mut settings = IntegratorSettings::new(5, 3, 1);
    settings.collect_bounce_stats = true;
    let (mut integrator, accel) = setup(&mut ctx, settings, &constant_sky());

    for _ in 0..3 {
        integrator.integrate(&mut ctx, &accel).expect("integrate");
        let stats = integrator.last_frame_stats().expect("stats");
        assert_eq!(stats.primary_rays, 15);
        assert_eq!(stats.bounces[0].incoming, 15);
        // Nothing to hit, nothing continues.
        assert_eq!(stats.bounces[0].outgoing, 0);
    }
}

#[test]
fn active_rays_never_grow_across_bounces() {
    let mut ctx = HostContext::new();
    let mut settings = IntegratorSettings::new(8, 8, 4);
    settings.collect_bounce_stats = true;
    settings.seed = 11;
    // Camera sits between a mirror wall in front and open sky behind.
    let mut scene = wall(-2.0, diffuse(0.0, 0.0));
    scene.materials[0].kind = MATERIAL_KIND_MIRROR;
    scene.materials[0].albedo = [0.8; 3];
    let (mut integrator, accel) = setup(&mut ctx, settings, &scene);

    integrator.integrate(&mut ctx, &accel).expect("integrate");

    let stats = integrator.last_frame_stats().expect("stats").clone();
    assert_eq!(stats.bounces.len(), 4);
    assert_eq!(stats.bounces[0].incoming, 64);
    for window in stats.bounces.windows(2) {
        assert!(window[0].outgoing <= window[0].incoming);
        assert_eq!(window[1].incoming, window[0].outgoing);
    }
    // Every primary ray hits the mirror and bounces back out to the sky.
    assert_eq!(stats.bounces[0].outgoing, 64);
    assert_eq!(stats.bounces[1].outgoing, 0);
    for texel in resolved(&mut ctx, &integrator) {
        assert_close(texel, [0.8 * SKY[0], 0.8 * SKY[1], 0.8 * SKY[2]]);
    }
}

#[test]
fn emission_is_attributed_to_the_emitting_pixel() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) =
        setup(&mut ctx, IntegratorSettings::new(4, 4, 1), &wall(-3.0, diffuse(0.0, 2.0)));

    integrator.integrate(&mut ctx, &accel).expect("integrate");

    assert_eq!(integrator.active_ray_count(&mut ctx, 1).expect("count"), 0);
    for texel in resolved(&mut ctx, &integrator) {
        assert_close(texel, [2.0, 2.0, 2.0]);
    }
}

#[test]
fn bounce_dispatch_order_is_fixed() {
    let mut ctx = HostContext::with_trace();
    let (mut integrator, accel) =
        setup(&mut ctx, IntegratorSettings::new(2, 2, 2), &wall(-1.0, diffuse(0.5, 0.0)));
    ctx.take_trace();

    integrator.integrate(&mut ctx, &accel).expect("integrate");

    let kernels: Vec<Kernel> = ctx.trace().iter().map(|record| record.kernel).collect();
    let bounce = [Kernel::Intersect, Kernel::ShadeMiss, Kernel::ClearCounter, Kernel::ShadeHit];
    let mut expected = vec![Kernel::RayGeneration];
    expected.extend(bounce);
    expected.extend(bounce);
    expected.extend([Kernel::IncrementCounter, Kernel::Resolve]);
    assert_eq!(kernels, expected);
    assert_eq!(
        ctx.trace()[0],
        DispatchRecord {
            kernel: Kernel::RayGeneration,
            work_items: 4,
        }
    );
}

#[test]
fn construction_resets_accumulation() {
    let mut ctx = HostContext::with_trace();
    let integrator = WavefrontIntegrator::new(&mut ctx, IntegratorSettings::new(3, 3, 1)).expect("new");

    let kernels: Vec<Kernel> = ctx.trace().iter().map(|record| record.kernel).collect();
    assert_eq!(kernels, vec![Kernel::ClearCounter, Kernel::ResetRadiance]);
    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 0);
}

#[test]
fn integrate_without_scene_is_rejected() {
    let mut ctx = HostContext::new();
    let mut integrator = WavefrontIntegrator::new(&mut ctx, IntegratorSettings::new(2, 2, 1)).expect("new");
    let data = SceneData::upload(&mut ctx, &constant_sky()).expect("upload");
    let accel = TriangleList::new(&data);

    let error = integrator.integrate(&mut ctx, &accel).expect_err("no scene bound");
    assert!(matches!(error, RenderError::Scene(_)));
    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 0);
    assert_eq!(integrator.state(), IntegratorState::Idle);
}

#[test]
fn invalid_settings_are_rejected() {
    let mut ctx = HostContext::new();
    for settings in [
        IntegratorSettings::new(0, 4, 1),
        IntegratorSettings::new(4, 0, 1),
        IntegratorSettings::new(4, 4, 0),
        IntegratorSettings::new(70_000, 70_000, 1),
    ] {
        let result = WavefrontIntegrator::new(&mut ctx, settings);
        assert!(matches!(result, Err(RenderError::Config(_))));
    }
    assert_eq!(IntegratorSettings::new(70_000, 70_000, 1).pixel_count(), None);
    assert_eq!(IntegratorSettings::new(5, 3, 1).pixel_count(), Some(15));
}

#[test]
fn failed_frame_returns_to_idle_and_releases_surface() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(2, 2, 1), &constant_sky());

    // A foreign owner holding the surface makes the resolve fail.
    ctx.acquire_foreign(integrator.surface()).expect("acquire");
    let error = integrator.integrate(&mut ctx, &accel).expect_err("surface busy");
    assert!(matches!(error, RenderError::ForeignResource(_)));
    assert_eq!(integrator.state(), IntegratorState::Idle);

    ctx.drain().expect("drain");
    ctx.release_foreign(integrator.surface()).expect("release");
    integrator.integrate(&mut ctx, &accel).expect("next frame");
}

/// Intersects normally until the given call, which fails.
struct FailsOnCall {
    inner: TriangleList<HostContext>,
    calls: Cell<u32>,
    failing_call: u32,
}

impl AccelerationStructure<HostContext> for FailsOnCall {
    fn intersect_rays(
        &self,
        ctx: &mut HostContext,
        rays: &HostBuffer<Ray>,
        ray_counter: &HostCounter,
        max_rays: u32,
        hits: &HostBuffer<Hit>,
    ) -> RenderResult<()> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.failing_call {
            return Err(RenderError::device("intersection lost"));
        }
        self.inner.intersect_rays(ctx, rays, ray_counter, max_rays, hits)
    }
}

#[test]
fn failed_frame_leaves_no_partial_radiance() {
    let mut ctx = HostContext::new();
    let scene = constant_sky();
    let (mut integrator, accel) = setup(&mut ctx, IntegratorSettings::new(4, 4, 2), &scene);
    integrator.integrate(&mut ctx, &accel).expect("good frame");

    // The second bounce fails after the first has already shaded its misses.
    let data = SceneData::upload(&mut ctx, &scene).expect("scene upload");
    let failing = FailsOnCall {
        inner: TriangleList::new(&data),
        calls: Cell::new(0),
        failing_call: 2,
    };
    let error = integrator.integrate(&mut ctx, &failing).expect_err("intersection fails");
    assert!(matches!(error, RenderError::Device(_)));
    assert_eq!(failing.calls.get(), 2);

    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 0);
    for texel in ctx.read_buffer(integrator.radiance()).expect("radiance") {
        assert_eq!(texel, [0.0; 4]);
    }
    integrator.resolve(&mut ctx).expect("resolve");
    for texel in resolved(&mut ctx, &integrator) {
        assert_eq!(texel, [0.0, 0.0, 0.0, 1.0]);
    }

    integrator.integrate(&mut ctx, &accel).expect("recovered frame");
    assert_eq!(integrator.sample_count(&mut ctx).expect("count"), 1);
    for texel in resolved(&mut ctx, &integrator) {
        assert_close(texel, [SKY[0], SKY[1], SKY[2]]);
    }
}

#[test]
fn camera_data_steers_primary_rays() {
    let mut ctx = HostContext::new();
    let (mut integrator, accel) =
        setup(&mut ctx, IntegratorSettings::new(4, 4, 1), &wall(-3.0, diffuse(0.0, 2.0)));
    integrator.integrate(&mut ctx, &accel).expect("facing the wall");
    for texel in resolved(&mut ctx, &integrator) {
        assert_close(texel, [2.0, 2.0, 2.0]);
    }

    // Turned around, every primary ray escapes to the sky.
    integrator.reset(&mut ctx).expect("reset");
    integrator.set_camera_data(CameraData::look_at(Vec3::ZERO, Vec3::Z, Vec3::Y, 45.0, 1.0));
    integrator.integrate(&mut ctx, &accel).expect("facing away");
    for texel in resolved(&mut ctx, &integrator) {
        assert_close(texel, [SKY[0], SKY[1], SKY[2]]);
    }
}
