//! Host execution context: every dispatch runs its invocations on the rayon
//! thread pool.
//!
//! Invocations only read shared inputs and produce their writes; the writes
//! are committed before `launch` returns, so a dispatch is complete and
//! visible to the next one as soon as it has been issued. Append slots in
//! ray buffers are reserved with an atomic fetch-and-add from inside the
//! parallel section, exactly like the device kernels do.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rayon::prelude::*;

use super::{Element, ExecutionContext, Launch};
use crate::error::{RenderError, RenderResult, ResourceAllocationError};
use crate::kernels::shading::{
    closest_hit, environment_radiance, generate_primary_ray, resolve_pixel, shade_surface,
};
use crate::kernels::{
    ClearCounterArgs, IncrementCounterArgs, IntersectArgs, Kernel, Ray, RaygenArgs,
    ResetRadianceArgs, ResolveArgs, ShadeHitArgs, ShadeMissArgs,
};
use crate::math::{path_seed, SampleRng};

/// Seed salt for ray generation, kept apart from the per-bounce seeds.
const RAYGEN_SEED_SALT: u32 = 0xffff_ffff;

pub struct HostBuffer<T> {
    label: Arc<str>,
    data: Arc<RwLock<Vec<T>>>,
    _element: PhantomData<T>,
}

impl<T> Clone for HostBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            data: Arc::clone(&self.data),
            _element: PhantomData,
        }
    }
}

impl<T: Element> HostBuffer<T> {
    fn new(label: &str, data: Vec<T>) -> Self {
        Self {
            label: Arc::from(label),
            data: Arc::new(RwLock::new(data)),
            _element: PhantomData,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Host-side overwrite of `values.len()` elements starting at `offset`.
    pub fn write(&self, offset: usize, values: &[T]) -> RenderResult<()> {
        let mut data = self
            .data
            .try_write()
            .ok_or_else(|| RenderError::contract(format!("buffer '{}' is busy", self.label)))?;
        let end = offset + values.len();
        if end > data.len() {
            return Err(RenderError::contract(format!(
                "write of {end} elements into buffer '{}' of {}",
                self.label,
                data.len()
            )));
        }
        data[offset..end].copy_from_slice(values);
        Ok(())
    }

    /// Read access for one dispatch. Fails when the same buffer is also bound
    /// as an output of that dispatch.
    fn read_for(&self, kernel: Kernel) -> RenderResult<RwLockReadGuard<'_, Vec<T>>> {
        self.data.try_read().ok_or_else(|| aliased(kernel, &self.label))
    }

    fn write_for(&self, kernel: Kernel) -> RenderResult<RwLockWriteGuard<'_, Vec<T>>> {
        self.data.try_write().ok_or_else(|| aliased(kernel, &self.label))
    }
}

fn aliased(kernel: Kernel, label: &str) -> RenderError {
    RenderError::contract(format!(
        "{}: buffer '{label}' is bound to more than one conflicting slot",
        kernel.as_str()
    ))
}

fn too_small(kernel: Kernel, label: &str, needed: usize, len: usize) -> RenderError {
    RenderError::contract(format!(
        "{}: buffer '{label}' holds {len} elements but {needed} are addressed",
        kernel.as_str()
    ))
}

fn ensure_len<T>(kernel: Kernel, label: &str, data: &[T], needed: usize) -> RenderResult<()> {
    if data.len() < needed {
        return Err(too_small(kernel, label, needed, data.len()));
    }
    Ok(())
}

fn out_of_range(kernel: Kernel, label: &str, index: usize, len: usize) -> RenderError {
    RenderError::contract(format!(
        "{}: index {index} is out of range for buffer '{label}' of {len}",
        kernel.as_str()
    ))
}

/// Bounds-checked element read inside an invocation.
fn element<'a, T>(kernel: Kernel, label: &str, data: &'a [T], index: usize) -> RenderResult<&'a T> {
    data.get(index)
        .ok_or_else(|| out_of_range(kernel, label, index, data.len()))
}

fn unbound(kernel: Kernel, slot: &str) -> RenderError {
    RenderError::contract(format!("{}: slot '{slot}' is not bound", kernel.as_str()))
}

/// Owned atomic counter with an explicit clear / reserve / load contract.
#[derive(Clone, Debug, Default)]
pub struct HostCounter(Arc<AtomicU32>);

impl HostCounter {
    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }

    pub fn store(&self, value: u32) {
        self.0.store(value, Ordering::Release);
    }

    /// Atomically claims the next slot and returns its index.
    pub fn reserve(&self) -> u32 {
        self.0.fetch_add(1, Ordering::AcqRel)
    }

    pub fn load(&self) -> u32 {
        self.0.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone)]
pub struct HostSurface {
    width: u32,
    height: u32,
    texels: Arc<RwLock<Vec<[f32; 4]>>>,
    acquired: Arc<AtomicBool>,
}

impl HostSurface {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchRecord {
    pub kernel: Kernel,
    pub work_items: u32,
}

#[derive(Default)]
pub struct HostContext {
    trace: Option<Vec<DispatchRecord>>,
    undrained: u32,
}

impl HostContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that records every dispatch in issue order.
    pub fn with_trace() -> Self {
        Self {
            trace: Some(Vec::new()),
            undrained: 0,
        }
    }

    pub fn trace(&self) -> &[DispatchRecord] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn take_trace(&mut self) -> Vec<DispatchRecord> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn record(&mut self, kernel: Kernel, work_items: u32) {
        self.undrained += 1;
        if let Some(trace) = self.trace.as_mut() {
            trace.push(DispatchRecord { kernel, work_items });
        }
    }
}

fn allocate<T: Element>(label: &str, len: usize) -> Result<Vec<T>, ResourceAllocationError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|error| ResourceAllocationError::new(label, error))?;
    data.resize(len, T::zeroed());
    Ok(data)
}

impl ExecutionContext for HostContext {
    type Buffer<T: Element> = HostBuffer<T>;
    type Counter = HostCounter;
    type Surface = HostSurface;

    fn backend_name(&self) -> &'static str {
        "cpu"
    }

    fn create_buffer<T: Element>(
        &mut self,
        label: &str,
        len: usize,
    ) -> Result<HostBuffer<T>, ResourceAllocationError> {
        Ok(HostBuffer::new(label, allocate(label, len)?))
    }

    fn upload_buffer<T: Element>(
        &mut self,
        label: &str,
        data: &[T],
    ) -> Result<HostBuffer<T>, ResourceAllocationError> {
        let mut storage = allocate::<T>(label, 0)?;
        storage
            .try_reserve_exact(data.len())
            .map_err(|error| ResourceAllocationError::new(label, error))?;
        storage.extend_from_slice(data);
        Ok(HostBuffer::new(label, storage))
    }

    fn create_counter(&mut self, _label: &str) -> Result<HostCounter, ResourceAllocationError> {
        Ok(HostCounter::default())
    }

    fn create_surface(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<HostSurface, ResourceAllocationError> {
        if width == 0 || height == 0 {
            return Err(ResourceAllocationError::new(label, "surface must not be empty"));
        }
        let texels = allocate(label, width as usize * height as usize)?;
        Ok(HostSurface {
            width,
            height,
            texels: Arc::new(RwLock::new(texels)),
            acquired: Arc::new(AtomicBool::new(false)),
        })
    }

    fn acquire_foreign(&mut self, surface: &HostSurface) -> RenderResult<()> {
        if surface.acquired.swap(true, Ordering::AcqRel) {
            return Err(RenderError::foreign("surface is already acquired"));
        }
        Ok(())
    }

    fn release_foreign(&mut self, surface: &HostSurface) -> RenderResult<()> {
        if !surface.is_acquired() {
            return Err(RenderError::foreign("surface released without being acquired"));
        }
        if self.undrained > 0 {
            return Err(RenderError::foreign(format!(
                "surface released with {} undrained dispatches",
                self.undrained
            )));
        }
        surface.acquired.store(false, Ordering::Release);
        Ok(())
    }

    fn drain(&mut self) -> RenderResult<()> {
        self.undrained = 0;
        Ok(())
    }

    fn read_counter(&mut self, counter: &HostCounter) -> RenderResult<u32> {
        Ok(counter.load())
    }

    fn read_buffer<T: Element>(&mut self, buffer: &HostBuffer<T>) -> RenderResult<Vec<T>> {
        let data = buffer
            .data
            .try_read()
            .ok_or_else(|| RenderError::readback(format!("buffer '{}' is busy", buffer.label)))?;
        Ok(data.clone())
    }

    fn read_surface(&mut self, surface: &HostSurface) -> RenderResult<Vec<[f32; 4]>> {
        let texels = surface
            .texels
            .try_read()
            .ok_or_else(|| RenderError::readback("surface is busy"))?;
        Ok(texels.clone())
    }
}

impl Launch<ResetRadianceArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &ResetRadianceArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::ResetRadiance;
        self.record(kernel, work_items);

        let count = work_items.min(args.pixel_count) as usize;
        let mut radiance = args.radiance.write_for(kernel)?;
        ensure_len(kernel, args.radiance.label(), &radiance, count)?;
        radiance[..count]
            .par_iter_mut()
            .for_each(|texel| *texel = [0.0; 4]);
        Ok(())
    }
}

impl Launch<ClearCounterArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &ClearCounterArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        self.record(Kernel::ClearCounter, work_items);
        args.counter.clear();
        Ok(())
    }
}

impl Launch<IncrementCounterArgs<HostContext>> for HostContext {
    fn launch(
        &mut self,
        args: &IncrementCounterArgs<HostContext>,
        work_items: u32,
    ) -> RenderResult<()> {
        self.record(Kernel::IncrementCounter, work_items);
        args.counter.reserve();
        Ok(())
    }
}

impl Launch<RaygenArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &RaygenArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::RayGeneration;
        self.record(kernel, work_items);

        let count = work_items.min(args.width * args.height) as usize;
        let sample_count = args.sample_counter.load();
        let frame_seed = args.frame_seed ^ args.camera.frame_count.wrapping_mul(0x2c1b_3c6d);

        let mut rays = args.rays.write_for(kernel)?;
        let mut pixels = args.pixel_indices.write_for(kernel)?;
        let mut throughputs = args.throughputs.write_for(kernel)?;
        ensure_len(kernel, args.rays.label(), &rays, count)?;
        ensure_len(kernel, args.pixel_indices.label(), &pixels, count)?;
        ensure_len(kernel, args.throughputs.label(), &throughputs, count)?;

        rays[..count]
            .par_iter_mut()
            .zip(pixels[..count].par_iter_mut())
            .zip(throughputs[..count].par_iter_mut())
            .enumerate()
            .for_each(|(index, ((ray, pixel), throughput))| {
                let pixel_index = index as u32;
                let mut rng =
                    SampleRng::new(path_seed(pixel_index, sample_count, frame_seed, RAYGEN_SEED_SALT));
                *ray = generate_primary_ray(&args.camera, args.width, args.height, pixel_index, &mut rng);
                *pixel = pixel_index;
                *throughput = [1.0, 1.0, 1.0, 0.0];
            });

        args.ray_counter.store(count as u32);
        Ok(())
    }
}

impl Launch<IntersectArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &IntersectArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::Intersect;
        self.record(kernel, work_items);

        let active = work_items.min(args.ray_counter.load()) as usize;
        let rays = args.rays.read_for(kernel)?;
        let triangles = args.triangles.read_for(kernel)?;
        let mut hits = args.hits.write_for(kernel)?;
        ensure_len(kernel, args.rays.label(), &rays, active)?;
        ensure_len(kernel, args.hits.label(), &hits, active)?;
        let triangle_count = args.triangle_count as usize;
        ensure_len(kernel, args.triangles.label(), &triangles, triangle_count)?;
        let triangles = &triangles[..triangle_count];

        hits[..active]
            .par_iter_mut()
            .zip(rays[..active].par_iter())
            .for_each(|(hit, ray)| *hit = closest_hit(ray, triangles));
        Ok(())
    }
}

impl Launch<ShadeMissArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &ShadeMissArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::ShadeMiss;
        self.record(kernel, work_items);

        let environment = args
            .environment
            .as_ref()
            .ok_or_else(|| unbound(kernel, "environment"))?;
        let active = work_items.min(args.ray_counter.load()) as usize;
        let [env_width, env_height] = args.environment_size;

        let contributions: RenderResult<Vec<(usize, Vec3)>> = {
            let rays = args.rays.read_for(kernel)?;
            let pixels = args.pixel_indices.read_for(kernel)?;
            let hits = args.hits.read_for(kernel)?;
            let throughputs = args.throughputs.read_for(kernel)?;
            let texels = environment.read_for(kernel)?;
            ensure_len(kernel, args.rays.label(), &rays, active)?;
            ensure_len(kernel, args.pixel_indices.label(), &pixels, active)?;
            ensure_len(kernel, args.hits.label(), &hits, active)?;

            (0..active)
                .into_par_iter()
                .filter(|&slot| hits[slot].is_miss())
                .map(|slot| -> RenderResult<(usize, Vec3)> {
                    let pixel = pixels[slot] as usize;
                    let throughput = element(kernel, args.throughputs.label(), &throughputs, pixel)?;
                    let background =
                        environment_radiance(&texels, env_width, env_height, rays[slot].direction());
                    Ok((pixel, background * Vec3::new(throughput[0], throughput[1], throughput[2])))
                })
                .collect()
        };
        let contributions = contributions?;

        let mut radiance = args.radiance.write_for(kernel)?;
        for (pixel, contribution) in contributions {
            let len = radiance.len();
            let texel = radiance
                .get_mut(pixel)
                .ok_or_else(|| too_small(kernel, args.radiance.label(), pixel + 1, len))?;
            texel[0] += contribution.x;
            texel[1] += contribution.y;
            texel[2] += contribution.z;
        }
        Ok(())
    }
}

struct HitOutcome {
    pixel: u32,
    emitted: Vec3,
    throughput: Vec3,
    continuation: Option<(u32, Ray)>,
}

impl Launch<ShadeHitArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &ShadeHitArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::ShadeHit;
        self.record(kernel, work_items);

        let triangles = args.triangles.as_ref().ok_or_else(|| unbound(kernel, "triangles"))?;
        let materials = args.materials.as_ref().ok_or_else(|| unbound(kernel, "materials"))?;
        let active = work_items.min(args.incoming_ray_counter.load()) as usize;
        let sample_count = args.sample_counter.load();
        let outgoing = &args.outgoing_ray_counter;
        let triangles_label = triangles.label();
        let materials_label = materials.label();

        let outcomes: RenderResult<Vec<HitOutcome>> = {
            let rays = args.incoming_rays.read_for(kernel)?;
            let pixels = args.incoming_pixel_indices.read_for(kernel)?;
            let hits = args.hits.read_for(kernel)?;
            let triangles = triangles.read_for(kernel)?;
            let materials = materials.read_for(kernel)?;
            let throughputs = args.throughputs.read_for(kernel)?;
            ensure_len(kernel, args.incoming_rays.label(), &rays, active)?;
            ensure_len(kernel, args.incoming_pixel_indices.label(), &pixels, active)?;
            ensure_len(kernel, args.hits.label(), &hits, active)?;

            (0..active)
                .into_par_iter()
                .filter(|&slot| !hits[slot].is_miss())
                .map(|slot| -> RenderResult<HitOutcome> {
                    let hit = &hits[slot];
                    let triangle =
                        element(kernel, triangles_label, &triangles, hit.primitive as usize)?;
                    let material =
                        element(kernel, materials_label, &materials, triangle.material as usize)?;
                    let pixel = pixels[slot];
                    let current =
                        element(kernel, args.throughputs.label(), &throughputs, pixel as usize)?;
                    let mut rng = SampleRng::new(path_seed(
                        pixel,
                        sample_count,
                        args.frame_seed,
                        args.bounce,
                    ));
                    let response = shade_surface(
                        &rays[slot],
                        hit,
                        triangle,
                        material,
                        Vec3::new(current[0], current[1], current[2]),
                        &mut rng,
                    );
                    let continuation = response.continuation.map(|ray| (outgoing.reserve(), ray));
                    Ok(HitOutcome {
                        pixel,
                        emitted: response.emitted,
                        throughput: response.throughput,
                        continuation,
                    })
                })
                .collect()
        };
        let outcomes = outcomes?;

        let mut out_rays = args.outgoing_rays.write_for(kernel)?;
        let mut out_pixels = args.outgoing_pixel_indices.write_for(kernel)?;
        let mut throughputs = args.throughputs.write_for(kernel)?;
        let mut radiance = args.radiance.write_for(kernel)?;

        for outcome in outcomes {
            let pixel = outcome.pixel as usize;
            if pixel >= radiance.len() || pixel >= throughputs.len() {
                return Err(too_small(kernel, args.radiance.label(), pixel + 1, radiance.len()));
            }
            let texel = &mut radiance[pixel];
            texel[0] += outcome.emitted.x;
            texel[1] += outcome.emitted.y;
            texel[2] += outcome.emitted.z;
            throughputs[pixel] = [outcome.throughput.x, outcome.throughput.y, outcome.throughput.z, 0.0];

            if let Some((slot, ray)) = outcome.continuation {
                let slot = slot as usize;
                if slot >= out_rays.len() || slot >= out_pixels.len() {
                    return Err(too_small(kernel, args.outgoing_rays.label(), slot + 1, out_rays.len()));
                }
                out_rays[slot] = ray;
                out_pixels[slot] = outcome.pixel;
            }
        }
        Ok(())
    }
}

impl Launch<ResolveArgs<HostContext>> for HostContext {
    fn launch(&mut self, args: &ResolveArgs<HostContext>, work_items: u32) -> RenderResult<()> {
        let kernel = Kernel::Resolve;
        self.record(kernel, work_items);

        if !args.surface.is_acquired() {
            return Err(RenderError::foreign("resolve target surface is not acquired"));
        }
        let count = work_items.min(args.width * args.height) as usize;
        let sample_count = args.sample_counter.load();
        let radiance = args.radiance.read_for(kernel)?;
        let mut texels = args
            .surface
            .texels
            .try_write()
            .ok_or_else(|| RenderError::foreign("resolve target surface is busy"))?;
        ensure_len(kernel, args.radiance.label(), &radiance, count)?;
        ensure_len(kernel, "surface", &texels, count)?;

        texels[..count]
            .par_iter_mut()
            .zip(radiance[..count].par_iter())
            .for_each(|(texel, accumulated)| *texel = resolve_pixel(*accumulated, sample_count));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Stage;
    use std::collections::HashSet;

    #[test]
    fn concurrent_appends_after_clear_are_race_free() {
        let counter = HostCounter::default();
        counter.store(77);
        counter.clear();

        let appends = 10_000;
        let slots: Vec<u32> = (0..appends).into_par_iter().map(|_| counter.reserve()).collect();

        assert_eq!(counter.load(), appends);
        let distinct: HashSet<u32> = slots.iter().copied().collect();
        assert_eq!(distinct.len(), appends as usize);
        assert!(slots.iter().all(|&slot| slot < appends));
    }

    #[test]
    fn clear_counter_stage_rebinds_target() {
        let mut ctx = HostContext::with_trace();
        let first = ctx.create_counter("first").expect("alloc");
        let second = ctx.create_counter("second").expect("alloc");
        first.store(5);
        second.store(9);

        let mut stage = Stage::new(ClearCounterArgs::<HostContext> {
            counter: first.clone(),
        });
        ctx.dispatch(&stage, 1).expect("clear");
        stage.bind().counter = second.clone();
        ctx.dispatch(&stage, 1).expect("clear");

        assert_eq!(first.load(), 0);
        assert_eq!(second.load(), 0);
        assert_eq!(ctx.trace().len(), 2);
    }

    #[test]
    fn zero_work_items_skip_the_launch() {
        let mut ctx = HostContext::with_trace();
        let counter = ctx.create_counter("counter").expect("alloc");
        let stage = Stage::new(IncrementCounterArgs::<HostContext> {
            counter: counter.clone(),
        });
        ctx.dispatch(&stage, 0).expect("noop");
        assert_eq!(counter.load(), 0);
        assert!(ctx.trace().is_empty());
    }

    #[test]
    fn aliased_output_is_a_contract_error() {
        let mut ctx = HostContext::new();
        let rays = ctx.create_buffer::<Ray>("rays", 4).expect("alloc");
        let counter = ctx.create_counter("counter").expect("alloc");
        counter.store(4);
        let triangles = ctx.create_buffer("tris", 1).expect("alloc");
        let hits = ctx.create_buffer("hits", 4).expect("alloc");
        let radiance = ctx.create_buffer::<[f32; 4]>("radiance", 4).expect("alloc");

        let stage = Stage::new(ShadeHitArgs::<HostContext> {
            incoming_rays: rays.clone(),
            incoming_ray_counter: counter.clone(),
            incoming_pixel_indices: ctx.create_buffer("pixels", 4).expect("alloc"),
            hits,
            triangles: Some(triangles),
            materials: Some(ctx.create_buffer("materials", 1).expect("alloc")),
            bounce: 0,
            frame_seed: 0,
            sample_counter: ctx.create_counter("samples").expect("alloc"),
            throughputs: radiance.clone(),
            outgoing_rays: rays,
            outgoing_ray_counter: counter,
            outgoing_pixel_indices: ctx.create_buffer("pixels-out", 4).expect("alloc"),
            radiance,
        });
        let error = ctx.dispatch(&stage, 4).expect_err("aliasing must fail");
        assert!(matches!(error, RenderError::Contract(_)));
    }

    #[test]
    fn out_of_range_material_is_a_contract_error() {
        let mut ctx = HostContext::new();
        let counter = ctx.create_counter("incoming").expect("alloc");
        counter.store(1);
        let triangle = crate::kernels::Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, 5);

        // A zeroed hit points at triangle 0, whose material does not exist.
        let stage = Stage::new(ShadeHitArgs::<HostContext> {
            incoming_rays: ctx.create_buffer("rays", 1).expect("alloc"),
            incoming_ray_counter: counter,
            incoming_pixel_indices: ctx.create_buffer("pixels", 1).expect("alloc"),
            hits: ctx.create_buffer("hits", 1).expect("alloc"),
            triangles: Some(ctx.upload_buffer("tris", &[triangle]).expect("alloc")),
            materials: Some(ctx.create_buffer("materials", 1).expect("alloc")),
            bounce: 0,
            frame_seed: 0,
            sample_counter: ctx.create_counter("samples").expect("alloc"),
            throughputs: ctx.create_buffer("throughputs", 1).expect("alloc"),
            outgoing_rays: ctx.create_buffer("rays-out", 1).expect("alloc"),
            outgoing_ray_counter: ctx.create_counter("outgoing").expect("alloc"),
            outgoing_pixel_indices: ctx.create_buffer("pixels-out", 1).expect("alloc"),
            radiance: ctx.create_buffer("radiance", 1).expect("alloc"),
        });

        let error = ctx.dispatch(&stage, 1).expect_err("material 5 is unbound");
        assert!(matches!(error, RenderError::Contract(_)));
    }

    #[test]
    fn release_requires_drain() {
        let mut ctx = HostContext::new();
        let surface = ctx.create_surface("surface", 2, 2).expect("alloc");
        let counter = ctx.create_counter("counter").expect("alloc");
        let stage = Stage::new(IncrementCounterArgs::<HostContext> { counter });

        ctx.acquire_foreign(&surface).expect("acquire");
        assert!(ctx.acquire_foreign(&surface).is_err());
        ctx.dispatch(&stage, 1).expect("increment");
        assert!(ctx.release_foreign(&surface).is_err());
        ctx.drain().expect("drain");
        ctx.release_foreign(&surface).expect("release");
        assert!(!surface.is_acquired());
    }

    #[test]
    fn resolve_into_unacquired_surface_fails() {
        let mut ctx = HostContext::new();
        let stage = Stage::new(ResolveArgs::<HostContext> {
            width: 2,
            height: 2,
            radiance: ctx.create_buffer("radiance", 4).expect("alloc"),
            sample_counter: ctx.create_counter("samples").expect("alloc"),
            surface: ctx.create_surface("surface", 2, 2).expect("alloc"),
        });
        let error = ctx.dispatch(&stage, 4).expect_err("must fail");
        assert!(matches!(error, RenderError::ForeignResource(_)));
    }

    #[test]
    fn empty_surface_is_an_allocation_error() {
        let mut ctx = HostContext::new();
        assert!(ctx.create_surface("surface", 0, 4).is_err());
    }
}
