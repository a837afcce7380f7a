use super::types::{CameraData, Hit, MaterialRecord, Ray, Triangle};
use crate::device::ExecutionContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    ResetRadiance,
    ClearCounter,
    IncrementCounter,
    RayGeneration,
    Intersect,
    ShadeMiss,
    ShadeHit,
    Resolve,
}

impl Kernel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResetRadiance => "reset_radiance",
            Self::ClearCounter => "clear_counter",
            Self::IncrementCounter => "increment_counter",
            Self::RayGeneration => "ray_generation",
            Self::Intersect => "intersect",
            Self::ShadeMiss => "shade_miss",
            Self::ShadeHit => "shade_hit",
            Self::Resolve => "resolve",
        }
    }
}

/// A named-field argument set for one kernel.
pub trait StageArgs {
    const KERNEL: Kernel;
}

/// A kernel together with its current argument bindings. Built once with a
/// complete argument set; later invocations rebind only the fields that
/// change through [`Stage::bind`].
pub struct Stage<A> {
    args: A,
}

impl<A: StageArgs> Stage<A> {
    pub fn new(args: A) -> Self {
        Self { args }
    }

    pub fn kernel(&self) -> Kernel {
        A::KERNEL
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    pub fn bind(&mut self) -> &mut A {
        &mut self.args
    }
}

pub struct ResetRadianceArgs<C: ExecutionContext> {
    pub pixel_count: u32,
    pub radiance: C::Buffer<[f32; 4]>,
}

impl<C: ExecutionContext> StageArgs for ResetRadianceArgs<C> {
    const KERNEL: Kernel = Kernel::ResetRadiance;
}

pub struct ClearCounterArgs<C: ExecutionContext> {
    pub counter: C::Counter,
}

impl<C: ExecutionContext> StageArgs for ClearCounterArgs<C> {
    const KERNEL: Kernel = Kernel::ClearCounter;
}

pub struct IncrementCounterArgs<C: ExecutionContext> {
    pub counter: C::Counter,
}

impl<C: ExecutionContext> StageArgs for IncrementCounterArgs<C> {
    const KERNEL: Kernel = Kernel::IncrementCounter;
}

pub struct RaygenArgs<C: ExecutionContext> {
    pub width: u32,
    pub height: u32,
    pub camera: CameraData,
    pub frame_seed: u32,
    pub sample_counter: C::Counter,
    // Output
    pub rays: C::Buffer<Ray>,
    pub ray_counter: C::Counter,
    pub pixel_indices: C::Buffer<u32>,
    pub throughputs: C::Buffer<[f32; 4]>,
}

impl<C: ExecutionContext> StageArgs for RaygenArgs<C> {
    const KERNEL: Kernel = Kernel::RayGeneration;
}

pub struct IntersectArgs<C: ExecutionContext> {
    pub rays: C::Buffer<Ray>,
    pub ray_counter: C::Counter,
    pub triangles: C::Buffer<Triangle>,
    pub triangle_count: u32,
    // Output
    pub hits: C::Buffer<Hit>,
}

impl<C: ExecutionContext> StageArgs for IntersectArgs<C> {
    const KERNEL: Kernel = Kernel::Intersect;
}

pub struct ShadeMissArgs<C: ExecutionContext> {
    pub rays: C::Buffer<Ray>,
    pub ray_counter: C::Counter,
    pub pixel_indices: C::Buffer<u32>,
    pub hits: C::Buffer<Hit>,
    pub throughputs: C::Buffer<[f32; 4]>,
    pub environment: Option<C::Buffer<[f32; 4]>>,
    pub environment_size: [u32; 2],
    // Output
    pub radiance: C::Buffer<[f32; 4]>,
}

impl<C: ExecutionContext> StageArgs for ShadeMissArgs<C> {
    const KERNEL: Kernel = Kernel::ShadeMiss;
}

pub struct ShadeHitArgs<C: ExecutionContext> {
    pub incoming_rays: C::Buffer<Ray>,
    pub incoming_ray_counter: C::Counter,
    pub incoming_pixel_indices: C::Buffer<u32>,
    pub hits: C::Buffer<Hit>,
    pub triangles: Option<C::Buffer<Triangle>>,
    pub materials: Option<C::Buffer<MaterialRecord>>,
    pub bounce: u32,
    pub frame_seed: u32,
    pub sample_counter: C::Counter,
    // Output
    pub throughputs: C::Buffer<[f32; 4]>,
    pub outgoing_rays: C::Buffer<Ray>,
    pub outgoing_ray_counter: C::Counter,
    pub outgoing_pixel_indices: C::Buffer<u32>,
    pub radiance: C::Buffer<[f32; 4]>,
}

impl<C: ExecutionContext> StageArgs for ShadeHitArgs<C> {
    const KERNEL: Kernel = Kernel::ShadeHit;
}

pub struct ResolveArgs<C: ExecutionContext> {
    pub width: u32,
    pub height: u32,
    pub radiance: C::Buffer<[f32; 4]>,
    pub sample_counter: C::Counter,
    // Output
    pub surface: C::Surface,
}

impl<C: ExecutionContext> StageArgs for ResolveArgs<C> {
    const KERNEL: Kernel = Kernel::Resolve;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostContext;

    #[test]
    fn rebinding_one_field_leaves_others_untouched() {
        let mut ctx = HostContext::new();
        let first = ctx.create_buffer::<Ray>("rays-a", 4).expect("alloc");
        let second = ctx.create_buffer::<Ray>("rays-b", 4).expect("alloc");
        let counter = ctx.create_counter("counter").expect("alloc");
        let triangles = ctx.create_buffer::<Triangle>("tris", 1).expect("alloc");
        let hits = ctx.create_buffer::<Hit>("hits", 4).expect("alloc");

        let mut stage = Stage::new(IntersectArgs::<HostContext> {
            rays: first.clone(),
            ray_counter: counter.clone(),
            triangles: triangles.clone(),
            triangle_count: 1,
            hits: hits.clone(),
        });
        stage.bind().rays = second.clone();

        assert_eq!(stage.kernel(), Kernel::Intersect);
        assert!(stage.args().rays.ptr_eq(&second));
        assert!(stage.args().ray_counter.ptr_eq(&counter));
        assert!(stage.args().triangles.ptr_eq(&triangles));
        assert!(stage.args().hits.ptr_eq(&hits));
        assert_eq!(stage.args().triangle_count, 1);
    }
}
