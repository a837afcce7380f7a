//! Ray/scene intersection behind a small trait, so the integrator does not
//! care how the nearest hit is found.

use crate::device::{ExecutionContext, Launch};
use crate::error::RenderResult;
use crate::integrator::SceneData;
use crate::kernels::{Hit, IntersectArgs, Ray, Stage, Triangle};

pub trait AccelerationStructure<C: ExecutionContext> {
    /// Writes one [`Hit`] per active slot of `rays`. `ray_counter` holds the
    /// number of active slots; `max_rays` is the buffer capacity.
    fn intersect_rays(
        &self,
        ctx: &mut C,
        rays: &C::Buffer<Ray>,
        ray_counter: &C::Counter,
        max_rays: u32,
        hits: &C::Buffer<Hit>,
    ) -> RenderResult<()>;
}

/// Brute-force nearest hit over every scene triangle.
pub struct TriangleList<C: ExecutionContext> {
    triangles: C::Buffer<Triangle>,
    triangle_count: u32,
}

impl<C: ExecutionContext> TriangleList<C> {
    pub fn new(scene: &SceneData<C>) -> Self {
        Self {
            triangles: scene.triangles.clone(),
            triangle_count: scene.triangle_count,
        }
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangle_count
    }
}

impl<C> AccelerationStructure<C> for TriangleList<C>
where
    C: Launch<IntersectArgs<C>>,
{
    fn intersect_rays(
        &self,
        ctx: &mut C,
        rays: &C::Buffer<Ray>,
        ray_counter: &C::Counter,
        max_rays: u32,
        hits: &C::Buffer<Hit>,
    ) -> RenderResult<()> {
        let stage = Stage::new(IntersectArgs::<C> {
            rays: rays.clone(),
            ray_counter: ray_counter.clone(),
            triangles: self.triangles.clone(),
            triangle_count: self.triangle_count,
            hits: hits.clone(),
        });
        ctx.dispatch(&stage, max_rays)
    }
}
