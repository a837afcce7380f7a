use crate::device::ExecutionContext;
use crate::error::ResourceAllocationError;
use crate::kernels::{Hit, Ray};

/// Index of the ray buffer set a bounce reads from.
pub fn parity(bounce: u32) -> usize {
    (bounce & 1) as usize
}

/// Rays, their destination pixels and the count of occupied slots.
pub struct RayBufferSet<C: ExecutionContext> {
    pub rays: C::Buffer<Ray>,
    pub pixel_indices: C::Buffer<u32>,
    pub counter: C::Counter,
}

impl<C: ExecutionContext> Clone for RayBufferSet<C> {
    fn clone(&self) -> Self {
        Self {
            rays: self.rays.clone(),
            pixel_indices: self.pixel_indices.clone(),
            counter: self.counter.clone(),
        }
    }
}

impl<C: ExecutionContext> RayBufferSet<C> {
    fn new(ctx: &mut C, index: usize, capacity: u32) -> Result<Self, ResourceAllocationError> {
        Ok(Self {
            rays: ctx.create_buffer(&format!("ray-buffer-{index}"), capacity as usize)?,
            pixel_indices: ctx.create_buffer(&format!("pixel-indices-{index}"), capacity as usize)?,
            counter: ctx.create_counter(&format!("ray-counter-{index}"))?,
        })
    }
}

/// Ping-pong ray storage plus the per-slot hit records and per-pixel path
/// throughput shared by both sets.
///
/// Each set holds one slot per pixel: a path spawns at most one continuation
/// per bounce, so neither set can overflow.
pub struct PathBuffers<C: ExecutionContext> {
    sets: [RayBufferSet<C>; 2],
    pub hits: C::Buffer<Hit>,
    pub throughputs: C::Buffer<[f32; 4]>,
    capacity: u32,
}

impl<C: ExecutionContext> PathBuffers<C> {
    pub fn new(ctx: &mut C, capacity: u32) -> Result<Self, ResourceAllocationError> {
        let sets = [
            RayBufferSet::new(ctx, 0, capacity)?,
            RayBufferSet::new(ctx, 1, capacity)?,
        ];
        Ok(Self {
            sets,
            hits: ctx.create_buffer("hits", capacity as usize)?,
            throughputs: ctx.create_buffer("throughputs", capacity as usize)?,
            capacity,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn set(&self, index: usize) -> &RayBufferSet<C> {
        &self.sets[index & 1]
    }

    /// Read-only for the duration of `bounce`.
    pub fn incoming(&self, bounce: u32) -> &RayBufferSet<C> {
        &self.sets[parity(bounce)]
    }

    /// Append target of hit shading during `bounce`.
    pub fn outgoing(&self, bounce: u32) -> &RayBufferSet<C> {
        &self.sets[parity(bounce + 1)]
    }
}
