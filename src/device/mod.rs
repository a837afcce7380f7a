//! Execution contexts: where stages run and where their buffers live.
//!
//! The integrator only ever talks to an [`ExecutionContext`]: it allocates
//! typed buffer handles, atomic counters and a display surface through it,
//! and issues stage dispatches in a fixed order. A context must make every
//! write of a dispatch visible to every later dispatch; the integrator never
//! waits between stages.

pub mod host;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use host::{DispatchRecord, HostBuffer, HostContext, HostCounter, HostSurface};

#[cfg(feature = "gpu")]
pub use gpu::GpuContext;

use crate::error::{RenderResult, ResourceAllocationError};
use crate::kernels::{
    ClearCounterArgs, IncrementCounterArgs, IntersectArgs, RaygenArgs, ResetRadianceArgs,
    ResolveArgs, ShadeHitArgs, ShadeMissArgs, Stage, StageArgs,
};

/// Plain-old-data element that may live in a device buffer.
pub trait Element: bytemuck::Pod + Send + Sync {}

impl<T: bytemuck::Pod + Send + Sync> Element for T {}

pub trait ExecutionContext: Sized {
    type Buffer<T: Element>: Clone;
    /// Single atomically updated `u32`.
    type Counter: Clone;
    /// Display surface owned outside the integrator's pipeline.
    type Surface: Clone;

    fn backend_name(&self) -> &'static str;

    fn create_buffer<T: Element>(
        &mut self,
        label: &str,
        len: usize,
    ) -> Result<Self::Buffer<T>, ResourceAllocationError>;

    fn upload_buffer<T: Element>(
        &mut self,
        label: &str,
        data: &[T],
    ) -> Result<Self::Buffer<T>, ResourceAllocationError>;

    fn create_counter(&mut self, label: &str) -> Result<Self::Counter, ResourceAllocationError>;

    fn create_surface(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, ResourceAllocationError>;

    fn acquire_foreign(&mut self, surface: &Self::Surface) -> RenderResult<()>;

    fn release_foreign(&mut self, surface: &Self::Surface) -> RenderResult<()>;

    /// Blocks until every dispatch issued so far has completed.
    fn drain(&mut self) -> RenderResult<()>;

    // Blocking readbacks, for diagnostics and presentation only.

    fn read_counter(&mut self, counter: &Self::Counter) -> RenderResult<u32>;

    fn read_buffer<T: Element>(&mut self, buffer: &Self::Buffer<T>) -> RenderResult<Vec<T>>;

    fn read_surface(&mut self, surface: &Self::Surface) -> RenderResult<Vec<[f32; 4]>>;

    /// Runs `work_items` invocations of `stage` with its current bindings.
    fn dispatch<A: StageArgs>(&mut self, stage: &Stage<A>, work_items: u32) -> RenderResult<()>
    where
        Self: Launch<A>,
    {
        if work_items == 0 {
            return Ok(());
        }
        log::trace!(
            "[{}] dispatch {} x{}",
            self.backend_name(),
            A::KERNEL.as_str(),
            work_items
        );
        self.launch(stage.args(), work_items)
    }
}

/// Backend implementation of one kernel.
pub trait Launch<A>: ExecutionContext {
    fn launch(&mut self, args: &A, work_items: u32) -> RenderResult<()>;
}

/// A context able to run every stage of the wavefront pipeline.
pub trait WavefrontDevice:
    ExecutionContext
    + Launch<ResetRadianceArgs<Self>>
    + Launch<ClearCounterArgs<Self>>
    + Launch<IncrementCounterArgs<Self>>
    + Launch<RaygenArgs<Self>>
    + Launch<IntersectArgs<Self>>
    + Launch<ShadeMissArgs<Self>>
    + Launch<ShadeHitArgs<Self>>
    + Launch<ResolveArgs<Self>>
{
}

impl<C> WavefrontDevice for C where
    C: ExecutionContext
        + Launch<ResetRadianceArgs<C>>
        + Launch<ClearCounterArgs<C>>
        + Launch<IncrementCounterArgs<C>>
        + Launch<RaygenArgs<C>>
        + Launch<IntersectArgs<C>>
        + Launch<ShadeMissArgs<C>>
        + Launch<ShadeHitArgs<C>>
        + Launch<ResolveArgs<C>>
{
}
