use crate::device::{ExecutionContext, WavefrontDevice};
use crate::error::{RenderResult, ResourceAllocationError};
use crate::kernels::{ClearCounterArgs, IncrementCounterArgs, ResetRadianceArgs, Stage};

/// Per-pixel radiance sums and the number of frames they hold. Survives
/// across frames until [`AccumulationState::reset`].
pub struct AccumulationState<C: ExecutionContext> {
    radiance: C::Buffer<[f32; 4]>,
    sample_counter: C::Counter,
    clear_samples: Stage<ClearCounterArgs<C>>,
    reset_radiance: Stage<ResetRadianceArgs<C>>,
    advance: Stage<IncrementCounterArgs<C>>,
    pixel_count: u32,
}

impl<C: WavefrontDevice> AccumulationState<C> {
    pub fn new(ctx: &mut C, pixel_count: u32) -> Result<Self, ResourceAllocationError> {
        let radiance = ctx.create_buffer("radiance", pixel_count as usize)?;
        let sample_counter = ctx.create_counter("sample-counter")?;

        Ok(Self {
            clear_samples: Stage::new(ClearCounterArgs {
                counter: sample_counter.clone(),
            }),
            reset_radiance: Stage::new(ResetRadianceArgs {
                pixel_count,
                radiance: radiance.clone(),
            }),
            advance: Stage::new(IncrementCounterArgs {
                counter: sample_counter.clone(),
            }),
            radiance,
            sample_counter,
            pixel_count,
        })
    }

    pub fn reset(&self, ctx: &mut C) -> RenderResult<()> {
        ctx.dispatch(&self.clear_samples, 1)?;
        ctx.dispatch(&self.reset_radiance, self.pixel_count)
    }

    /// One increment per completed frame, issued after all of the frame's
    /// radiance writes.
    pub fn advance_sample_count(&self, ctx: &mut C) -> RenderResult<()> {
        ctx.dispatch(&self.advance, 1)
    }

    pub fn sample_count(&self, ctx: &mut C) -> RenderResult<u32> {
        ctx.read_counter(&self.sample_counter)
    }

    pub fn radiance(&self) -> &C::Buffer<[f32; 4]> {
        &self.radiance
    }

    pub fn sample_counter(&self) -> &C::Counter {
        &self.sample_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostContext;

    #[test]
    fn reset_clears_sums_and_count() {
        let mut ctx = HostContext::new();
        let accumulation = AccumulationState::new(&mut ctx, 4).expect("alloc");
        accumulation.advance_sample_count(&mut ctx).expect("advance");
        accumulation.advance_sample_count(&mut ctx).expect("advance");
        accumulation
            .radiance()
            .write(0, &[[1.0, 2.0, 3.0, 0.0]; 4])
            .expect("write");
        assert_eq!(accumulation.sample_count(&mut ctx).expect("read"), 2);

        accumulation.reset(&mut ctx).expect("reset");
        assert_eq!(accumulation.sample_count(&mut ctx).expect("read"), 0);
        let sums = ctx.read_buffer(accumulation.radiance()).expect("read");
        assert!(sums.iter().all(|texel| *texel == [0.0; 4]));
    }
}
