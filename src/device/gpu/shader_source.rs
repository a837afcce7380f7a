use crate::kernels::Kernel;

pub(super) const WORKGROUP_SIZE: u32 = 64;

/// Full WGSL module for one kernel: the shared prelude followed by the
/// kernel body, with build-time constants substituted.
pub(super) fn build_kernel_wgsl(kernel: Kernel) -> String {
    let body = match kernel {
        Kernel::ResetRadiance => RESET_RADIANCE_WGSL,
        Kernel::ClearCounter => CLEAR_COUNTER_WGSL,
        Kernel::IncrementCounter => INCREMENT_COUNTER_WGSL,
        Kernel::RayGeneration => RAYGEN_WGSL,
        Kernel::Intersect => INTERSECT_WGSL,
        Kernel::ShadeMiss => MISS_WGSL,
        Kernel::ShadeHit => HIT_WGSL,
        Kernel::Resolve => RESOLVE_WGSL,
    };
    format!("{COMMON_WGSL_TEMPLATE}\n{body}")
        .replace("__WORKGROUP_SIZE__", &format!("{WORKGROUP_SIZE}u"))
}

const COMMON_WGSL_TEMPLATE: &str = include_str!("shaders/common.wgsl");
const RESET_RADIANCE_WGSL: &str = include_str!("shaders/reset_radiance.wgsl");
const CLEAR_COUNTER_WGSL: &str = include_str!("shaders/clear_counter.wgsl");
const INCREMENT_COUNTER_WGSL: &str = include_str!("shaders/increment_counter.wgsl");
const RAYGEN_WGSL: &str = include_str!("shaders/raygen.wgsl");
const INTERSECT_WGSL: &str = include_str!("shaders/intersect.wgsl");
const MISS_WGSL: &str = include_str!("shaders/miss.wgsl");
const HIT_WGSL: &str = include_str!("shaders/hit.wgsl");
const RESOLVE_WGSL: &str = include_str!("shaders/resolve.wgsl");
