pub mod shading;
pub mod stage;
pub mod types;

pub use stage::{
    ClearCounterArgs, IncrementCounterArgs, IntersectArgs, Kernel, RaygenArgs, ResetRadianceArgs,
    ResolveArgs, ShadeHitArgs, ShadeMissArgs, Stage, StageArgs,
};
pub use types::{CameraData, Hit, MaterialRecord, Ray, Triangle};
