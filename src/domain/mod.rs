pub mod environment;
pub mod material;
pub mod object;
pub mod presets;
pub mod scene;
mod validate;

pub use environment::Environment;
pub use material::{Material, MaterialClass, MaterialId};
pub use object::{Object, ObjectKind};
pub use scene::Scene;
