pub mod renderer;
pub mod scene_compile;
pub mod settings;
pub mod tonemap;
pub mod validation;
pub mod view;

pub use renderer::Renderer;
pub use scene_compile::{compile_scene, CompiledScene};
pub use settings::RenderSettings;
pub use tonemap::{filmic_tone_map, surface_to_image, to_rgb};
pub use validation::validate_scene;
pub use view::View;
