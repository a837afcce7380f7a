use crate::device::ExecutionContext;
use crate::error::{RenderError, RenderResult};
use crate::kernels::{MaterialRecord, Triangle};
use crate::render::CompiledScene;

/// Scene buffers bound into the miss and hit shading stages. The integrator
/// reads them and never writes them.
pub struct SceneData<C: ExecutionContext> {
    pub id: String,
    pub triangles: C::Buffer<Triangle>,
    pub triangle_count: u32,
    pub materials: C::Buffer<MaterialRecord>,
    pub material_count: u32,
    pub environment: C::Buffer<[f32; 4]>,
    pub environment_size: [u32; 2],
}

impl<C: ExecutionContext> SceneData<C> {
    pub fn upload(ctx: &mut C, scene: &CompiledScene) -> RenderResult<Self> {
        let [env_width, env_height] = scene.environment_size;
        if env_width == 0
            || env_height == 0
            || scene.environment.len() != env_width as usize * env_height as usize
        {
            return Err(RenderError::scene(format!(
                "scene '{}' environment holds {} texels but declares {env_width}x{env_height}",
                scene.id,
                scene.environment.len()
            )));
        }

        // Bindings must not be empty, so an empty list uploads one unused
        // zeroed element.
        let triangles = if scene.triangles.is_empty() {
            ctx.create_buffer("scene-triangles", 1)?
        } else {
            ctx.upload_buffer("scene-triangles", &scene.triangles)?
        };
        let materials = if scene.materials.is_empty() {
            ctx.create_buffer("scene-materials", 1)?
        } else {
            ctx.upload_buffer("scene-materials", &scene.materials)?
        };
        let environment = ctx.upload_buffer("scene-environment", &scene.environment)?;

        log::debug!(
            "uploaded scene '{}': {} triangles, {} materials, {}x{} environment",
            scene.id,
            scene.triangles.len(),
            scene.materials.len(),
            env_width,
            env_height
        );

        Ok(Self {
            id: scene.id.clone(),
            triangles,
            triangle_count: scene.triangles.len() as u32,
            materials,
            material_count: scene.materials.len() as u32,
            environment,
            environment_size: scene.environment_size,
        })
    }
}
