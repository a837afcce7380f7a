use crate::domain::Scene;
use crate::error::{RenderError, RenderResult};

/// Checks material references and physical plausibility. Unused materials
/// are allowed but reported.
pub fn validate_scene(scene: &Scene) -> RenderResult<()> {
    let mut material_usage = vec![0usize; scene.materials.len()];
    for object in &scene.objects {
        if scene.material(object.material_id).is_none() {
            return Err(RenderError::scene(format!(
                "object '{}' references missing material id {}",
                object.name, object.material_id.0
            )));
        }
        material_usage[object.material_id.0] += 1;

        object.validate_physical().map_err(|error| {
            RenderError::scene(format!("object '{}': {error}", object.name))
        })?;
    }

    for (material, usage) in scene.materials.iter().zip(&material_usage) {
        material.validate_physical().map_err(|error| {
            RenderError::scene(format!("material '{}': {error}", material.name))
        })?;
        if *usage == 0 {
            log::warn!(
                "scene '{}': material '{}' is not used by any object",
                scene.id,
                material.name
            );
        }
    }

    scene
        .environment
        .validate_physical()
        .map_err(|error| RenderError::scene(format!("scene '{}' environment: {error}", scene.id)))
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::domain::presets::{build_scene, SCENE_IDS};
    use crate::domain::{Environment, Material, MaterialId, Object, ObjectKind};

    fn single_quad(material_id: usize, material: Material) -> Scene {
        Scene {
            id: "test",
            objects: vec![Object {
                name: "floor",
                kind: ObjectKind::Quad {
                    corner: Vec3::ZERO,
                    edge_u: Vec3::X,
                    edge_v: Vec3::Z,
                },
                material_id: MaterialId(material_id),
            }],
            materials: vec![material],
            environment: Environment::Constant { color: Vec3::ONE },
        }
    }

    #[test]
    fn accepts_presets() {
        for id in SCENE_IDS {
            validate_scene(&build_scene(id).expect("preset")).expect("valid");
        }
    }

    #[test]
    fn rejects_dangling_material_reference() {
        let scene = single_quad(3, Material::diffuse("grey", Vec3::splat(0.5)));
        assert!(matches!(validate_scene(&scene), Err(RenderError::Scene(_))));
    }

    #[test]
    fn rejects_non_finite_albedo() {
        let scene = single_quad(0, Material::diffuse("broken", Vec3::new(0.5, f32::NAN, 0.5)));
        assert!(validate_scene(&scene).is_err());
    }

    #[test]
    fn rejects_negative_environment() {
        let mut scene = single_quad(0, Material::diffuse("grey", Vec3::splat(0.5)));
        scene.environment = Environment::Constant {
            color: Vec3::new(0.0, -1.0, 0.0),
        };
        assert!(validate_scene(&scene).is_err());
    }
}
