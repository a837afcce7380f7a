use glam::Vec3;

use crate::domain::{Environment, Material, MaterialId, Object, ObjectKind, Scene};

pub const SCENE_ID: &str = "cornell_box";

/// Closed box lit only by a ceiling panel; the camera looks in through the
/// open front at `z = 1`.
pub fn build() -> Scene {
    let white = MaterialId(0);
    let red = MaterialId(1);
    let green = MaterialId(2);
    let lamp = MaterialId(3);

    let wall = |name, corner, edge_u, edge_v, material_id| Object {
        name,
        kind: ObjectKind::Quad {
            corner,
            edge_u,
            edge_v,
        },
        material_id,
    };

    Scene {
        id: SCENE_ID,
        materials: vec![
            Material::diffuse("white_wall", Vec3::new(0.73, 0.73, 0.73)),
            Material::diffuse("red_wall", Vec3::new(0.65, 0.05, 0.05)),
            Material::diffuse("green_wall", Vec3::new(0.12, 0.45, 0.15)),
            Material::emissive("ceiling_lamp", Vec3::new(15.0, 15.0, 15.0)),
        ],
        objects: vec![
            wall("floor", Vec3::new(-1.0, -1.0, 1.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -2.0), white),
            wall("ceiling", Vec3::new(-1.0, 1.0, -1.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0), white),
            wall("back_wall", Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0), white),
            wall("left_wall", Vec3::new(-1.0, -1.0, 1.0), Vec3::new(0.0, 0.0, -2.0), Vec3::new(0.0, 2.0, 0.0), red),
            wall("right_wall", Vec3::new(1.0, -1.0, -1.0), Vec3::new(0.0, 0.0, 2.0), Vec3::new(0.0, 2.0, 0.0), green),
            wall("lamp", Vec3::new(-0.25, 0.999, -0.25), Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.5), lamp),
            Object {
                name: "tall_block",
                kind: ObjectKind::Cuboid {
                    center: Vec3::new(-0.35, -0.4, -0.3),
                    half_extents: Vec3::new(0.28, 0.6, 0.28),
                },
                material_id: white,
            },
            Object {
                name: "short_block",
                kind: ObjectKind::Cuboid {
                    center: Vec3::new(0.38, -0.7, 0.25),
                    half_extents: Vec3::new(0.28, 0.3, 0.28),
                },
                material_id: white,
            },
        ],
        environment: Environment::Constant { color: Vec3::ZERO },
    }
}
