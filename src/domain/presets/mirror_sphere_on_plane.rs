use glam::Vec3;

use crate::domain::{Environment, Material, MaterialId, Object, ObjectKind, Scene};

pub const SCENE_ID: &str = "mirror_sphere_on_plane";

pub fn build() -> Scene {
    let floor_y = -1.05;
    let sphere_radius = 0.9;
    let floor_half_size = 40.0;

    let floor_material = MaterialId(0);
    let mirror_material = MaterialId(1);
    let block_material = MaterialId(2);

    Scene {
        id: SCENE_ID,
        materials: vec![
            Material::diffuse("floor_matte", Vec3::new(0.94, 0.94, 0.93)),
            Material::mirror("mirror_sphere", Vec3::new(0.95, 0.95, 0.95)),
            Material::diffuse("block_red", Vec3::new(0.9, 0.09, 0.08)),
        ],
        objects: vec![
            Object {
                name: "floor",
                kind: ObjectKind::Quad {
                    corner: Vec3::new(-floor_half_size, floor_y, floor_half_size),
                    edge_u: Vec3::new(2.0 * floor_half_size, 0.0, 0.0),
                    edge_v: Vec3::new(0.0, 0.0, -2.0 * floor_half_size),
                },
                material_id: floor_material,
            },
            Object {
                name: "mirror_probe_sphere",
                kind: ObjectKind::Sphere {
                    center: Vec3::new(0.0, floor_y + sphere_radius, 0.0),
                    radius: sphere_radius,
                    segments: 48,
                },
                material_id: mirror_material,
            },
            Object {
                name: "red_block",
                kind: ObjectKind::Cuboid {
                    center: Vec3::new(1.9, floor_y + 0.45, -0.6),
                    half_extents: Vec3::new(0.45, 0.45, 0.45),
                },
                material_id: block_material,
            },
        ],
        environment: Environment::Gradient {
            horizon: Vec3::new(1.0, 0.96, 0.9),
            zenith: Vec3::new(0.35, 0.55, 0.95),
        },
    }
}
