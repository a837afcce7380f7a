use std::f32::consts::PI;

use glam::Vec3;

use crate::domain::{Environment, MaterialClass, Object, ObjectKind, Scene};
use crate::error::{RenderError, RenderResult};
use crate::kernels::types::{MATERIAL_KIND_DIFFUSE, MATERIAL_KIND_MIRROR};
use crate::kernels::{MaterialRecord, Triangle};

/// Rows in a baked gradient sky.
const GRADIENT_ROWS: u32 = 64;

/// Squared-area threshold under which a triangle is dropped.
const DEGENERATE_CROSS_EPSILON: f32 = 1.0e-12;

/// Flat, device-ready scene: triangles indexing into the material table and
/// an equirectangular environment map.
#[derive(Clone, Debug)]
pub struct CompiledScene {
    pub id: String,
    pub triangles: Vec<Triangle>,
    pub materials: Vec<MaterialRecord>,
    pub environment: Vec<[f32; 4]>,
    pub environment_size: [u32; 2],
}

pub fn compile_scene(scene: &Scene) -> RenderResult<CompiledScene> {
    let materials = scene
        .materials
        .iter()
        .map(|material| MaterialRecord {
            albedo: material.albedo.to_array(),
            kind: match material.class {
                MaterialClass::Diffuse => MATERIAL_KIND_DIFFUSE,
                MaterialClass::Mirror => MATERIAL_KIND_MIRROR,
            },
            emission: material.emission.to_array(),
            _pad: 0.0,
        })
        .collect::<Vec<_>>();

    let mut triangles = Vec::new();
    for object in &scene.objects {
        if scene.material(object.material_id).is_none() {
            return Err(RenderError::scene(format!(
                "object '{}' references missing material id {}",
                object.name, object.material_id.0
            )));
        }
        let material = object.material_id.0 as u32;

        let before = triangles.len();
        tessellate(object, material, &mut triangles);
        let emitted = triangles.len() - before;

        let kept = drop_degenerate(&mut triangles, before);
        if kept < emitted {
            log::warn!(
                "scene '{}': object '{}' produced {} degenerate triangles",
                scene.id,
                object.name,
                emitted - kept
            );
        }
    }

    let (environment, environment_size) = bake_environment(&scene.environment);

    Ok(CompiledScene {
        id: scene.id.to_string(),
        triangles,
        materials,
        environment,
        environment_size,
    })
}

fn tessellate(object: &Object, material: u32, out: &mut Vec<Triangle>) {
    match object.kind {
        ObjectKind::Quad {
            corner,
            edge_u,
            edge_v,
        } => push_quad(out, corner, edge_u, edge_v, material),
        ObjectKind::Cuboid {
            center,
            half_extents,
        } => {
            let min = center - half_extents;
            let max = center + half_extents;
            let size = half_extents * 2.0;
            let dx = Vec3::new(size.x, 0.0, 0.0);
            let dy = Vec3::new(0.0, size.y, 0.0);
            let dz = Vec3::new(0.0, 0.0, size.z);

            push_quad(out, min, dz, dy, material);
            push_quad(out, Vec3::new(max.x, min.y, min.z), dy, dz, material);
            push_quad(out, min, dx, dz, material);
            push_quad(out, Vec3::new(min.x, max.y, min.z), dz, dx, material);
            push_quad(out, min, dy, dx, material);
            push_quad(out, Vec3::new(min.x, min.y, max.z), dx, dy, material);
        }
        ObjectKind::Sphere {
            center,
            radius,
            segments,
        } => push_uv_sphere(out, center, radius, segments, material),
    }
}

fn push_quad(out: &mut Vec<Triangle>, corner: Vec3, edge_u: Vec3, edge_v: Vec3, material: u32) {
    let a = corner;
    let b = corner + edge_u;
    let c = corner + edge_u + edge_v;
    let d = corner + edge_v;
    out.push(Triangle::new(a, b, c, material));
    out.push(Triangle::new(a, c, d, material));
}

fn push_uv_sphere(out: &mut Vec<Triangle>, center: Vec3, radius: f32, segments: u32, material: u32) {
    let rings = (segments / 2).max(2);
    let point = |ring: u32, segment: u32| {
        let theta = PI * ring as f32 / rings as f32;
        let phi = 2.0 * PI * (segment % segments) as f32 / segments as f32;
        center
            + radius * Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
    };

    for ring in 0..rings {
        for segment in 0..segments {
            let top_left = point(ring, segment);
            let top_right = point(ring, segment + 1);
            let bottom_left = point(ring + 1, segment);
            let bottom_right = point(ring + 1, segment + 1);

            // Pole rings collapse to a fan.
            if ring != 0 {
                out.push(Triangle::new(top_left, top_right, bottom_right, material));
            }
            if ring + 1 != rings {
                out.push(Triangle::new(top_left, bottom_right, bottom_left, material));
            }
        }
    }
}

/// Removes degenerate triangles appended after `start`, returning how many
/// remain in that range.
fn drop_degenerate(triangles: &mut Vec<Triangle>, start: usize) -> usize {
    let mut index = start;
    while index < triangles.len() {
        if triangles[index].cross().length_squared() < DEGENERATE_CROSS_EPSILON {
            triangles.swap_remove(index);
        } else {
            index += 1;
        }
    }
    triangles.len() - start
}

fn bake_environment(environment: &Environment) -> (Vec<[f32; 4]>, [u32; 2]) {
    match environment {
        Environment::Constant { color } => (vec![texel(*color)], [1, 1]),
        Environment::Gradient { horizon, zenith } => {
            // One texel per row; rows run from the zenith (v = 0) down.
            let rows = (0..GRADIENT_ROWS)
                .map(|row| {
                    let v = (row as f32 + 0.5) / GRADIENT_ROWS as f32;
                    let t = (v * PI).cos().max(0.0);
                    texel(horizon.lerp(*zenith, t))
                })
                .collect();
            (rows, [1, GRADIENT_ROWS])
        }
        Environment::Texels {
            width,
            height,
            data,
        } => (data.iter().copied().map(texel).collect(), [*width, *height]),
    }
}

fn texel(color: Vec3) -> [f32; 4] {
    [color.x, color.y, color.z, 1.0]
}
