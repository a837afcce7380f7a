//! Per-invocation stage bodies used by the host execution context. The WGSL
//! kernels implement the same math.

use glam::Vec3;

use super::types::{CameraData, Hit, MaterialRecord, Ray, Triangle, MATERIAL_KIND_MIRROR};
use crate::math::{cosine_sample_hemisphere, direction_to_equirect, reflect, sample_unit_disk, SampleRng};

const TRIANGLE_EPSILON: f32 = 1.0e-7;
const RAY_OFFSET: f32 = 1.0e-4;

/// Primary ray through a jittered position inside `pixel`, with thin-lens
/// depth of field when the camera has a non-zero aperture.
pub fn generate_primary_ray(
    camera: &CameraData,
    width: u32,
    height: u32,
    pixel: u32,
    rng: &mut SampleRng,
) -> Ray {
    let x = pixel % width;
    let y = pixel / width;
    let u = (x as f32 + rng.next_f32()) / width as f32;
    let v = (y as f32 + rng.next_f32()) / height as f32;

    let sx = (2.0 * u - 1.0) * camera.tan_half_fov * camera.aspect;
    let sy = (1.0 - 2.0 * v) * camera.tan_half_fov;
    let direction = (camera.front + camera.right * sx + camera.up * sy).normalize();

    if camera.aperture <= 0.0 {
        return Ray::new(camera.origin, direction);
    }

    let focus_point = camera.origin + direction * (camera.focus_distance / direction.dot(camera.front));
    let lens = sample_unit_disk(rng.next_f32(), rng.next_f32()) * (camera.aperture * 0.5);
    let origin = camera.origin + camera.right * lens.x + camera.up * lens.y;
    Ray::new(origin, (focus_point - origin).normalize())
}

/// Moller-Trumbore. Returns `(t, u, v)` for hits inside `(t_min, t_max)`.
pub fn intersect_triangle(ray: &Ray, triangle: &Triangle) -> Option<(f32, f32, f32)> {
    let [p0, p1, p2] = triangle.vertices();
    let direction = ray.direction();
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let pvec = direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < TRIANGLE_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = ray.origin() - p0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = direction.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    if t <= ray.t_min || t >= ray.t_max {
        return None;
    }
    Some((t, u, v))
}

pub fn closest_hit(ray: &Ray, triangles: &[Triangle]) -> Hit {
    let mut closest = Hit::MISS;
    for (index, triangle) in triangles.iter().enumerate() {
        if let Some((t, u, v)) = intersect_triangle(ray, triangle) {
            if t < closest.t {
                closest = Hit {
                    t,
                    primitive: index as u32,
                    u,
                    v,
                };
            }
        }
    }
    closest
}

/// Nearest-texel lookup into an equirectangular environment.
pub fn environment_radiance(texels: &[[f32; 4]], width: u32, height: u32, direction: Vec3) -> Vec3 {
    if width == 0 || height == 0 || texels.is_empty() {
        return Vec3::ZERO;
    }
    let uv = direction_to_equirect(direction);
    let x = ((uv.x * width as f32) as u32).min(width - 1);
    let y = ((uv.y * height as f32) as u32).min(height - 1);
    texels
        .get((y * width + x) as usize)
        .map(|texel| Vec3::new(texel[0], texel[1], texel[2]))
        .unwrap_or(Vec3::ZERO)
}

#[derive(Clone, Copy, Debug)]
pub struct SurfaceResponse {
    /// Radiance to add to the pixel, already weighted by the incoming throughput.
    pub emitted: Vec3,
    pub throughput: Vec3,
    pub continuation: Option<Ray>,
}

/// Evaluates one surface hit. The path ends when the attenuated throughput
/// is black; there is no probabilistic termination.
pub fn shade_surface(
    ray: &Ray,
    hit: &Hit,
    triangle: &Triangle,
    material: &MaterialRecord,
    throughput: Vec3,
    rng: &mut SampleRng,
) -> SurfaceResponse {
    let incident = ray.direction();
    let mut normal = triangle.cross().normalize_or_zero();
    if normal.dot(incident) > 0.0 {
        normal = -normal;
    }

    let emitted = throughput * Vec3::from_array(material.emission);
    let next_throughput = throughput * Vec3::from_array(material.albedo);
    if next_throughput.max_element() <= 0.0 || normal == Vec3::ZERO {
        return SurfaceResponse {
            emitted,
            throughput: next_throughput,
            continuation: None,
        };
    }

    let point = ray.at(hit.t);
    let direction = if material.kind == MATERIAL_KIND_MIRROR {
        reflect(incident, normal).normalize()
    } else {
        cosine_sample_hemisphere(normal, rng.next_f32(), rng.next_f32())
    };
    let offset = RAY_OFFSET * point.abs().max_element().max(1.0);

    SurfaceResponse {
        emitted,
        throughput: next_throughput,
        continuation: Some(Ray::new(point + normal * offset, direction)),
    }
}

/// Normalizes accumulated radiance by the sample count. A zero count
/// resolves to black.
pub fn resolve_pixel(accumulated: [f32; 4], sample_count: u32) -> [f32; 4] {
    if sample_count == 0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let inv = 1.0 / sample_count as f32;
    [accumulated[0] * inv, accumulated[1] * inv, accumulated[2] * inv, 1.0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::types::MATERIAL_KIND_DIFFUSE;

    fn floor_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(-10.0, 0.0, -10.0),
            Vec3::new(10.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 10.0),
            0,
        )
    }

    #[test]
    fn ray_hits_triangle_below() {
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let (t, _, _) = intersect_triangle(&ray, &floor_triangle()).expect("must hit");
        assert!((t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::X);
        assert!(closest_hit(&ray, &[floor_triangle()]).is_miss());
    }

    #[test]
    fn closest_hit_prefers_nearest_triangle() {
        let mut upper = floor_triangle();
        for p in [&mut upper.p0, &mut upper.p1, &mut upper.p2] {
            p[1] = 1.0;
        }
        let ray = Ray::new(Vec3::new(0.0, 3.0, 0.0), Vec3::NEG_Y);
        let hit = closest_hit(&ray, &[floor_triangle(), upper]);
        assert_eq!(hit.primitive, 1);
        assert!((hit.t - 2.0).abs() < 1e-5);
    }

    #[test]
    fn constant_environment_is_direction_independent() {
        let texels = [[0.25, 0.5, 0.75, 1.0]];
        for direction in [Vec3::X, Vec3::NEG_Y, Vec3::new(0.3, 0.4, -0.9)] {
            let value = environment_radiance(&texels, 1, 1, direction);
            assert_eq!(value, Vec3::new(0.25, 0.5, 0.75));
        }
    }

    #[test]
    fn black_albedo_terminates_path() {
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y);
        let hit = closest_hit(&ray, &[floor_triangle()]);
        let material = MaterialRecord {
            albedo: [0.0; 3],
            kind: MATERIAL_KIND_DIFFUSE,
            emission: [4.0, 4.0, 4.0],
            _pad: 0.0,
        };
        let mut rng = SampleRng::new(1);
        let response = shade_surface(&ray, &hit, &floor_triangle(), &material, Vec3::splat(0.5), &mut rng);
        assert!(response.continuation.is_none());
        assert_eq!(response.emitted, Vec3::splat(2.0));
    }

    #[test]
    fn mirror_reflects_and_leaves_surface() {
        let ray = Ray::new(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, -1.0, 0.0).normalize());
        let hit = closest_hit(&ray, &[floor_triangle()]);
        let material = MaterialRecord {
            albedo: [0.9; 3],
            kind: MATERIAL_KIND_MIRROR,
            emission: [0.0; 3],
            _pad: 0.0,
        };
        let mut rng = SampleRng::new(7);
        let response = shade_surface(&ray, &hit, &floor_triangle(), &material, Vec3::ONE, &mut rng);
        let next = response.continuation.expect("mirror continues");
        assert!(next.direction[1] > 0.0);
        assert!(next.origin[1] > 0.0);
        assert!((response.throughput - Vec3::splat(0.9)).length() < 1e-6);
    }

    #[test]
    fn zero_samples_resolve_to_black() {
        assert_eq!(resolve_pixel([3.0, 2.0, 1.0, 0.0], 0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(resolve_pixel([3.0, 2.0, 1.0, 0.0], 2), [1.5, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn primary_rays_point_forward() {
        let camera = CameraData::default();
        let mut rng = SampleRng::new(3);
        for pixel in 0..16 {
            let ray = generate_primary_ray(&camera, 4, 4, pixel, &mut rng);
            assert!(ray.direction().dot(camera.front) > 0.0);
        }
    }
}
