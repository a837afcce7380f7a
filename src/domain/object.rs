use glam::Vec3;

use super::material::MaterialId;
use super::validate::validate_vec3_finite;

#[derive(Clone, Copy, Debug)]
pub enum ObjectKind {
    /// Parallelogram spanned by two edges from `corner`.
    Quad {
        corner: Vec3,
        edge_u: Vec3,
        edge_v: Vec3,
    },
    /// Axis-aligned box.
    Cuboid {
        center: Vec3,
        half_extents: Vec3,
    },
    /// UV sphere with `segments` longitude slices and half as many rings.
    Sphere {
        center: Vec3,
        radius: f32,
        segments: u32,
    },
}

#[derive(Clone, Copy, Debug)]
pub struct Object {
    pub name: &'static str,
    pub kind: ObjectKind,
    pub material_id: MaterialId,
}

impl Object {
    pub fn validate_physical(&self) -> Result<(), String> {
        match self.kind {
            ObjectKind::Quad {
                corner,
                edge_u,
                edge_v,
            } => {
                validate_vec3_finite(corner, "corner")?;
                validate_vec3_finite(edge_u, "edge_u")?;
                validate_vec3_finite(edge_v, "edge_v")?;
                if edge_u.cross(edge_v).length() < 1.0e-8 {
                    return Err("quad edges must span a non-zero area".into());
                }
            }
            ObjectKind::Cuboid {
                center,
                half_extents,
            } => {
                validate_vec3_finite(center, "center")?;
                validate_vec3_finite(half_extents, "half_extents")?;
                if half_extents.min_element() <= 0.0 {
                    return Err(format!(
                        "half extents must be > 0, got ({}, {}, {})",
                        half_extents.x, half_extents.y, half_extents.z
                    ));
                }
            }
            ObjectKind::Sphere {
                center,
                radius,
                segments,
            } => {
                validate_vec3_finite(center, "center")?;
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(format!("radius must be finite and > 0, got {radius}"));
                }
                if segments < 3 {
                    return Err(format!("sphere needs at least 3 segments, got {segments}"));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(kind: ObjectKind) -> Object {
        Object {
            name: "test",
            kind,
            material_id: MaterialId(0),
        }
    }

    #[test]
    fn rejects_degenerate_quad() {
        let quad = object(ObjectKind::Quad {
            corner: Vec3::ZERO,
            edge_u: Vec3::X,
            edge_v: Vec3::X * 2.0,
        });
        assert!(quad.validate_physical().is_err());
    }

    #[test]
    fn rejects_flat_cuboid() {
        let cuboid = object(ObjectKind::Cuboid {
            center: Vec3::ZERO,
            half_extents: Vec3::new(1.0, 0.0, 1.0),
        });
        assert!(cuboid.validate_physical().is_err());
    }

    #[test]
    fn rejects_non_finite_sphere_radius() {
        let sphere = object(ObjectKind::Sphere {
            center: Vec3::ZERO,
            radius: f32::NAN,
            segments: 16,
        });
        assert!(sphere.validate_physical().is_err());
    }
}
