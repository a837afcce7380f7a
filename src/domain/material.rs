use glam::Vec3;

use super::validate::{validate_vec3_finite, validate_vec3_non_negative};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialClass {
    /// Cosine-weighted scattering.
    Diffuse,
    /// Perfect specular reflection.
    Mirror,
}

#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub name: &'static str,
    pub class: MaterialClass,
    pub albedo: Vec3,
    pub emission: Vec3,
}

impl Material {
    pub fn diffuse(name: &'static str, albedo: Vec3) -> Self {
        Self {
            name,
            class: MaterialClass::Diffuse,
            albedo,
            emission: Vec3::ZERO,
        }
    }

    pub fn mirror(name: &'static str, albedo: Vec3) -> Self {
        Self {
            name,
            class: MaterialClass::Mirror,
            albedo,
            emission: Vec3::ZERO,
        }
    }

    pub fn emissive(name: &'static str, emission: Vec3) -> Self {
        Self {
            name,
            class: MaterialClass::Diffuse,
            albedo: Vec3::ZERO,
            emission,
        }
    }

    pub fn validate_physical(&self) -> Result<(), String> {
        validate_vec3_finite(self.albedo, "albedo")?;
        validate_vec3_non_negative(self.albedo, "albedo")?;
        validate_vec3_finite(self.emission, "emission")?;
        validate_vec3_non_negative(self.emission, "emission")?;
        if self.albedo.max_element() > 1.0 {
            return Err(format!(
                "albedo components must be <= 1, got ({}, {}, {})",
                self.albedo.x, self.albedo.y, self.albedo.z
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_diffuse_material() {
        assert!(Material::diffuse("wall", Vec3::splat(0.7)).validate_physical().is_ok());
    }

    #[test]
    fn rejects_energy_gaining_albedo() {
        let material = Material::mirror("chrome", Vec3::new(1.2, 0.9, 0.9));
        assert!(material.validate_physical().is_err());
    }

    #[test]
    fn rejects_negative_emission() {
        let material = Material::emissive("lamp", Vec3::new(4.0, -1.0, 4.0));
        assert!(material.validate_physical().is_err());
    }
}
