use glam::Vec3;

use super::validate::{validate_vec3_finite, validate_vec3_non_negative};

/// Radiance arriving from directions that leave the scene.
#[derive(Clone, Debug)]
pub enum Environment {
    Constant {
        color: Vec3,
    },
    /// Blends from `horizon` at and below the horizon to `zenith` straight up.
    Gradient {
        horizon: Vec3,
        zenith: Vec3,
    },
    /// Equirectangular map, row-major, first row at the zenith.
    Texels {
        width: u32,
        height: u32,
        data: Vec<Vec3>,
    },
}

impl Environment {
    pub fn validate_physical(&self) -> Result<(), String> {
        match self {
            Environment::Constant { color } => {
                validate_vec3_finite(*color, "color")?;
                validate_vec3_non_negative(*color, "color")?;
            }
            Environment::Gradient { horizon, zenith } => {
                validate_vec3_finite(*horizon, "horizon")?;
                validate_vec3_non_negative(*horizon, "horizon")?;
                validate_vec3_finite(*zenith, "zenith")?;
                validate_vec3_non_negative(*zenith, "zenith")?;
            }
            Environment::Texels {
                width,
                height,
                data,
            } => {
                if *width == 0 || *height == 0 {
                    return Err("environment map must not be empty".into());
                }
                let expected = *width as usize * *height as usize;
                if data.len() != expected {
                    return Err(format!(
                        "environment map is {width}x{height} but holds {} texels",
                        data.len()
                    ));
                }
                for texel in data {
                    validate_vec3_finite(*texel, "texel")?;
                    validate_vec3_non_negative(*texel, "texel")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_gradient() {
        let sky = Environment::Gradient {
            horizon: Vec3::new(1.0, 0.9, 0.8),
            zenith: Vec3::new(0.3, 0.5, 0.9),
        };
        assert!(sky.validate_physical().is_ok());
    }

    #[test]
    fn rejects_texel_count_mismatch() {
        let map = Environment::Texels {
            width: 2,
            height: 2,
            data: vec![Vec3::ONE; 3],
        };
        assert!(map.validate_physical().is_err());
    }

    #[test]
    fn rejects_negative_constant() {
        let sky = Environment::Constant {
            color: Vec3::new(-0.1, 0.8, 0.9),
        };
        assert!(sky.validate_physical().is_err());
    }
}
