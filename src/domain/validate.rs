use glam::Vec3;

pub(crate) fn validate_vec3_finite(value: Vec3, field: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!(
            "{field} components must be finite, got ({}, {}, {})",
            value.x, value.y, value.z
        ));
    }
    Ok(())
}

pub(crate) fn validate_vec3_non_negative(value: Vec3, field: &str) -> Result<(), String> {
    if value.x < 0.0 || value.y < 0.0 || value.z < 0.0 {
        return Err(format!(
            "{field} components must be >= 0, got ({}, {}, {})",
            value.x, value.y, value.z
        ));
    }
    Ok(())
}
