//! Error types shared by the integrator, the execution contexts and the CLI.

/// Creating a buffer, counter or surface failed. Fatal for the instance being
/// constructed; there is no degraded mode.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to allocate '{label}': {reason}")]
pub struct ResourceAllocationError {
    pub label: String,
    pub reason: String,
}

impl ResourceAllocationError {
    pub fn new(label: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            label: label.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    ResourceAllocation(#[from] ResourceAllocationError),

    #[error("device error: {0}")]
    Device(String),

    #[error("readback error: {0}")]
    Readback(String),

    #[error("stage contract violated: {0}")]
    Contract(String),

    #[error("foreign resource error: {0}")]
    ForeignResource(String),

    #[error("scene error: {0}")]
    Scene(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub fn device<T: ToString>(msg: T) -> Self {
        RenderError::Device(msg.to_string())
    }

    pub fn readback<T: ToString>(msg: T) -> Self {
        RenderError::Readback(msg.to_string())
    }

    pub fn contract<T: ToString>(msg: T) -> Self {
        RenderError::Contract(msg.to_string())
    }

    pub fn foreign<T: ToString>(msg: T) -> Self {
        RenderError::ForeignResource(msg.to_string())
    }

    pub fn scene<T: ToString>(msg: T) -> Self {
        RenderError::Scene(msg.to_string())
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        RenderError::Config(msg.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_error_converts_and_keeps_label() {
        let error: RenderError = ResourceAllocationError::new("ray-buffer-0", "out of memory").into();
        let message = error.to_string();
        assert!(message.contains("ray-buffer-0"));
        assert!(message.contains("out of memory"));
        assert!(matches!(error, RenderError::ResourceAllocation(_)));
    }
}
