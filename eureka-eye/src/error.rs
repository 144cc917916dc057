//! Error types for eureka-eye

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Unknown mode '{0}'. Must be one of: 'prompt-free', 'text-prompted', 'image-prompted'")]
    InvalidMode(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid {name} threshold {value}: must be within [0, 1]")]
    InvalidThreshold { name: &'static str, value: f32 },

    #[error("Failed to load model weights from {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Index {index} out of range for results (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl VisionError {
    /// True when the error was caused by caller input rather than by the
    /// model or the host. The HTTP layer maps these to 400.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VisionError::InvalidPrompt(_)
                | VisionError::InvalidMode(_)
                | VisionError::InvalidImage(_)
                | VisionError::InvalidThreshold { .. }
                | VisionError::IndexOutOfRange { .. }
        )
    }

    /// Load failure for `path`, for use by [`crate::ModelLoader`] implementations.
    pub fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        VisionError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::InvalidPrompt("class list cannot be empty".to_string());
        assert!(err.to_string().contains("Invalid prompt"));
        assert!(err.to_string().contains("class list cannot be empty"));
    }

    #[test]
    fn test_invalid_mode_lists_known_modes() {
        let err = VisionError::InvalidMode("fancy".to_string());
        let msg = err.to_string();
        assert!(msg.contains("'fancy'"));
        assert!(msg.contains("prompt-free"));
        assert!(msg.contains("image-prompted"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_client_error_classification() {
        assert!(VisionError::InvalidPrompt("x".into()).is_client_error());
        assert!(VisionError::InvalidMode("x".into()).is_client_error());
        assert!(VisionError::InvalidImage("x".into()).is_client_error());
        assert!(VisionError::InvalidThreshold { name: "conf", value: 2.0 }.is_client_error());
        assert!(!VisionError::Inference("boom".into()).is_client_error());
        assert!(!VisionError::model_load("w.pt", "missing").is_client_error());
    }

    #[test]
    fn test_model_load_mentions_path() {
        let err = VisionError::model_load("weights/yoloe.pt", "corrupt archive");
        let msg = err.to_string();
        assert!(msg.contains("yoloe.pt"));
        assert!(msg.contains("corrupt archive"));
    }
}
