//! Image loading helpers

use crate::error::VisionError;
use crate::models::SharedImage;
use std::path::Path;
use std::sync::Arc;

/// Decode an encoded image (PNG, JPEG, ...) into a shared RGB buffer.
pub fn decode_image(bytes: &[u8]) -> Result<SharedImage, VisionError> {
    if bytes.is_empty() {
        return Err(VisionError::InvalidImage("Uploaded file is empty".to_string()));
    }
    let image = image::load_from_memory(bytes)
        .map_err(|e| VisionError::InvalidImage(format!("Failed to read image file: {}", e)))?;
    Ok(Arc::new(image.to_rgb8()))
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> Result<SharedImage, VisionError> {
    let image = image::open(path)?;
    Ok(Arc::new(image.to_rgb8()))
}
