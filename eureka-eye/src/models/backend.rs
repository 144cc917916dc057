//! Seams to the underlying detector runtime

use crate::error::VisionError;
use crate::models::types::{DetectionResult, SharedImage, TextEmbedding};
use crate::processing::PromptState;
use std::path::Path;

/// Per-call inference parameters handed to the model
#[derive(Debug, Clone, Copy)]
pub struct PredictRequest<'a> {
    /// Confidence threshold, applied by the model
    pub conf: f32,
    /// IoU threshold for the model's non-max suppression
    pub iou: f32,
    /// Masks at source-image resolution rather than model input resolution
    pub retina_masks: bool,
    /// Prompt configuration active for this call
    pub prompt: &'a PromptState,
}

/// A loaded weight set that can run inference
pub trait DetectorModel: Send {
    /// Run inference, returning exactly one result per input image.
    fn predict(
        &mut self,
        images: &[SharedImage],
        request: &PredictRequest<'_>,
    ) -> Result<Vec<DetectionResult>, VisionError>;

    /// Compute the conditioning representation for a class list.
    fn text_embedding(&mut self, class_names: &[String]) -> Result<TextEmbedding, VisionError>;

    /// Install a class list and its embedding as the classification head.
    fn set_classes(&mut self, class_names: &[String], embedding: &TextEmbedding) -> Result<(), VisionError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "yoloe"
    }
}

/// Loads weight files into runnable models
pub trait ModelLoader: Send + Sync {
    fn load(&self, weights: &Path) -> Result<Box<dyn DetectorModel>, VisionError>;
}
