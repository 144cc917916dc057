//! eureka-eye: open-vocabulary detection core for EurekAnno
//!
//! Wraps a YOLOE-style detector that can run in three mutually exclusive
//! modes (prompt-free, text-prompted and visual-prompted), reloads weights
//! only when a mode change crosses the prompt-free/prompted boundary, and
//! flattens per-image detector output into one uniform summary shape.
//!
//! The neural network runtime itself is injected through
//! [`models::ModelLoader`], so the same facade serves an ONNX/Torch backend in
//! production and a scripted stub in tests.

pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod models;
pub mod processing;
mod utils;

pub use config::{DetectorConfig, InferenceMode, WeightSelection};
pub use detector::{BatchPrompt, DetectionOutput, PredictOptions, YoloeDetector};
pub use error::VisionError;
pub use models::{
    BoundingBox, ClassId, Detection, DetectionResult, DetectorModel, ModelLoader, Polygon,
    SharedImage, TextEmbedding,
};
pub use processing::{NormalizedSummary, PromptState};
pub use utils::{decode_image, load_image};
