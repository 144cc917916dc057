//! Detector model management

pub mod backend;
pub mod manager;
pub mod types;

pub use backend::{DetectorModel, ModelLoader, PredictRequest};
pub use manager::ModelManager;
pub use types::{BoundingBox, ClassId, Detection, DetectionResult, Polygon, SharedImage, TextEmbedding};
