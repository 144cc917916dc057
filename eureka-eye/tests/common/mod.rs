//! Scripted detector backend shared by the integration tests

#![allow(dead_code)]

use eureka_eye::models::PredictRequest;
use eureka_eye::{
    BoundingBox, Detection, DetectionResult, DetectorConfig, DetectorModel, ModelLoader, PromptState,
    SharedImage, TextEmbedding, VisionError, YoloeDetector,
};
use image::RgbImage;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Loader that records every load and can be told to fail for a path
#[derive(Default)]
pub struct StubLoader {
    pub loads: Mutex<Vec<PathBuf>>,
    pub failing: Mutex<HashSet<PathBuf>>,
    pub fail_predict: Arc<AtomicBool>,
    pub fail_embedding: Arc<AtomicBool>,
    pub embedding_calls: Arc<AtomicUsize>,
    pub predict_delay: Option<Duration>,
}

impl StubLoader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            predict_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.lock().len()
    }

    pub fn fail_loading(&self, path: &str) {
        self.failing.lock().insert(PathBuf::from(path));
    }

    pub fn allow_loading(&self, path: &str) {
        self.failing.lock().remove(Path::new(path));
    }
}

impl ModelLoader for StubLoader {
    fn load(&self, weights: &Path) -> Result<Box<dyn DetectorModel>, VisionError> {
        if self.failing.lock().contains(weights) {
            return Err(VisionError::model_load(weights, "No such file or directory"));
        }
        self.loads.lock().push(weights.to_path_buf());

        Ok(Box::new(StubModel {
            weights: weights.to_path_buf(),
            classes: None,
            fail_predict: self.fail_predict.clone(),
            fail_embedding: self.fail_embedding.clone(),
            embedding_calls: self.embedding_calls.clone(),
            predict_delay: self.predict_delay,
        }))
    }
}

/// Model whose output is a pure function of the bound prompt:
///
/// * no prompt: one "person" at 0.87 in `[10, 10, 50, 50]`, no mask
/// * class list: one detection per installed class, confidence 0.9
/// * visual prompt: one detection per example box, with a box-shaped mask
pub struct StubModel {
    weights: PathBuf,
    classes: Option<Vec<String>>,
    fail_predict: Arc<AtomicBool>,
    fail_embedding: Arc<AtomicBool>,
    embedding_calls: Arc<AtomicUsize>,
    predict_delay: Option<Duration>,
}

impl DetectorModel for StubModel {
    fn predict(
        &mut self,
        images: &[SharedImage],
        request: &PredictRequest<'_>,
    ) -> Result<Vec<DetectionResult>, VisionError> {
        if self.fail_predict.load(Ordering::SeqCst) {
            return Err(VisionError::Inference("CUDA out of memory".to_string()));
        }
        if let Some(delay) = self.predict_delay {
            std::thread::sleep(delay);
        }

        let (detections, names) = match request.prompt {
            PromptState::None => {
                let names = BTreeMap::from([(0, "person".to_string())]);
                let det = Detection {
                    class_id: 0,
                    confidence: 0.87,
                    bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
                    mask: None,
                };
                (vec![det], names)
            }
            PromptState::ClassList(_) => {
                let classes = self.classes.clone().ok_or_else(|| {
                    VisionError::Inference("text prompt bound without set_classes".to_string())
                })?;
                let dets = (0..classes.len() as u32)
                    .map(|i| Detection {
                        class_id: i,
                        confidence: 0.9,
                        bbox: BoundingBox::new(0.0, 0.0, 8.0, 8.0),
                        mask: None,
                    })
                    .collect();
                let names = classes.into_iter().enumerate().map(|(i, n)| (i as u32, n)).collect();
                (dets, names)
            }
            PromptState::VisualPrompt(prompt) => {
                let dets = prompt
                    .boxes
                    .iter()
                    .zip(&prompt.class_ids)
                    .map(|(b, &class_id)| Detection {
                        class_id,
                        confidence: 0.6,
                        bbox: *b,
                        mask: Some(vec![[b.x1, b.y1], [b.x2, b.y1], [b.x2, b.y2], [b.x1, b.y2]]),
                    })
                    .collect();
                (dets, BTreeMap::new())
            }
        };

        let detections: Vec<Detection> = detections.into_iter().filter(|d| d.confidence >= request.conf).collect();

        Ok(images
            .iter()
            .map(|image| DetectionResult::new(detections.clone(), names.clone(), image.dimensions()))
            .collect())
    }

    fn text_embedding(&mut self, class_names: &[String]) -> Result<TextEmbedding, VisionError> {
        self.embedding_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_embedding.load(Ordering::SeqCst) {
            return Err(VisionError::Inference("text encoder unavailable".to_string()));
        }
        Ok(TextEmbedding(
            class_names
                .iter()
                .map(|n| vec![n.len() as f32, n.bytes().map(f32::from).sum()])
                .collect(),
        ))
    }

    fn set_classes(&mut self, class_names: &[String], _embedding: &TextEmbedding) -> Result<(), VisionError> {
        self.classes = Some(class_names.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn test_image() -> SharedImage {
    Arc::new(RgbImage::new(64, 48))
}

pub fn detector(loader: &Arc<StubLoader>) -> YoloeDetector {
    YoloeDetector::new(loader.clone(), DetectorConfig::default()).unwrap()
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
