//! Walk a detector through all three modes with a toy backend
//!
//! Run with `RUST_LOG=debug` to see the weight reloads.

use eureka_eye::models::PredictRequest;
use eureka_eye::{
    BoundingBox, Detection, DetectionResult, DetectorConfig, DetectorModel, ModelLoader, PredictOptions,
    PromptState, SharedImage, TextEmbedding, VisionError, YoloeDetector,
};
use image::RgbImage;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Reports one full-frame detection per prompt entry
struct ToyModel {
    classes: Vec<String>,
}

impl DetectorModel for ToyModel {
    fn predict(
        &mut self,
        images: &[SharedImage],
        request: &PredictRequest<'_>,
    ) -> Result<Vec<DetectionResult>, VisionError> {
        let ids: Vec<u32> = match request.prompt {
            PromptState::None => vec![0],
            PromptState::ClassList(list) => (0..list.names.len() as u32).collect(),
            PromptState::VisualPrompt(prompt) => prompt.class_ids.clone(),
        };
        let names: BTreeMap<u32, String> = match request.prompt {
            PromptState::None => BTreeMap::from([(0, "object".to_string())]),
            _ => self.classes.iter().cloned().enumerate().map(|(i, n)| (i as u32, n)).collect(),
        };

        Ok(images
            .iter()
            .map(|image| {
                let (w, h) = image.dimensions();
                let detections = ids
                    .iter()
                    .map(|&class_id| Detection {
                        class_id,
                        confidence: 0.5,
                        bbox: BoundingBox::new(0.0, 0.0, w as f32, h as f32),
                        mask: None,
                    })
                    .collect();
                DetectionResult::new(detections, names.clone(), (w, h))
            })
            .collect())
    }

    fn text_embedding(&mut self, class_names: &[String]) -> Result<TextEmbedding, VisionError> {
        Ok(TextEmbedding(class_names.iter().map(|n| vec![n.len() as f32]).collect()))
    }

    fn set_classes(&mut self, class_names: &[String], _embedding: &TextEmbedding) -> Result<(), VisionError> {
        self.classes = class_names.to_vec();
        Ok(())
    }
}

struct ToyLoader;

impl ModelLoader for ToyLoader {
    fn load(&self, weights: &Path) -> Result<Box<dyn DetectorModel>, VisionError> {
        println!("loading {}", weights.display());
        Ok(Box::new(ToyModel { classes: Vec::new() }))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let detector = YoloeDetector::new(Arc::new(ToyLoader), DetectorConfig::default())?;
    let images: Vec<SharedImage> = vec![Arc::new(RgbImage::new(320, 240))];
    let opts = PredictOptions::default();

    let summary = detector.detect_prompt_free(&images, opts)?.into_summary();
    println!("prompt-free: {:?}", summary.class);

    let classes = vec!["person".to_string(), "bicycle".to_string()];
    let summary = detector.detect_with_text(&images, &classes, opts)?.into_summary();
    println!("text-prompted: {:?}", summary.class);

    let summary = detector
        .detect_with_visual_prompt(&images, &[[10.0, 10.0, 80.0, 120.0]], &[1], None, opts)?
        .into_summary();
    println!("image-prompted: {:?}", summary.class);

    detector.reset_to_prompt_free()?;
    println!("mode {} after {} reload(s)", detector.mode(), detector.reload_count());

    Ok(())
}
