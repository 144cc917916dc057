//! YOLOE detector facade
//!
//! [`YoloeDetector`] is the long-lived object shared by every request
//! handler. Each public operation runs its whole switch-bind-infer sequence
//! under one lock, so an inference call always sees exactly the mode and
//! prompt its own request installed.

use crate::config::{validate_threshold, DetectorConfig, InferenceMode};
use crate::error::VisionError;
use crate::models::{ClassId, DetectionResult, ModelLoader, ModelManager, PredictRequest, SharedImage};
use crate::processing::prompt::{self, PromptState};
use crate::processing::{render_result, summarize, NormalizedSummary};
use image::RgbImage;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Per-call inference knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictOptions {
    /// Confidence threshold in [0, 1]
    pub conf: f32,
    /// IoU threshold for non-max suppression in [0, 1]
    pub iou: f32,
    /// Return a [`NormalizedSummary`] instead of raw per-image results
    pub return_summary: bool,
    /// Ask the model for masks at source-image resolution
    pub retina_masks: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            conf: crate::config::DEFAULT_CONF,
            iou: crate::config::DEFAULT_IOU,
            return_summary: true,
            retina_masks: false,
        }
    }
}

impl PredictOptions {
    pub fn new(conf: f32, iou: f32) -> Self {
        Self {
            conf,
            iou,
            ..Self::default()
        }
    }

    pub fn raw(mut self) -> Self {
        self.return_summary = false;
        self
    }

    pub fn validate(&self) -> Result<(), VisionError> {
        validate_threshold("conf", self.conf)?;
        validate_threshold("iou", self.iou)
    }
}

/// Result of a detection call, shaped by [`PredictOptions::return_summary`]
#[derive(Debug, Clone)]
pub enum DetectionOutput {
    Summary(NormalizedSummary),
    Raw(Vec<DetectionResult>),
}

impl DetectionOutput {
    /// Summary form, summarizing raw results if needed.
    pub fn into_summary(self) -> NormalizedSummary {
        match self {
            DetectionOutput::Summary(summary) => summary,
            DetectionOutput::Raw(results) => summarize(&results),
        }
    }

    /// Raw results, if this output was produced in raw form.
    pub fn into_raw(self) -> Option<Vec<DetectionResult>> {
        match self {
            DetectionOutput::Raw(results) => Some(results),
            DetectionOutput::Summary(_) => None,
        }
    }
}

/// Prompt payload for [`YoloeDetector::batch_detect`]
#[derive(Debug, Clone)]
pub enum BatchPrompt {
    Classes(Vec<String>),
    Visual {
        boxes: Vec<[f32; 4]>,
        class_ids: Vec<ClassId>,
        reference_image: Option<SharedImage>,
    },
}

/// Mode and prompt state guarded as one unit
struct EngineState {
    models: ModelManager,
    prompt: PromptState,
}

impl EngineState {
    fn infer(&mut self, images: &[SharedImage], opts: &PredictOptions) -> Result<DetectionOutput, VisionError> {
        let mode = self.models.mode();
        let request = PredictRequest {
            conf: opts.conf,
            iou: opts.iou,
            retina_masks: opts.retina_masks,
            prompt: &self.prompt,
        };

        let mut results = self.models.model_mut().predict(images, &request)?;
        if results.len() != images.len() {
            return Err(VisionError::Inference(format!(
                "detector returned {} results for {} images",
                results.len(),
                images.len()
            )));
        }

        for (result, image) in results.iter_mut().zip(images) {
            if result.image.is_none() {
                result.image = Some(image.clone());
            }
            if result.image_size == (0, 0) {
                result.image_size = image.dimensions();
            }
        }

        debug!(
            "{} inference on {} image(s): {} detection(s)",
            mode,
            images.len(),
            results.iter().map(DetectionResult::len).sum::<usize>()
        );

        if opts.return_summary {
            Ok(DetectionOutput::Summary(summarize(&results)))
        } else {
            Ok(DetectionOutput::Raw(results))
        }
    }
}

/// Mode-switching YOLOE inference facade
pub struct YoloeDetector {
    state: Mutex<EngineState>,
}

impl YoloeDetector {
    /// Create a detector, loading the initial prompt-free (or custom) weights
    pub fn new(loader: Arc<dyn ModelLoader>, config: DetectorConfig) -> Result<Self, VisionError> {
        let models = ModelManager::new(loader, config)?;
        info!("YOLOE detector ready with weights {:?}", models.loaded_weights());

        Ok(Self {
            state: Mutex::new(EngineState {
                models,
                prompt: PromptState::None,
            }),
        })
    }

    pub fn mode(&self) -> InferenceMode {
        self.state.lock().models.mode()
    }

    /// Snapshot of the bound prompt
    pub fn prompt_state(&self) -> PromptState {
        self.state.lock().prompt.clone()
    }

    pub fn reload_count(&self) -> u64 {
        self.state.lock().models.reload_count()
    }

    pub fn loaded_weights(&self) -> PathBuf {
        self.state.lock().models.loaded_weights().to_path_buf()
    }

    /// Snapshot of the configuration the detector was built with
    pub fn config(&self) -> DetectorConfig {
        self.state.lock().models.config().clone()
    }

    /// Default thresholds from the detector configuration
    pub fn default_options(&self) -> PredictOptions {
        let state = self.state.lock();
        let config = state.models.config();
        PredictOptions::new(config.default_conf, config.default_iou)
    }

    /// Detect with the built-in vocabulary
    pub fn detect_prompt_free(
        &self,
        images: &[SharedImage],
        opts: PredictOptions,
    ) -> Result<DetectionOutput, VisionError> {
        opts.validate()?;

        let mut state = self.state.lock();
        state.models.switch_to(InferenceMode::PromptFree)?;
        state.prompt = PromptState::None;
        state.infer(images, &opts)
    }

    /// Detect only the given class names
    pub fn detect_with_text(
        &self,
        images: &[SharedImage],
        class_names: &[String],
        opts: PredictOptions,
    ) -> Result<DetectionOutput, VisionError> {
        opts.validate()?;
        let names = prompt::validate_class_names(class_names)?;

        let mut state = self.state.lock();
        let already_bound = state.models.mode() == InferenceMode::TextPrompted
            && state.prompt.class_names() == Some(names.as_slice());

        if !already_bound {
            let class_list = state
                .models
                .switch_with(InferenceMode::TextPrompted, |model| prompt::bind_classes(model, &names))?;
            state.prompt = PromptState::ClassList(class_list);
        }

        state.infer(images, &opts)
    }

    /// Detect objects resembling the example boxes.
    ///
    /// Boxes refer to `reference_image` when given, otherwise to the target
    /// image itself.
    pub fn detect_with_visual_prompt(
        &self,
        images: &[SharedImage],
        boxes: &[[f32; 4]],
        class_ids: &[ClassId],
        reference_image: Option<SharedImage>,
        opts: PredictOptions,
    ) -> Result<DetectionOutput, VisionError> {
        opts.validate()?;
        let visual = prompt::bind_visual_prompt(boxes, class_ids, reference_image)?;

        let mut state = self.state.lock();
        state.models.switch_to(InferenceMode::ImagePrompted)?;
        state.prompt = PromptState::VisualPrompt(visual);
        state.infer(images, &opts)
    }

    /// Dispatch on a mode string (`"prompt-free"`, `"text-prompted"`,
    /// `"image-prompted"`).
    pub fn batch_detect(
        &self,
        images: &[SharedImage],
        mode: &str,
        prompt: Option<BatchPrompt>,
        opts: PredictOptions,
    ) -> Result<DetectionOutput, VisionError> {
        let mode: InferenceMode = mode.parse()?;

        match (mode, prompt) {
            (InferenceMode::PromptFree, _) => self.detect_prompt_free(images, opts),
            (InferenceMode::TextPrompted, Some(BatchPrompt::Classes(names))) => {
                self.detect_with_text(images, &names, opts)
            }
            (
                InferenceMode::ImagePrompted,
                Some(BatchPrompt::Visual {
                    boxes,
                    class_ids,
                    reference_image,
                }),
            ) => self.detect_with_visual_prompt(images, &boxes, &class_ids, reference_image, opts),
            (InferenceMode::TextPrompted, _) => Err(VisionError::InvalidPrompt(
                "For text-prompted mode, prompts must be a list of class names".to_string(),
            )),
            (InferenceMode::ImagePrompted, _) => Err(VisionError::InvalidPrompt(
                "For image-prompted mode, prompts must contain bboxes and cls".to_string(),
            )),
        }
    }

    /// Return to prompt-free mode and drop any bound prompt
    pub fn reset_to_prompt_free(&self) -> Result<(), VisionError> {
        let mut state = self.state.lock();
        state.models.switch_to(InferenceMode::PromptFree)?;
        state.prompt = PromptState::None;
        Ok(())
    }

    /// Render `results[index]`, optionally writing it to `save_path`.
    pub fn visualize(
        &self,
        results: &[DetectionResult],
        index: usize,
        save_path: Option<&Path>,
    ) -> Result<RgbImage, VisionError> {
        let result = results.get(index).ok_or(VisionError::IndexOutOfRange {
            index,
            len: results.len(),
        })?;

        let rendered = render_result(result)?;

        if let Some(path) = save_path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            rendered.save(path)?;
            info!("Saved annotated result {} to {:?}", index, path);
        }

        Ok(rendered)
    }
}
