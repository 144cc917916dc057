//! Model manager: active inference mode and the weights loaded for it

use crate::config::{DetectorConfig, InferenceMode};
use crate::error::VisionError;
use crate::models::backend::{DetectorModel, ModelLoader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks the active mode and owns the one live model handle.
///
/// With the default weight pair, a mode change that crosses the
/// prompt-free/prompted boundary loads the destination weights. The
/// replacement is staged first and only swapped in, together with the mode
/// flag, once every step of the transition has succeeded.
pub struct ModelManager {
    loader: Arc<dyn ModelLoader>,
    config: DetectorConfig,
    mode: InferenceMode,
    model: Box<dyn DetectorModel>,
    loaded_weights: PathBuf,
    reloads: u64,
}

impl ModelManager {
    /// Load the prompt-free weights (or the custom weights) and start in
    /// prompt-free mode.
    pub fn new(loader: Arc<dyn ModelLoader>, config: DetectorConfig) -> Result<Self, VisionError> {
        config.validate()?;

        let mode = InferenceMode::PromptFree;
        let weights = config.weights_for(mode).to_path_buf();
        let model = loader.load(&weights)?;
        info!("Loaded {} weights from {:?} ({} mode)", model.name(), weights, mode);

        Ok(Self {
            loader,
            config,
            mode,
            model,
            loaded_weights: weights,
            reloads: 0,
        })
    }

    pub fn mode(&self) -> InferenceMode {
        self.mode
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Weight file backing the live model
    pub fn loaded_weights(&self) -> &Path {
        &self.loaded_weights
    }

    /// Number of weight reloads since construction
    pub fn reload_count(&self) -> u64 {
        self.reloads
    }

    pub fn model_mut(&mut self) -> &mut dyn DetectorModel {
        self.model.as_mut()
    }

    /// Whether switching to `mode` would load a different weight set
    pub fn needs_reload(&self, mode: InferenceMode) -> bool {
        self.config.weights.is_default() && self.mode.crosses_boundary(mode)
    }

    /// Switch the active mode, reloading weights if required.
    pub fn switch_to(&mut self, mode: InferenceMode) -> Result<(), VisionError> {
        self.switch_with(mode, |_| Ok(()))
    }

    /// Switch to `mode` and run `prepare` against the model that will be
    /// live afterwards.
    ///
    /// If a reload is required, `prepare` runs on the freshly loaded model
    /// before it replaces the current one. Any failure (load or `prepare`)
    /// leaves both the mode and the current model untouched.
    pub fn switch_with<T, F>(&mut self, mode: InferenceMode, prepare: F) -> Result<T, VisionError>
    where
        F: FnOnce(&mut dyn DetectorModel) -> Result<T, VisionError>,
    {
        if !self.needs_reload(mode) {
            let out = prepare(self.model.as_mut())?;
            if self.mode != mode {
                debug!("Switching mode {} -> {} (no reload)", self.mode, mode);
                self.mode = mode;
            }
            return Ok(out);
        }

        let weights = self.config.weights_for(mode).to_path_buf();
        info!("Switching mode {} -> {}, loading weights from {:?}", self.mode, mode, weights);

        let mut staged = self.loader.load(&weights)?;
        let out = prepare(staged.as_mut())?;

        self.model = staged;
        self.loaded_weights = weights;
        self.mode = mode;
        self.reloads += 1;

        Ok(out)
    }
}
