//! Configuration for eureka-eye

use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Built-in weight identifier for prompt-free mode (large RAM++ vocabulary).
pub const DEFAULT_PROMPT_FREE_WEIGHTS: &str = "yoloe-11l-seg-pf.pt";
/// Built-in weight identifier shared by text- and visual-prompted modes.
pub const DEFAULT_PROMPTED_WEIGHTS: &str = "yoloe-11s-seg.pt";

pub const DEFAULT_CONF: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.7;

/// Inference mode of the detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceMode {
    /// Built-in vocabulary, no caller-supplied classes
    #[default]
    PromptFree,
    /// Detection restricted to caller-supplied class names
    TextPrompted,
    /// Detection guided by example boxes
    ImagePrompted,
}

impl InferenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceMode::PromptFree => "prompt-free",
            InferenceMode::TextPrompted => "text-prompted",
            InferenceMode::ImagePrompted => "image-prompted",
        }
    }

    /// Text and visual prompting share one weight set.
    pub fn is_prompted(&self) -> bool {
        !matches!(self, InferenceMode::PromptFree)
    }

    /// Whether moving from `self` to `other` crosses the
    /// prompt-free/prompted boundary.
    pub fn crosses_boundary(&self, other: InferenceMode) -> bool {
        self.is_prompted() != other.is_prompted()
    }
}

impl fmt::Display for InferenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InferenceMode {
    type Err = VisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prompt-free" => Ok(InferenceMode::PromptFree),
            "text-prompted" => Ok(InferenceMode::TextPrompted),
            "image-prompted" => Ok(InferenceMode::ImagePrompted),
            other => Err(VisionError::InvalidMode(other.to_string())),
        }
    }
}

/// Which weights the detector runs with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSelection {
    /// Swap between the prompt-free and prompted weight sets as the mode changes
    #[default]
    Default,
    /// One explicit weight file for every mode; never reloaded
    Custom(PathBuf),
}

impl WeightSelection {
    /// Interpret a user-facing `model_path` value where `"default"` (or an
    /// empty value) selects the mode-switching weight pair.
    pub fn from_model_path(model_path: &str) -> Self {
        let trimmed = model_path.trim();
        if trimmed.is_empty() || trimmed == "default" {
            WeightSelection::Default
        } else {
            WeightSelection::Custom(PathBuf::from(trimmed))
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, WeightSelection::Default)
    }
}

/// Detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Default pair or a custom weight file
    pub weights: WeightSelection,
    /// Weights loaded for prompt-free mode
    pub prompt_free_weights: PathBuf,
    /// Weights loaded for text- and visual-prompted modes
    pub prompted_weights: PathBuf,
    /// Confidence threshold used when the caller gives none
    pub default_conf: f32,
    /// IoU threshold used when the caller gives none
    pub default_iou: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weights: WeightSelection::Default,
            prompt_free_weights: PathBuf::from(DEFAULT_PROMPT_FREE_WEIGHTS),
            prompted_weights: PathBuf::from(DEFAULT_PROMPTED_WEIGHTS),
            default_conf: DEFAULT_CONF,
            default_iou: DEFAULT_IOU,
        }
    }
}

impl DetectorConfig {
    /// Build a config from the configured weight paths, falling back to the
    /// built-in identifiers for any path that is unset or missing on disk.
    pub fn from_model_paths(prompted: Option<&str>, prompt_free: Option<&str>) -> Self {
        Self {
            prompted_weights: resolve_weight_path(prompted, DEFAULT_PROMPTED_WEIGHTS),
            prompt_free_weights: resolve_weight_path(prompt_free, DEFAULT_PROMPT_FREE_WEIGHTS),
            ..Self::default()
        }
    }

    /// Config that pins a single weight file for every mode.
    pub fn custom(path: impl Into<PathBuf>) -> Self {
        Self {
            weights: WeightSelection::Custom(path.into()),
            ..Self::default()
        }
    }

    /// Weight file the detector should hold while in `mode`.
    pub fn weights_for(&self, mode: InferenceMode) -> &Path {
        match &self.weights {
            WeightSelection::Custom(path) => path,
            WeightSelection::Default if mode.is_prompted() => &self.prompted_weights,
            WeightSelection::Default => &self.prompt_free_weights,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), VisionError> {
        validate_threshold("conf", self.default_conf)?;
        validate_threshold("iou", self.default_iou)?;

        if let WeightSelection::Custom(path) = &self.weights {
            if path.as_os_str().is_empty() {
                return Err(VisionError::Config("Custom weight path must not be empty".to_string()));
            }
        }

        if self.prompt_free_weights.as_os_str().is_empty() || self.prompted_weights.as_os_str().is_empty() {
            return Err(VisionError::Config("Default weight paths must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Keep `configured` only if it names an existing file, else fall back.
pub fn resolve_weight_path(configured: Option<&str>, fallback: &str) -> PathBuf {
    match configured.map(str::trim).filter(|p| !p.is_empty()) {
        Some(path) if Path::new(path).exists() => PathBuf::from(path),
        Some(path) => {
            warn!("Model path not found or invalid: {}. Using default {}", path, fallback);
            PathBuf::from(fallback)
        }
        None => PathBuf::from(fallback),
    }
}

pub(crate) fn validate_threshold(name: &'static str, value: f32) -> Result<(), VisionError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(VisionError::InvalidThreshold { name, value });
    }
    Ok(())
}
