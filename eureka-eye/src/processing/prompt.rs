//! Prompt binding for text- and visual-prompted detection

use crate::error::VisionError;
use crate::models::{BoundingBox, ClassId, DetectorModel, SharedImage, TextEmbedding};
use tracing::debug;

/// Class names plus the embedding installed for them
#[derive(Debug, Clone, PartialEq)]
pub struct ClassList {
    pub names: Vec<String>,
    pub embedding: TextEmbedding,
}

/// Example boxes with their class ids
#[derive(Debug, Clone, PartialEq)]
pub struct VisualPrompt {
    pub boxes: Vec<BoundingBox>,
    pub class_ids: Vec<ClassId>,
    /// Image the boxes were drawn on; `None` means the inference target
    pub reference_image: Option<SharedImage>,
}

/// Prompt configuration consistent with the active inference mode
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PromptState {
    #[default]
    None,
    ClassList(ClassList),
    VisualPrompt(VisualPrompt),
}

impl PromptState {
    pub fn class_names(&self) -> Option<&[String]> {
        match self {
            PromptState::ClassList(list) => Some(&list.names),
            _ => None,
        }
    }

    pub fn visual_prompt(&self) -> Option<&VisualPrompt> {
        match self {
            PromptState::VisualPrompt(prompt) => Some(prompt),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, PromptState::None)
    }
}

/// Trim class names and require a non-empty list of non-empty names.
pub fn validate_class_names(class_names: &[String]) -> Result<Vec<String>, VisionError> {
    if class_names.is_empty() {
        return Err(VisionError::InvalidPrompt("Class names list cannot be empty".to_string()));
    }

    class_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                Err(VisionError::InvalidPrompt(format!("Class name at index {} is empty", i)))
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

/// Compute the embedding for `class_names` and install it on `model`.
///
/// `class_names` must already be validated.
pub fn bind_classes(model: &mut dyn DetectorModel, class_names: &[String]) -> Result<ClassList, VisionError> {
    let embedding = model.text_embedding(class_names)?;
    if embedding.rows() != class_names.len() {
        return Err(VisionError::Inference(format!(
            "text embedding has {} rows for {} classes",
            embedding.rows(),
            class_names.len()
        )));
    }

    model.set_classes(class_names, &embedding)?;
    debug!("Bound {} text classes", class_names.len());

    Ok(ClassList {
        names: class_names.to_vec(),
        embedding,
    })
}

/// Validate box/class-id pairs and normalize inverted boxes.
pub fn bind_visual_prompt(
    boxes: &[[f32; 4]],
    class_ids: &[ClassId],
    reference_image: Option<SharedImage>,
) -> Result<VisualPrompt, VisionError> {
    if boxes.len() != class_ids.len() {
        return Err(VisionError::InvalidPrompt(format!(
            "Length of bboxes ({}) must match length of cls ({})",
            boxes.len(),
            class_ids.len()
        )));
    }
    if boxes.is_empty() {
        return Err(VisionError::InvalidPrompt("Visual prompt needs at least one box".to_string()));
    }

    let boxes = boxes
        .iter()
        .map(|b| BoundingBox::from(*b).normalized())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VisualPrompt {
        boxes,
        class_ids: class_ids.to_vec(),
        reference_image,
    })
}

/// Parse the wire form of a visual prompt: `bboxes` as a JSON array of
/// 4-number arrays and `cls` as a JSON array of non-negative integers.
///
/// Malformed input is rejected as-is; no attempt is made to repair it.
pub fn parse_visual_prompt(bboxes: &str, cls: &str) -> Result<(Vec<[f32; 4]>, Vec<ClassId>), VisionError> {
    if bboxes.trim().is_empty() {
        return Err(VisionError::InvalidPrompt("bboxes parameter cannot be empty".to_string()));
    }
    if cls.trim().is_empty() {
        return Err(VisionError::InvalidPrompt("cls parameter cannot be empty".to_string()));
    }

    let boxes: Vec<[f32; 4]> = serde_json::from_str(bboxes).map_err(|e| {
        VisionError::InvalidPrompt(format!("bboxes must be a JSON array of [x1, y1, x2, y2] arrays: {}", e))
    })?;
    let raw_ids: Vec<i64> = serde_json::from_str(cls)
        .map_err(|e| VisionError::InvalidPrompt(format!("cls must be a JSON array of integers: {}", e)))?;

    let class_ids = raw_ids
        .into_iter()
        .map(|id| {
            ClassId::try_from(id).map_err(|_| {
                if id < 0 {
                    VisionError::InvalidPrompt(format!("class id {} must be a non-negative integer", id))
                } else {
                    VisionError::InvalidPrompt(format!("class id {} is out of range (max {})", id, ClassId::MAX))
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if boxes.len() != class_ids.len() {
        return Err(VisionError::InvalidPrompt(format!(
            "Length of bboxes ({}) must match length of cls ({})",
            boxes.len(),
            class_ids.len()
        )));
    }

    Ok((boxes, class_ids))
}
