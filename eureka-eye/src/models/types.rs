//! Detector output types shared by every backend

use crate::error::VisionError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

pub type ClassId = u32;

/// Ordered polygon vertices `(x, y)` in pixel coordinates
pub type Polygon = Vec<[f32; 2]>;

/// Decoded image shared between the caller, the detector and its results
pub type SharedImage = Arc<RgbImage>;

/// Axis-aligned box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Swap inverted corners so that `x1 <= x2` and `y1 <= y2`.
    ///
    /// Fails on non-finite coordinates and on boxes with zero width or
    /// height, which cannot describe an example region.
    pub fn normalized(self) -> Result<Self, VisionError> {
        let coords = self.to_array();
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(VisionError::InvalidPrompt(format!(
                "box {:?} contains non-finite coordinates",
                coords
            )));
        }

        let normalized = Self {
            x1: self.x1.min(self.x2),
            y1: self.y1.min(self.y2),
            x2: self.x1.max(self.x2),
            y2: self.y1.max(self.y2),
        };

        if normalized.width() <= 0.0 || normalized.height() <= 0.0 {
            return Err(VisionError::InvalidPrompt(format!(
                "box {:?} has zero width or height",
                coords
            )));
        }

        Ok(normalized)
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.to_array()
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: ClassId,
    pub confidence: f32,
    pub bbox: BoundingBox,
    /// Segmentation outline, absent for box-only detectors
    pub mask: Option<Polygon>,
}

/// Detector output for a single image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detections: Vec<Detection>,
    /// id -> name table of the model that produced this result
    pub names: BTreeMap<ClassId, String>,
    /// Source image (width, height)
    pub image_size: (u32, u32),
    /// Image the detections refer to; attached by the detector facade
    #[serde(skip)]
    pub image: Option<SharedImage>,
}

impl DetectionResult {
    pub fn new(detections: Vec<Detection>, names: BTreeMap<ClassId, String>, image_size: (u32, u32)) -> Self {
        Self {
            detections,
            names,
            image_size,
            image: None,
        }
    }

    /// Resolve a class id through the name table, never failing.
    pub fn class_name(&self, class_id: ClassId) -> Cow<'_, str> {
        match self.names.get(&class_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("class_{}", class_id)),
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Conditioning representation derived from a class list, one row per class
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextEmbedding(pub Vec<Vec<f32>>);

impl TextEmbedding {
    pub fn rows(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_swaps_inverted_corners() {
        let b = BoundingBox::new(50.0, 10.0, 10.0, 50.0).normalized().unwrap();
        assert_eq!(b.to_array(), [10.0, 10.0, 50.0, 50.0]);

        let b = BoundingBox::new(10.0, 60.0, 40.0, 20.0).normalized().unwrap();
        assert_eq!(b.to_array(), [10.0, 20.0, 40.0, 60.0]);
    }

    #[test]
    fn test_normalized_rejects_degenerate() {
        assert!(BoundingBox::new(10.0, 10.0, 10.0, 50.0).normalized().is_err());
        assert!(BoundingBox::new(10.0, 10.0, 50.0, 10.0).normalized().is_err());
        assert!(BoundingBox::new(f32::NAN, 10.0, 50.0, 50.0).normalized().is_err());
        assert!(BoundingBox::new(0.0, 0.0, f32::INFINITY, 50.0).normalized().is_err());
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let json = serde_json::to_string(&BoundingBox::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let b: BoundingBox = serde_json::from_str("[5,6,7,8]").unwrap();
        assert_eq!(b, BoundingBox::new(5.0, 6.0, 7.0, 8.0));
    }

    #[test]
    fn test_class_name_fallback() {
        let mut names = BTreeMap::new();
        names.insert(0, "person".to_string());
        let result = DetectionResult::new(vec![], names, (640, 480));
        assert_eq!(result.class_name(0), "person");
        assert_eq!(result.class_name(17), "class_17");
    }
}
