//! Flattening of per-image detector output into parallel arrays

use crate::models::{DetectionResult, Polygon};
use serde::{Deserialize, Serialize};

/// All detections of a batch as four index-aligned sequences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSummary {
    pub class: Vec<String>,
    pub confidence: Vec<f32>,
    pub bbox: Vec<[f32; 4]>,
    /// `None` where the detector produced no segmentation
    pub masks: Vec<Option<Polygon>>,
}

impl NormalizedSummary {
    pub fn len(&self) -> usize {
        self.class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class.is_empty()
    }

    fn push(&mut self, class: String, confidence: f32, bbox: [f32; 4], mask: Option<Polygon>) {
        self.class.push(class);
        self.confidence.push(confidence);
        self.bbox.push(bbox);
        self.masks.push(mask);
    }
}

/// Merge every detection of every image, in input order.
pub fn summarize(results: &[DetectionResult]) -> NormalizedSummary {
    let total = results.iter().map(DetectionResult::len).sum();
    let mut summary = NormalizedSummary {
        class: Vec::with_capacity(total),
        confidence: Vec::with_capacity(total),
        bbox: Vec::with_capacity(total),
        masks: Vec::with_capacity(total),
    };

    for result in results {
        for detection in &result.detections {
            summary.push(
                result.class_name(detection.class_id).into_owned(),
                detection.confidence,
                detection.bbox.to_array(),
                detection.mask.clone(),
            );
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, Detection};
    use std::collections::BTreeMap;

    fn detection(class_id: u32, confidence: f32, mask: Option<Polygon>) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(10.0, 10.0, 50.0, 50.0),
            mask,
        }
    }

    #[test]
    fn test_summarize_person_stub() {
        let mut names = BTreeMap::new();
        names.insert(0, "person".to_string());
        let result = DetectionResult::new(vec![detection(0, 0.87, None)], names, (100, 100));

        let summary = summarize(&[result]);
        assert_eq!(summary.class, vec!["person"]);
        assert_eq!(summary.confidence, vec![0.87]);
        assert_eq!(summary.bbox, vec![[10.0, 10.0, 50.0, 50.0]]);
        assert_eq!(summary.masks, vec![None]);

        let text = serde_json::to_string(&summary).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "class": ["person"],
                "confidence": [0.87],
                "bbox": [[10.0, 10.0, 50.0, 50.0]],
                "masks": [null],
            })
        );
    }

    #[test]
    fn test_summarize_mixed_masks_and_unknown_ids() {
        let mut names = BTreeMap::new();
        names.insert(1, "cat".to_string());
        let first = DetectionResult::new(
            vec![
                detection(1, 0.9, Some(vec![[0.0, 0.0], [4.0, 0.0], [4.0, 4.0]])),
                detection(7, 0.4, None),
            ],
            names,
            (64, 64),
        );
        let second = DetectionResult::new(vec![detection(2, 0.5, None)], BTreeMap::new(), (64, 64));

        let summary = summarize(&[first, second]);
        assert_eq!(summary.class, vec!["cat", "class_7", "class_2"]);
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.masks.len(), 3);
        assert!(summary.masks[0].is_some());
        assert!(summary.masks[1].is_none());
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert!(summary.is_empty());
        let summary = summarize(&[DetectionResult::default()]);
        assert!(summary.is_empty());
        assert_eq!(summary.masks.len(), 0);
    }
}
