//! Property-based tests for summary shape and box normalization

use eureka_eye::processing::summarize;
use eureka_eye::{BoundingBox, Detection, DetectionResult};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn detection_strategy() -> impl Strategy<Value = Detection> {
    (
        0u32..5,
        0.0f32..=1.0,
        (0.0f32..100.0, 0.0f32..100.0, 1.0f32..50.0, 1.0f32..50.0),
        any::<bool>(),
    )
        .prop_map(|(class_id, confidence, (x, y, w, h), with_mask)| Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(x, y, x + w, y + h),
            mask: with_mask.then(|| vec![[x, y], [x + w, y], [x + w, y + h]]),
        })
}

fn result_strategy() -> impl Strategy<Value = DetectionResult> {
    prop::collection::vec(detection_strategy(), 0..6).prop_map(|detections| {
        let names = BTreeMap::from([(0, "person".to_string()), (1, "car".to_string())]);
        DetectionResult::new(detections, names, (128, 128))
    })
}

proptest! {
    #[test]
    fn prop_summary_sequences_stay_aligned(results in prop::collection::vec(result_strategy(), 0..5)) {
        let summary = summarize(&results);
        let total: usize = results.iter().map(DetectionResult::len).sum();

        prop_assert_eq!(summary.class.len(), total);
        prop_assert_eq!(summary.confidence.len(), total);
        prop_assert_eq!(summary.bbox.len(), total);
        prop_assert_eq!(summary.masks.len(), total);

        let flat: Vec<&Detection> = results.iter().flat_map(|r| r.detections.iter()).collect();
        for (i, det) in flat.iter().enumerate() {
            prop_assert_eq!(summary.bbox[i], det.bbox.to_array());
            prop_assert_eq!(summary.confidence[i], det.confidence);
            prop_assert_eq!(summary.masks[i].is_some(), det.mask.is_some());
        }
    }

    #[test]
    fn prop_normalized_box_is_ordered(
        x1 in -500.0f32..500.0,
        y1 in -500.0f32..500.0,
        x2 in -500.0f32..500.0,
        y2 in -500.0f32..500.0,
    ) {
        match BoundingBox::new(x1, y1, x2, y2).normalized() {
            Ok(b) => {
                prop_assert!(b.x1 < b.x2);
                prop_assert!(b.y1 < b.y2);
                prop_assert_eq!(b.x1, x1.min(x2));
                prop_assert_eq!(b.y2, y1.max(y2));
            }
            Err(_) => prop_assert!(x1 == x2 || y1 == y2),
        }
    }
}
