//! Conversion of user-edited annotations into YOLO label files

use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One annotation as edited in the labelling UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationData {
    #[serde(default)]
    pub id: serde_json::Value,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, rename = "className", alias = "category_name")]
    pub class_name: Option<String>,
    #[serde(default)]
    pub original_class: Option<String>,
    #[serde(default)]
    pub user_label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl AnnotationData {
    /// User label wins over the detector class, which wins over the
    /// original class.
    pub fn effective_class_name(&self) -> Option<&str> {
        [&self.user_label, &self.class_name, &self.original_class]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|name| !name.is_empty())
    }
}

/// Single-image export request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportYoloRequest {
    pub annotations: Vec<AnnotationData>,
    pub image_width: i64,
    pub image_height: i64,
    pub class_name_to_id: HashMap<String, u32>,
    #[serde(default = "default_filename_base")]
    pub filename_base: String,
}

/// Annotations of one image inside a batch export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExportYoloRequestItem {
    pub annotations: Vec<AnnotationData>,
    pub image_width: i64,
    pub image_height: i64,
}

/// Batch export request keyed by the original image filename
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExportYoloRequest {
    pub images_data: BTreeMap<String, BatchExportYoloRequestItem>,
    pub class_name_to_id: HashMap<String, u32>,
    #[serde(default = "default_zip_filename_base")]
    pub zip_filename_base: String,
}

fn default_filename_base() -> String {
    "annotations".to_string()
}

fn default_zip_filename_base() -> String {
    "annotations_batch".to_string()
}

/// Render annotations as YOLO label lines `<id> <cx> <cy> <w> <h>`, all
/// normalized to [0, 1].
///
/// Returns an empty string for an empty list or non-positive image size.
/// Annotations with a missing or unmapped class name are skipped.
pub fn to_yolo_format(
    annotations: &[AnnotationData],
    image_width: i64,
    image_height: i64,
    class_name_to_id: &HashMap<String, u32>,
) -> String {
    if annotations.is_empty() || image_width <= 0 || image_height <= 0 {
        return String::new();
    }

    let (w, h) = (image_width as f64, image_height as f64);
    let mut lines = Vec::with_capacity(annotations.len());

    for ann in annotations {
        let Some(class_id) = ann.effective_class_name().and_then(|name| class_name_to_id.get(name)) else {
            warn!("Skipping annotation {} due to missing or unknown class name", ann.id);
            continue;
        };

        let values = [ann.x, ann.y, ann.width, ann.height];
        if values.iter().any(|v| !v.is_finite()) {
            warn!("Skipping annotation {} with non-finite geometry", ann.id);
            continue;
        }

        let cx = clamp_unit((ann.x + ann.width / 2.0) / w);
        let cy = clamp_unit((ann.y + ann.height / 2.0) / h);
        let nw = clamp_unit(ann.width / w);
        let nh = clamp_unit(ann.height / h);

        lines.push(format!("{} {:.6} {:.6} {:.6} {:.6}", class_id, cx, cy, nw, nh));
    }

    lines.join("\n")
}

/// Label file contents per image, keyed by `<image stem>.txt`.
pub fn batch_to_yolo_format(request: &BatchExportYoloRequest) -> BTreeMap<String, String> {
    request
        .images_data
        .iter()
        .map(|(filename, item)| {
            let stem = match filename.rsplit_once('.') {
                Some((stem, _)) => stem,
                None => filename.as_str(),
            };
            (
                format!("{}.txt", stem),
                to_yolo_format(&item.annotations, item.image_width, item.image_height, &request.class_name_to_id),
            )
        })
        .collect()
}

/// Deflate-compressed zip holding one `<image stem>.txt` label file per image.
pub fn batch_to_yolo_zip(request: &BatchExportYoloRequest) -> Result<Vec<u8>, VisionError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let files = batch_to_yolo_format(request);
    for (name, content) in &files {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(content.as_bytes())?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!("Packed {} label file(s) into {} byte archive", files.len(), bytes.len());
    Ok(bytes)
}

/// Replace anything outside `[A-Za-z0-9_-]` with `_`.
pub fn sanitize_filename(base: &str) -> String {
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}
