//! HTTP API over the shared YOLOE detector

use crate::error::ApiError;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use eureka_eye::export::{batch_to_yolo_zip, sanitize_filename, to_yolo_format, BatchExportYoloRequest, ExportYoloRequest};
use eureka_eye::processing::{rasterize_mask, summarize};
use eureka_eye::{
    decode_image, DetectionOutput, DetectionResult, DetectorConfig, ModelLoader, NormalizedSummary, PredictOptions,
    VisionError, WeightSelection, YoloeDetector,
};
use image::{DynamicImage, ImageFormat};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Detector built from the server configuration
    pub detector: Arc<YoloeDetector>,
    base_config: DetectorConfig,
    loader: Arc<dyn ModelLoader>,
    custom: Arc<Mutex<HashMap<PathBuf, Arc<YoloeDetector>>>>,
}

impl AppState {
    pub fn new(detector: Arc<YoloeDetector>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            base_config: detector.config(),
            detector,
            loader,
            custom: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Detector serving a request's `model_path`.
    ///
    /// Custom weight files get a detector of their own, loaded on first use
    /// and kept for later requests. Blocks while weights load.
    pub fn detector_for(&self, weights: &WeightSelection) -> Result<Arc<YoloeDetector>, VisionError> {
        let path = match weights {
            WeightSelection::Custom(path) if self.base_config.weights != *weights => path,
            _ => return Ok(self.detector.clone()),
        };

        if let Some(detector) = self.custom.lock().get(path) {
            return Ok(detector.clone());
        }

        let config = DetectorConfig {
            weights: weights.clone(),
            ..self.base_config.clone()
        };
        let detector = Arc::new(YoloeDetector::new(self.loader.clone(), config)?);
        info!("Loaded per-request weights {:?}", path);

        // A concurrent request may have loaded the same file; keep the first.
        Ok(self.custom.lock().entry(path.clone()).or_insert(detector).clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Body of every detection endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectResponse {
    pub results: NormalizedSummary,
    /// Base64 PNG of the first image with detections drawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_image: Option<String>,
    /// Base64 PNG binary masks of the first image, one per masked detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_masks: Option<Vec<String>>,
}

/// Create HTTP router with all API routes
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/yoloe/prompt-free", post(prompt_free_handler))
        .route("/api/v1/yoloe/text-prompt", post(text_prompt_handler))
        .route("/api/v1/yoloe/image-prompt", post(image_prompt_handler))
        .route("/api/v1/yoloe/export/yolo", post(export_yolo_handler))
        .route("/api/v1/yoloe/export/yolo-batch", post(export_yolo_batch_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Multipart fields of a detection request
#[derive(Debug, Default)]
struct DetectForm {
    file: Option<Vec<u8>>,
    refer_file: Option<Vec<u8>>,
    fields: HashMap<String, Vec<String>>,
}

impl DetectForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = DetectForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" | "refer_file" => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", name, e)))?;
                    if name == "file" {
                        form.file = Some(data.to_vec());
                    } else {
                        form.refer_file = Some(data.to_vec());
                    }
                }
                _ => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read field {}: {}", name, e)))?;
                    form.fields.entry(name).or_default().push(text);
                }
            }
        }

        Ok(form)
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|values| values.first()).map(String::as_str)
    }

    fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    fn take_file(&mut self) -> Result<Vec<u8>, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::bad_request("Missing required file field 'file'"))
    }

    fn params(&self) -> Result<DetectParams, ApiError> {
        Ok(DetectParams {
            conf: self.parse_f32("conf")?,
            iou: self.parse_f32("iou")?,
            return_image: self.parse_bool("return_image")?.unwrap_or(false),
            retina_masks: self.parse_bool("retina_masks")?.unwrap_or(false),
            weights: WeightSelection::from_model_path(self.first("model_path").unwrap_or_default()),
        })
    }

    fn parse_f32(&self, name: &str) -> Result<Option<f32>, ApiError> {
        match self.first(name).map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(value) => value
                .parse::<f32>()
                .map(Some)
                .map_err(|_| ApiError::bad_request(format!("Field '{}' must be a number, got '{}'", name, value))),
        }
    }

    fn parse_bool(&self, name: &str) -> Result<Option<bool>, ApiError> {
        match self.first(name).map(|v| v.trim().to_ascii_lowercase()) {
            None => Ok(None),
            Some(v) if v == "true" || v == "1" => Ok(Some(true)),
            Some(v) if v == "false" || v == "0" => Ok(Some(false)),
            Some(v) => Err(ApiError::bad_request(format!("Field '{}' must be a boolean, got '{}'", name, v))),
        }
    }
}

#[derive(Debug, Clone)]
struct DetectParams {
    conf: Option<f32>,
    iou: Option<f32>,
    return_image: bool,
    retina_masks: bool,
    weights: WeightSelection,
}

impl DetectParams {
    /// Raw-result options so the first result can still be rendered
    fn options(&self, detector: &YoloeDetector) -> PredictOptions {
        let mut opts = detector.default_options().raw();
        if let Some(conf) = self.conf {
            opts.conf = conf;
        }
        if let Some(iou) = self.iou {
            opts.iou = iou;
        }
        opts.retina_masks = self.retina_masks;
        opts
    }
}

/// Split `class_names`: repeated fields are taken as-is, a single field is
/// treated as a comma-separated list.
fn collect_class_names(values: &[String]) -> Vec<String> {
    let raw: Vec<&str> = match values {
        [single] => single.split(',').collect(),
        many => many.iter().map(String::as_str).collect(),
    };
    raw.into_iter()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn encode_png_base64(image: &DynamicImage) -> Result<String, VisionError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(STANDARD.encode(buffer.into_inner()))
}

/// Masks of `result` as base64 PNGs at its image size; `None` when no
/// detection carries a mask.
fn encode_masks(result: &DetectionResult) -> Result<Option<Vec<String>>, VisionError> {
    let masks = result
        .detections
        .iter()
        .filter_map(|detection| detection.mask.as_ref())
        .map(|polygon| encode_png_base64(&DynamicImage::ImageLuma8(rasterize_mask(polygon, result.image_size))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if masks.is_empty() { None } else { Some(masks) })
}

fn build_response(
    detector: &YoloeDetector,
    output: DetectionOutput,
    params: &DetectParams,
) -> Result<DetectResponse, VisionError> {
    let results = match output {
        DetectionOutput::Raw(results) => results,
        DetectionOutput::Summary(summary) => {
            return Ok(DetectResponse {
                results: summary,
                annotated_image: None,
                segmentation_masks: None,
            })
        }
    };

    let Some(first) = results.first() else {
        return Ok(DetectResponse {
            results: summarize(&results),
            annotated_image: None,
            segmentation_masks: None,
        });
    };

    let annotated_image = if params.return_image {
        let rendered = detector.visualize(&results, 0, None)?;
        Some(encode_png_base64(&DynamicImage::ImageRgb8(rendered))?)
    } else {
        None
    };

    let segmentation_masks = if params.retina_masks {
        encode_masks(first)?
    } else {
        None
    };

    Ok(DetectResponse {
        results: summarize(&results),
        annotated_image,
        segmentation_masks,
    })
}

/// Run blocking detector work off the async runtime.
async fn run_blocking<F>(task: F) -> Result<DetectResponse, ApiError>
where
    F: FnOnce() -> Result<DetectResponse, VisionError> + Send + 'static,
{
    let response = tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))??;
    Ok(response)
}

async fn prompt_free_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let mut form = DetectForm::read(multipart).await?;
    let file = form.take_file()?;
    let params = form.params()?;

    let response = run_blocking(move || {
        let detector = state.detector_for(&params.weights)?;
        let image = decode_image(&file)?;
        let output = detector.detect_prompt_free(&[image], params.options(&detector))?;
        build_response(&detector, output, &params)
    })
    .await?;

    info!("Prompt-free detection returned {} object(s)", response.results.len());
    Ok(Json(response))
}

async fn text_prompt_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let mut form = DetectForm::read(multipart).await?;
    let file = form.take_file()?;
    let params = form.params()?;
    let class_names = collect_class_names(form.all("class_names"));

    let response = run_blocking(move || {
        let detector = state.detector_for(&params.weights)?;
        let image = decode_image(&file)?;
        let output = detector.detect_with_text(&[image], &class_names, params.options(&detector))?;
        build_response(&detector, output, &params)
    })
    .await?;

    info!("Text-prompted detection returned {} object(s)", response.results.len());
    Ok(Json(response))
}

async fn image_prompt_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let mut form = DetectForm::read(multipart).await?;
    let file = form.take_file()?;
    let params = form.params()?;
    let (boxes, class_ids) = eureka_eye::processing::prompt::parse_visual_prompt(
        form.first("bboxes").unwrap_or_default(),
        form.first("cls").unwrap_or_default(),
    )?;
    let refer_file = form.refer_file.take().filter(|bytes| !bytes.is_empty());

    let response = run_blocking(move || {
        let detector = state.detector_for(&params.weights)?;
        let image = decode_image(&file)?;
        let reference = refer_file.as_deref().map(decode_image).transpose()?;
        let output =
            detector.detect_with_visual_prompt(&[image], &boxes, &class_ids, reference, params.options(&detector))?;
        build_response(&detector, output, &params)
    })
    .await?;

    info!("Image-prompted detection returned {} object(s)", response.results.len());
    Ok(Json(response))
}

async fn export_yolo_handler(Json(request): Json<ExportYoloRequest>) -> Response {
    let content = to_yolo_format(
        &request.annotations,
        request.image_width,
        request.image_height,
        &request.class_name_to_id,
    );
    let filename = format!("{}.txt", sanitize_filename(&request.filename_base));
    debug!("Exporting {} annotation(s) to {}", request.annotations.len(), filename);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        content,
    )
        .into_response()
}

async fn export_yolo_batch_handler(Json(request): Json<BatchExportYoloRequest>) -> Result<Response, ApiError> {
    let archive = batch_to_yolo_zip(&request)?;
    let filename = format!("{}.zip", sanitize_filename(&request.zip_filename_base));
    debug!("Exporting labels for {} image(s) to {}", request.images_data.len(), filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        archive,
    )
        .into_response())
}
