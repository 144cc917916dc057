//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use eureka_eye::VisionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Vision(#[from] VisionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Vision(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Vision(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Vision(e) => match e {
                VisionError::InvalidPrompt(_) => "INVALID_PROMPT",
                VisionError::InvalidMode(_) => "INVALID_MODE",
                VisionError::InvalidImage(_) => "INVALID_IMAGE",
                VisionError::InvalidThreshold { .. } => "INVALID_THRESHOLD",
                VisionError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
                VisionError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
                VisionError::Inference(_) => "INFERENCE_ERROR",
                VisionError::Config(_) => "CONFIG_ERROR",
                VisionError::Archive(_) => "EXPORT_ERROR",
                VisionError::Io(_) | VisionError::Image(_) => "INTERNAL_ERROR",
            },
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
