//! eureka-server: HTTP front end for the EurekAnno vision service
//!
//! Exposes the prompt-free, text-prompted and image-prompted detection
//! endpoints plus YOLO label export. The detector backend is supplied by the
//! embedding binary through [`eureka_eye::ModelLoader`].

pub mod config;
pub mod error;
pub mod http;
pub mod startup;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ErrorResponse};
pub use http::{create_router, AppState, DetectResponse, HealthResponse};
pub use startup::{build_detector, init_tracing, serve};
