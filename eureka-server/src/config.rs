//! Server configuration loaded from `config.yaml`

use eureka_eye::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub models: ModelsSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Upper bound for a whole multipart request body
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSection {
    pub yoloe: YoloeModels,
    pub moondream: MoondreamModels,
}

/// Weight paths for the two YOLOE weight sets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoloeModels {
    #[serde(rename = "yoloe-seg")]
    pub seg: Option<String>,
    #[serde(rename = "yoloe-seg-pf")]
    pub seg_pf: Option<String>,
}

/// Captioning model settings. Parsed so shared config files load cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoondreamModels {
    pub model: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override host and port from `EUREKA_HOST` / `EUREKA_PORT`.
    pub fn apply_env(mut self) -> Self {
        if let Ok(host) = std::env::var("EUREKA_HOST") {
            if !host.trim().is_empty() {
                self.server.host = host.trim().to_string();
            }
        }

        if let Ok(port) = std::env::var("EUREKA_PORT") {
            match port.trim().parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!("Ignoring invalid EUREKA_PORT value '{}'", port),
            }
        }

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bad bind address {}:{}: {}", self.server.host, self.server.port, e)))
    }

    /// Detector settings with weight paths resolved against the filesystem
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig::from_model_paths(self.models.yoloe.seg.as_deref(), self.models.yoloe.seg_pf.as_deref())
    }
}
