use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::face_detection::model_mtcnn::MtcnnConfig;

/// Environment variable naming the YAML config file.
pub const CONFIG_PATH_VAR: &str = "FACE_DETECTION_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "service.yaml";
pub const ENV_PREFIX: &str = "FACE_DETECTION_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] figment::Error),

    #[error("detect_min_size must be positive")]
    ZeroMinSize,

    #[error("scale_factor must be in (0, 1), got {0}")]
    InvalidFactor(f32),

    #[error("thresholds must be in [0, 1], got {0:?}")]
    InvalidThresholds([f32; 3]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub detect_min_size: u32,
    pub scale_factor: f32,
    pub thresholds: [f32; 3],
    pub model_dir: PathBuf,
    pub bind_address: SocketAddr,
    pub request_timeout_secs: u64,
    pub inference_threads: i16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let detector = MtcnnConfig::default();
        Self {
            detect_min_size: detector.min_size,
            scale_factor: detector.factor,
            thresholds: detector.thresholds,
            model_dir: PathBuf::from("models"),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout_secs: 30,
            inference_threads: 1,
        }
    }
}

impl ServiceConfig {
    /// Defaults, then the YAML file named by `FACE_DETECTION_CONFIG` (or
    /// `service.yaml`), then `FACE_DETECTION_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_figment(
            Figment::from(Serialized::defaults(ServiceConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"])),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: ServiceConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.detect_min_size == 0 {
            return Err(ConfigError::ZeroMinSize);
        }
        if !(self.scale_factor > 0.0 && self.scale_factor < 1.0) {
            return Err(ConfigError::InvalidFactor(self.scale_factor));
        }
        if self.thresholds.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err(ConfigError::InvalidThresholds(self.thresholds));
        }
        Ok(())
    }

    pub fn detector(&self) -> MtcnnConfig {
        MtcnnConfig {
            min_size: self.detect_min_size,
            factor: self.scale_factor,
            thresholds: self.thresholds,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
