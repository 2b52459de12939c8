//! Detector configuration. JSON file with per-section defaults, plus a few env overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "ATTACK_DETECTOR_CONFIG";
pub const BIND_ENV: &str = "ATTACK_DETECTOR_BIND";
pub const MODEL_DIR_ENV: &str = "ATTACK_DETECTOR_MODEL_DIR";
pub const STORE_SECRET_ENV: &str = "ATTACK_DETECTOR_STORE_SECRET";

pub const DEFAULT_STORE_SECRET: &str = "change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Directory holding `bundle_<version>.json` manifests and their artifacts
    pub model_dir: PathBuf,
    /// Threat store location (`threats.db`)
    pub data_dir: PathBuf,
    /// Daily CSV alert logs
    pub alerts_dir: PathBuf,
    pub server: ServerConfig,
    pub queue: QueueConfig,
    pub policy: PolicyConfig,
    pub query: QueryConfig,
    pub store: StoreConfig,
    /// Optional forwarding of confirmed threats to a remote collector
    pub forward: ForwardConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Intake buffer size; submissions beyond it are rejected
    pub capacity: usize,
    /// Upper bound for scoring one record in the worker
    pub inference_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Attack labels below this confidence are reported as BENIGN
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Seed for the payload encryption key
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            data_dir: PathBuf::from(".attack-detector"),
            alerts_dir: PathBuf::from("alerts"),
            server: ServerConfig::default(),
            queue: QueueConfig::default(),
            policy: PolicyConfig::default(),
            query: QueryConfig::default(),
            store: StoreConfig::default(),
            forward: ForwardConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5002".to_string(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            inference_timeout_ms: 2000,
        }
    }
}

impl QueueConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_millis(self.inference_timeout_ms)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_STORE_SECRET.to_string(),
        }
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_secs: 5,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl DetectorConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config path from `ATTACK_DETECTOR_CONFIG`, defaulting to `config.json`.
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.json"))
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var(BIND_ENV) {
            self.server.bind = bind;
        }
        if let Ok(dir) = std::env::var(MODEL_DIR_ENV) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Ok(secret) = std::env::var(STORE_SECRET_ENV) {
            self.store.secret = secret;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("threats.db")
    }
}
