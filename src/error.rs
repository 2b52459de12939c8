//! Error taxonomy for the scoring pipeline.
//!
//! Only [`ModelConfigError`] and [`ConfigError`] are fatal, and only at startup.
//! Everything else fails a single item (or a single write) and is logged.

use std::path::PathBuf;
use thiserror::Error;

/// Request record could not be turned into a feature vector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("malformed ip address: {0:?}")]
    MalformedIp(String),
    #[error("precomputed feature missing: {0}")]
    MissingFeature(String),
}

/// Model bundle could not be selected or loaded.
#[derive(Debug, Error)]
pub enum ModelConfigError {
    #[error("no model bundle found in {0}")]
    NoBundle(PathBuf),
    #[error("bundle {version} is incomplete: missing {missing}")]
    IncompleteBundle { version: String, missing: String },
    #[error("bundle {expected}: artifact {artifact} carries version {found}")]
    VersionMismatch {
        expected: String,
        artifact: String,
        found: String,
    },
    #[error("bundle {version}: checksum mismatch for {artifact}")]
    ChecksumMismatch { version: String, artifact: String },
    #[error("bundle {version}: feature order does not match extractor ({detail})")]
    FeatureOrder { version: String, detail: String },
    #[error("bundle {version}: shape mismatch ({detail})")]
    Shape { version: String, detail: String },
    #[error("unsupported classifier format {0:?}")]
    UnsupportedFormat(String),
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("classifier backend: {0}")]
    Backend(String),
}

/// Scaler/classifier disagreement discovered while scoring one item.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature count mismatch: expected {expected}, got {got}")]
    FeatureCount { expected: usize, got: usize },
    #[error("class count mismatch: decoder has {expected}, classifier produced {got}")]
    ClassCount { expected: usize, got: usize },
    #[error("classifier backend: {0}")]
    Backend(String),
}

/// Alert log, threat store or forwarder write failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("alert log: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload encryption failed")]
    Crypto,
    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("forward: {0}")]
    Forward(String),
}

/// Submission to the intake queue was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IntakeError {
    #[error("detector is not running")]
    NotRunning,
    #[error("intake queue is full")]
    QueueFull,
    #[error("detector is already running")]
    AlreadyRunning,
}

/// Scoring of a single record failed.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("inference exceeded {0:?}")]
    Timeout(std::time::Duration),
    #[error("scoring task failed: {0}")]
    Task(String),
}

/// Configuration file present but unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Anything that prevents the detector from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelConfigError),
    #[error(transparent)]
    Store(#[from] PersistenceError),
    #[error("preparing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
