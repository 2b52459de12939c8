//! Attack detector: real-time threat scoring for HTTP request metadata.
//!
//! Modular structure:
//! - [`features`] - Deterministic request → feature vector extraction
//! - [`model`] - Versioned model bundle (classifier, scaler, label decoder) and inference
//! - [`policy`] - Confidence threshold decision policy
//! - [`pipeline`] - Bounded intake queue and single scoring worker
//! - [`alerts`] - Daily CSV alert log, threat store writes, optional forwarding
//! - [`storage`] - Encrypted, indexed SQLite threat store
//! - [`query`] - Filtered, newest-first threat lookups
//! - [`api`] - HTTP boundary
//! - [`logging`] - Structured JSON logging

pub mod alerts;
pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod policy;
pub mod query;
pub mod storage;

pub use config::DetectorConfig;
pub use context::DetectorContext;
pub use features::{FeatureExtractor, FeatureVector, RequestRecord};
pub use logging::StructuredLogger;
pub use model::{InferenceEngine, ModelBundle};
pub use pipeline::{Detector, Scorer};
pub use policy::{DecisionPolicy, Prediction, ThreatType};
pub use query::ThreatQueryService;
pub use storage::{SqliteThreatStore, ThreatRecord, ThreatStore};
