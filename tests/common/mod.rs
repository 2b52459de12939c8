//! Shared fixtures: a small, fully consistent model bundle and request records.

#![allow(dead_code)]

use attack_detector::config::DetectorConfig;
use attack_detector::error::InferenceError;
use attack_detector::features::{RequestRecord, FEATURE_COUNT, FEATURE_NAMES};
use attack_detector::model::{Classifier, ForestClassifier, LabelDecoder, StandardScaler};
use attack_detector::storage::{SqliteThreatStore, ThreatStore};
use attack_detector::{DetectorContext, ModelBundle};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const VERSION: &str = "20250101_000000";
pub const CLASSES: [&str; 5] = ["BruteForce", "PortScan", "SQLi", "XSS", "benign"];

const HAS_SQL: usize = 12;
const HAS_SCRIPT: usize = 13;
const TIME_SINCE_LAST: usize = 10;

/// has_sql → SQLi (0.95), else has_script → XSS (0.9), else a burst of
/// requests → weak BruteForce (0.45), else benign (0.9).
pub fn forest_json(version: &str) -> Value {
    json!({
        "version": version,
        "n_features": FEATURE_COUNT,
        "n_classes": CLASSES.len(),
        "trees": [{
            "nodes": [
                {"feature": HAS_SQL, "threshold": 0.5, "left": 1, "right": 6},
                {"feature": HAS_SCRIPT, "threshold": 0.5, "left": 2, "right": 5},
                {"feature": TIME_SINCE_LAST, "threshold": 1.0, "left": 3, "right": 4},
                {"value": [0.45, 0.2, 0.1, 0.1, 0.15]},
                {"value": [0.05, 0.05, 0.0, 0.0, 0.9]},
                {"value": [0.0, 0.0, 0.1, 0.9, 0.0]},
                {"value": [0.05, 0.0, 0.95, 0.0, 0.0]}
            ]
        }]
    })
}

pub fn scaler_json(version: &str) -> Value {
    json!({
        "version": version,
        "mean": vec![0.0; FEATURE_COUNT],
        "scale": vec![1.0; FEATURE_COUNT],
    })
}

pub fn labels_json(version: &str) -> Value {
    json!({ "version": version, "classes": CLASSES })
}

fn write(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Bare artifact triple, no manifest.
pub fn write_triple(dir: &Path, version: &str) {
    write(&dir.join(format!("classifier_{version}.json")), &forest_json(version));
    write(&dir.join(format!("scaler_{version}.json")), &scaler_json(version));
    write(&dir.join(format!("label_encoder_{version}.json")), &labels_json(version));
}

/// Artifact triple plus `bundle_<version>.json`.
pub fn write_bundle(dir: &Path, version: &str) {
    write_triple(dir, version);
    write(
        &dir.join(format!("bundle_{version}.json")),
        &json!({
            "version": version,
            "feature_names": FEATURE_NAMES,
            "classifier": {"path": format!("classifier_{version}.json"), "format": "forest"},
            "scaler": {"path": format!("scaler_{version}.json")},
            "label_decoder": {"path": format!("label_encoder_{version}.json")},
        }),
    );
}

pub fn bundle() -> Arc<ModelBundle> {
    let dir = tempfile::tempdir().unwrap();
    write_bundle(dir.path(), VERSION);
    Arc::new(ModelBundle::load(dir.path()).unwrap())
}

/// Context over the fixture bundle, an in-memory store and `alerts_dir`.
pub fn context(alerts_dir: &Path) -> (DetectorContext, Arc<dyn ThreatStore>) {
    let mut config = DetectorConfig::default();
    config.alerts_dir = alerts_dir.to_path_buf();
    context_with(config)
}

pub fn context_with(config: DetectorConfig) -> (DetectorContext, Arc<dyn ThreatStore>) {
    context_with_bundle(config, bundle())
}

pub fn context_with_bundle(
    config: DetectorConfig,
    bundle: Arc<ModelBundle>,
) -> (DetectorContext, Arc<dyn ThreatStore>) {
    let store: Arc<dyn ThreatStore> =
        Arc::new(SqliteThreatStore::open_in_memory(b"test-secret").unwrap());
    let ctx = DetectorContext::from_parts(config, bundle, store.clone());
    (ctx, store)
}

/// Fixture forest that sleeps before answering for inputs with `has_sql` set,
/// and counts how many predictions have started.
pub struct SlowClassifier {
    inner: ForestClassifier,
    delay: Duration,
    pub started: Arc<AtomicUsize>,
}

impl Classifier for SlowClassifier {
    fn n_features(&self) -> usize {
        self.inner.n_features()
    }

    fn n_classes(&self) -> usize {
        self.inner.n_classes()
    }

    fn predict_proba(&self, scaled: &[f32]) -> Result<Vec<f32>, InferenceError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if scaled[HAS_SQL] > 0.5 {
            std::thread::sleep(self.delay);
        }
        self.inner.predict_proba(scaled)
    }
}

/// Fixture bundle whose SQLi-looking inputs take `delay` to score.
/// Returns the bundle and the started-predictions counter.
pub fn slow_bundle(delay: Duration) -> (Arc<ModelBundle>, Arc<AtomicUsize>) {
    let started = Arc::new(AtomicUsize::new(0));
    let classifier = SlowClassifier {
        inner: serde_json::from_value(forest_json(VERSION)).unwrap(),
        delay,
        started: started.clone(),
    };
    let bundle = ModelBundle::from_parts(
        VERSION.to_string(),
        Box::new(classifier),
        serde_json::from_value::<StandardScaler>(scaler_json(VERSION)).unwrap(),
        serde_json::from_value::<LabelDecoder>(labels_json(VERSION)).unwrap(),
    )
    .unwrap();
    (Arc::new(bundle), started)
}

pub fn record(value: Value) -> RequestRecord {
    serde_json::from_value(value).unwrap()
}

pub fn sqli() -> RequestRecord {
    record(json!({
        "email": "admin@example.com",
        "password": "' OR 1=1 --",
        "method": "POST",
        "endpoint": "/api/login",
        "user_agent": "Mozilla/5.0",
        "ip": "192.168.1.10",
        "time_since_last": 30.0
    }))
}

pub fn xss() -> RequestRecord {
    record(json!({
        "email": "visitor@yahoo.com",
        "password": "<script>alert(1)</script>",
        "method": "POST",
        "endpoint": "/api/login",
        "ip": "10.0.0.7",
        "time_since_last": 45.0
    }))
}

pub fn benign() -> RequestRecord {
    record(json!({
        "email": "alice@gmail.com",
        "password": "hunter2!Secret",
        "method": "POST",
        "endpoint": "/api/login",
        "user_agent": "Mozilla/5.0",
        "ip": "172.16.0.4",
        "time_since_last": 600.0
    }))
}

/// Rapid retry with an ordinary password: the model leans BruteForce but below threshold.
pub fn burst() -> RequestRecord {
    record(json!({
        "email": "alice@gmail.com",
        "password": "hunter2!Secret",
        "method": "POST",
        "endpoint": "/api/login",
        "ip": "172.16.0.4",
        "time_since_last": 0.2
    }))
}
