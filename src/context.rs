//! Everything request handlers need, constructed once at startup and shared by reference.

use crate::alerts::{AlertForwarder, AlertLog, AlertSink};
use crate::config::{DetectorConfig, DEFAULT_STORE_SECRET};
use crate::error::StartupError;
use crate::model::{InferenceEngine, ModelBundle};
use crate::pipeline::{Detector, Scorer};
use crate::policy::DecisionPolicy;
use crate::query::ThreatQueryService;
use crate::storage::{SqliteThreatStore, ThreatStore};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DetectorContext {
    config: DetectorConfig,
    scorer: Arc<Scorer>,
    detector: Detector,
    queries: ThreatQueryService,
}

impl DetectorContext {
    /// Load the model bundle and open the threat store. Fails fast on any
    /// bundle inconsistency.
    pub fn build(config: DetectorConfig) -> Result<Self, StartupError> {
        let bundle = Arc::new(ModelBundle::load(&config.model_dir)?);

        std::fs::create_dir_all(&config.data_dir).map_err(|source| StartupError::Io {
            path: config.data_dir.clone(),
            source,
        })?;
        if config.store.secret == DEFAULT_STORE_SECRET {
            warn!("using default store secret; set ATTACK_DETECTOR_STORE_SECRET");
        }
        let store_path = config.store_path();
        let store = Arc::new(SqliteThreatStore::open(
            &store_path,
            config.store.secret.as_bytes(),
        )?);
        info!(path = %store_path.display(), "threat store opened");

        Ok(Self::from_parts(config, bundle, store))
    }

    /// Wire the pipeline around an already-loaded bundle and store.
    pub fn from_parts(
        config: DetectorConfig,
        bundle: Arc<ModelBundle>,
        store: Arc<dyn ThreatStore>,
    ) -> Self {
        let scorer = Arc::new(Scorer::new(
            InferenceEngine::new(bundle),
            DecisionPolicy::new(&config.policy),
        ));
        let forwarder = AlertForwarder::new(&config.forward);
        if let Some(f) = &forwarder {
            info!(url = %f.url(), "threat forwarding enabled");
        }
        let sink = Arc::new(AlertSink::new(
            AlertLog::new(config.alerts_dir.clone()),
            store.clone(),
            forwarder,
        ));
        let detector = Detector::new(scorer.clone(), sink, config.queue.clone());
        let queries = ThreatQueryService::new(store, config.query.clone());
        Self {
            config,
            scorer,
            detector,
            queries,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Arc<Scorer> {
        &self.scorer
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn queries(&self) -> &ThreatQueryService {
        &self.queries
    }

    pub fn model_version(&self) -> &str {
        self.scorer.engine().bundle().version()
    }
}
