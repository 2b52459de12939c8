//! Read access to recorded threats, independent of the pipeline.

use crate::config::QueryConfig;
use crate::error::PersistenceError;
use crate::policy::ThreatType;
use crate::storage::{ThreatQuery, ThreatRecord, ThreatStats, ThreatStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct ThreatQueryService {
    store: Arc<dyn ThreatStore>,
    config: QueryConfig,
}

impl ThreatQueryService {
    pub fn new(store: Arc<dyn ThreatStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    /// Newest first, at most `limit` (default from config, capped at `max_limit`).
    /// `attack_type` accepts either a training label (`SQLi`) or a display name.
    pub fn query(
        &self,
        limit: Option<usize>,
        attack_type: Option<&str>,
        ip: Option<&str>,
    ) -> Result<Vec<ThreatRecord>, PersistenceError> {
        let q = self.build(limit, attack_type, ip);
        self.store.find(&q)
    }

    pub fn stats(&self) -> Result<ThreatStats, PersistenceError> {
        self.store.stats()
    }

    fn build(&self, limit: Option<usize>, attack_type: Option<&str>, ip: Option<&str>) -> ThreatQuery {
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .min(self.config.max_limit);
        let threat_type = attack_type.filter(|s| !s.is_empty()).map(|s| {
            match ThreatType::from_label(s) {
                ThreatType::Unknown => s.to_string(),
                known => known.as_str().to_string(),
            }
        });
        ThreatQuery {
            limit,
            threat_type,
            ip: ip.filter(|s| !s.is_empty()).map(str::to_owned),
        }
    }
}
