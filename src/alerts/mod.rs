//! Durable recording of confirmed threats.
//!
//! Each alert is written to the daily CSV log and to the threat store, and
//! optionally forwarded. The writes are independent: any of them may fail
//! without affecting the others, and failures are only logged.

mod forward;
mod log;

pub use self::forward::AlertForwarder;
pub use self::log::{AlertLog, HEADER as ALERT_LOG_HEADER};

use crate::features::RequestRecord;
use crate::policy::Prediction;
use crate::storage::{ThreatRecord, ThreatStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, warn};

/// Outcome of each independent write for one alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertAck {
    pub threat_id: String,
    pub logged: bool,
    pub stored: bool,
    /// `None` when forwarding is not configured
    pub forwarded: Option<bool>,
}

pub struct AlertSink {
    log: AlertLog,
    store: Arc<dyn ThreatStore>,
    forwarder: Option<AlertForwarder>,
}

impl AlertSink {
    pub fn new(log: AlertLog, store: Arc<dyn ThreatStore>, forwarder: Option<AlertForwarder>) -> Self {
        Self {
            log,
            store,
            forwarder,
        }
    }

    /// Append to the alert log and insert into the store. Blocking.
    pub fn write_local(&self, threat: &ThreatRecord) -> AlertAck {
        let logged = match self.log.append(threat) {
            Ok(()) => true,
            Err(e) => {
                error!(threat_id = %threat.id, error = %e, "alert log write failed");
                false
            }
        };
        let stored = match self.store.insert(threat) {
            Ok(()) => true,
            Err(e) => {
                error!(threat_id = %threat.id, error = %e, "threat store insert failed");
                false
            }
        };
        AlertAck {
            threat_id: threat.id.clone(),
            logged,
            stored,
            forwarded: None,
        }
    }

    /// Record a non-benign verdict. Local writes run on the blocking pool.
    pub async fn record(self: Arc<Self>, request: &RequestRecord, prediction: &Prediction) -> AlertAck {
        let threat = ThreatRecord::new(request, prediction, Utc::now());
        warn!(
            ip = threat.ip.as_deref().unwrap_or("-"),
            threat_type = %threat.threat_type,
            probability = threat.probability,
            "attack detected"
        );

        let sink = self.clone();
        let local = threat.clone();
        let mut ack = match tokio::task::spawn_blocking(move || sink.write_local(&local)).await {
            Ok(ack) => ack,
            Err(e) => {
                error!(threat_id = %threat.id, error = %e, "alert write task failed");
                AlertAck {
                    threat_id: threat.id.clone(),
                    logged: false,
                    stored: false,
                    forwarded: None,
                }
            }
        };

        if let Some(forwarder) = &self.forwarder {
            ack.forwarded = Some(match forwarder.forward(&threat).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(threat_id = %threat.id, error = %e, "threat forward failed");
                    false
                }
            });
        }
        ack
    }

    pub fn close(&self) {
        self.log.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::policy::ThreatType;
    use crate::storage::{SqliteThreatStore, ThreatQuery, ThreatStats};

    struct BrokenStore;

    impl ThreatStore for BrokenStore {
        fn insert(&self, _: &ThreatRecord) -> Result<(), PersistenceError> {
            Err(PersistenceError::Forward("store offline".into()))
        }
        fn find(&self, _: &ThreatQuery) -> Result<Vec<ThreatRecord>, PersistenceError> {
            Ok(Vec::new())
        }
        fn stats(&self) -> Result<ThreatStats, PersistenceError> {
            Ok(ThreatStats::default())
        }
    }

    fn sqli() -> (RequestRecord, Prediction) {
        (
            RequestRecord {
                ip: Some("10.0.0.5".into()),
                ..Default::default()
            },
            Prediction {
                threat_type: ThreatType::SqlInjection,
                confidence: 0.9,
            },
        )
    }

    #[tokio::test]
    async fn store_failure_does_not_block_log() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(AlertSink::new(AlertLog::new(dir.path()), Arc::new(BrokenStore), None));
        let (req, p) = sqli();
        let ack = sink.record(&req, &p).await;
        assert!(ack.logged);
        assert!(!ack.stored);
        assert_eq!(ack.forwarded, None);
    }

    #[tokio::test]
    async fn log_failure_does_not_block_store() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the alerts directory should be
        let blocker = dir.path().join("alerts");
        std::fs::write(&blocker, "not a dir").unwrap();
        let store = Arc::new(SqliteThreatStore::open_in_memory(b"k").unwrap());
        let sink = Arc::new(AlertSink::new(AlertLog::new(&blocker), store.clone(), None));
        let (req, p) = sqli();
        let ack = sink.record(&req, &p).await;
        assert!(!ack.logged);
        assert!(ack.stored);
        let found = store
            .find(&ThreatQuery {
                limit: 10,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ack.threat_id);
    }
}
