//! Indexed threat store. Append-only from the pipeline's point of view.

mod cipher;
mod sqlite;

pub use cipher::PayloadCipher;
pub use sqlite::SqliteThreatStore;

use crate::error::PersistenceError;
use crate::features::RequestRecord;
use crate::policy::{Prediction, ThreatType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted evidence of a non-benign verdict. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// As reported by the caller; absent when the request carried none
    pub ip: Option<String>,
    pub endpoint: Option<String>,
    pub method: Option<String>,
    #[serde(rename = "threatType")]
    pub threat_type: ThreatType,
    pub probability: f32,
    pub email: Option<String>,
    pub user_agent: Option<String>,
    pub request_data: serde_json::Value,
}

impl ThreatRecord {
    pub fn new(request: &RequestRecord, prediction: &Prediction, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            ip: request.ip.clone(),
            endpoint: request.endpoint.clone(),
            method: request.method.clone(),
            threat_type: prediction.threat_type,
            probability: prediction.confidence,
            email: request.email.clone(),
            user_agent: request.user_agent.clone(),
            request_data: request.to_value(),
        }
    }
}

/// Equality filters combined with AND, newest first, at most `limit` rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreatQuery {
    pub limit: usize,
    pub threat_type: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatTypeCount {
    #[serde(rename = "threatType")]
    pub threat_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatStats {
    #[serde(rename = "totalThreats")]
    pub total: u64,
    #[serde(rename = "threatsByType")]
    pub by_type: Vec<ThreatTypeCount>,
}

/// Append-capable, indexable document store.
/// Implementations handle their own concurrency for inserts and reads.
pub trait ThreatStore: Send + Sync {
    fn insert(&self, record: &ThreatRecord) -> Result<(), PersistenceError>;
    fn find(&self, query: &ThreatQuery) -> Result<Vec<ThreatRecord>, PersistenceError>;
    fn stats(&self) -> Result<ThreatStats, PersistenceError>;
}
