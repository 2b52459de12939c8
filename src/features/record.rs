//! Incoming request metadata. Every field is optional; defaults are applied at extraction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

/// Raw request record as submitted to `/analyze` or `/predict`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, alias = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Seconds since the same source ip's previous request, as measured by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_since_last: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Map<String, Value>>,
    /// Precomputed feature values keyed by feature name; bypasses extraction rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, f64>>,
    /// Anything else the caller sent, kept for the stored payload
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestRecord {
    /// Source ip as reported, or the documented fallback when absent
    pub fn ip_or_default(&self) -> &str {
        self.ip.as_deref().unwrap_or("0.0.0.0")
    }

    /// JSON form kept as the stored payload. `Null` (with a warning) if it cannot be encoded.
    pub fn to_value(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(v) => v,
            Err(e) => {
                warn!(ip = %self.ip_or_default(), error = %e, "request payload could not be encoded");
                Value::Null
            }
        }
    }
}
