//! Forward confirmed threats to a remote collector (`POST /api/threats/log`).

use crate::config::ForwardConfig;
use crate::error::PersistenceError;
use crate::storage::ThreatRecord;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

const LOG_PATH: &str = "/api/threats/log";

#[derive(Serialize)]
struct ThreatPayload<'a> {
    ip: &'a str,
    #[serde(rename = "threatType")]
    threat_type: &'a str,
    confidence: f32,
    endpoint: &'a str,
    method: &'a str,
    email: &'a str,
    #[serde(rename = "userAgent")]
    user_agent: &'a str,
    #[serde(rename = "requestData")]
    request_data: &'a serde_json::Value,
}

impl<'a> From<&'a ThreatRecord> for ThreatPayload<'a> {
    fn from(r: &'a ThreatRecord) -> Self {
        Self {
            ip: r.ip.as_deref().unwrap_or("unknown"),
            threat_type: r.threat_type.as_str(),
            confidence: r.probability,
            endpoint: r.endpoint.as_deref().unwrap_or("unknown"),
            method: r.method.as_deref().unwrap_or("unknown"),
            email: r.email.as_deref().unwrap_or("unknown"),
            user_agent: r.user_agent.as_deref().unwrap_or("unknown"),
            request_data: &r.request_data,
        }
    }
}

pub struct AlertForwarder {
    client: reqwest::Client,
    url: String,
}

impl AlertForwarder {
    /// `None` when forwarding is disabled or has no endpoint.
    pub fn new(config: &ForwardConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let endpoint = config.endpoint.as_ref()?.trim_end_matches('/');
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .ok()?;
        Some(Self {
            client,
            url: format!("{endpoint}{LOG_PATH}"),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn forward(&self, record: &ThreatRecord) -> Result<(), PersistenceError> {
        let res = self
            .client
            .post(&self.url)
            .json(&ThreatPayload::from(record))
            .send()
            .await
            .map_err(|e| PersistenceError::Forward(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PersistenceError::Forward(format!("{status} {text}")));
        }
        debug!(threat_id = %record.id, "threat forwarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_or_endpointless_config_yields_none() {
        assert!(AlertForwarder::new(&ForwardConfig::default()).is_none());
        let cfg = ForwardConfig {
            enabled: true,
            endpoint: None,
            timeout_secs: 5,
        };
        assert!(AlertForwarder::new(&cfg).is_none());
    }

    #[test]
    fn url_joins_collector_path() {
        let cfg = ForwardConfig {
            enabled: true,
            endpoint: Some("http://collector:8080/".into()),
            timeout_secs: 5,
        };
        let f = AlertForwarder::new(&cfg).unwrap();
        assert_eq!(f.url(), "http://collector:8080/api/threats/log");
    }
}
