//! Confidence thresholding and the mapping from training labels to threat categories.

mod decision;

pub use decision::DecisionPolicy;

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatType {
    #[serde(rename = "BENIGN")]
    Benign,
    #[serde(rename = "SQL Injection")]
    SqlInjection,
    #[serde(rename = "XSS Attack")]
    Xss,
    #[serde(rename = "Brute Force")]
    BruteForce,
    #[serde(rename = "Port scan")]
    PortScan,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl ThreatType {
    /// Map a training label (`SQLi`, `PortScan`, `benign`, …) or an already
    /// human-facing name to its category. Anything else is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "benign" | "BENIGN" => ThreatType::Benign,
            "SQLi" | "SQL Injection" => ThreatType::SqlInjection,
            "XSS" | "XSS Attack" => ThreatType::Xss,
            "BruteForce" | "Brute Force" => ThreatType::BruteForce,
            "PortScan" | "Port scan" => ThreatType::PortScan,
            _ => ThreatType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatType::Benign => "BENIGN",
            ThreatType::SqlInjection => "SQL Injection",
            ThreatType::Xss => "XSS Attack",
            ThreatType::BruteForce => "Brute Force",
            ThreatType::PortScan => "Port scan",
            ThreatType::Unknown => "UNKNOWN",
        }
    }

    pub fn is_benign(&self) -> bool {
        matches!(self, ThreatType::Benign)
    }
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final verdict for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "threatType")]
    pub threat_type: ThreatType,
    pub confidence: f32,
}

impl Prediction {
    /// Verdict reported when scoring could not complete
    pub fn fallback() -> Self {
        Self {
            threat_type: ThreatType::Benign,
            confidence: 0.0,
        }
    }

    pub fn is_threat(&self) -> bool {
        !self.threat_type.is_benign()
    }
}
