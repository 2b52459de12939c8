//! Low-certainty attack verdicts are reported as benign.

use super::{Prediction, ThreatType};
use crate::config::PolicyConfig;

#[derive(Debug, Clone)]
pub struct DecisionPolicy {
    threshold: f32,
}

impl DecisionPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self::with_threshold(config.threshold)
    }

    pub fn with_threshold(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Any verdict whose confidence is under the threshold becomes BENIGN with
    /// confidence `1 - c`. Thresholds above 0.5 report `max(c, 1 - c)` instead,
    /// so a rewritten verdict is never rewritten again.
    pub fn decide(&self, label: &str, confidence: f32) -> Prediction {
        let threat_type = ThreatType::from_label(label);
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if confidence < self.threshold {
            return Prediction {
                threat_type: ThreatType::Benign,
                confidence: (1.0 - confidence).max(confidence),
            };
        }
        Prediction {
            threat_type,
            confidence,
        }
    }

    pub fn redecide(&self, prediction: &Prediction) -> Prediction {
        self.decide(prediction.threat_type.as_str(), prediction.confidence)
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
