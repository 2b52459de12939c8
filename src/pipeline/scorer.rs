//! Extractor → inference → decision policy, shared by the worker and synchronous scoring.

use crate::error::ScoreError;
use crate::features::{FeatureExtractor, RequestRecord};
use crate::model::InferenceEngine;
use crate::policy::{DecisionPolicy, Prediction};

#[derive(Debug, Clone)]
pub struct Scorer {
    extractor: FeatureExtractor,
    engine: InferenceEngine,
    policy: DecisionPolicy,
}

impl Scorer {
    pub fn new(engine: InferenceEngine, policy: DecisionPolicy) -> Self {
        Self {
            extractor: FeatureExtractor::new(),
            engine,
            policy,
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn score(&self, record: &RequestRecord) -> Result<Prediction, ScoreError> {
        let features = self.extractor.extract(record)?;
        let raw = self.engine.infer(&features)?;
        Ok(self.policy.decide(&raw.label, raw.confidence))
    }
}
