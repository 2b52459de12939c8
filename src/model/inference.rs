//! Feature vector → (label, confidence) through the loaded bundle.

use super::ModelBundle;
use crate::error::InferenceError;
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Classifier output before the decision policy is applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub class_index: usize,
    /// Training label as stored in the decoder, e.g. `SQLi`
    pub label: String,
    /// Probability of the arg-max class
    pub confidence: f32,
    pub probabilities: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct InferenceEngine {
    bundle: Arc<ModelBundle>,
}

impl InferenceEngine {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn infer(&self, features: &FeatureVector) -> Result<RawPrediction, InferenceError> {
        let classifier = self.bundle.classifier();
        let scaler = self.bundle.scaler();
        if scaler.n_features() != classifier.n_features() {
            return Err(InferenceError::FeatureCount {
                expected: classifier.n_features(),
                got: scaler.n_features(),
            });
        }
        let scaled = scaler.transform(features.as_slice())?;
        let probabilities = classifier.predict_proba(&scaled)?;

        let labels = self.bundle.labels();
        if probabilities.len() != labels.len() {
            return Err(InferenceError::ClassCount {
                expected: labels.len(),
                got: probabilities.len(),
            });
        }
        let (class_index, confidence) = arg_max(&probabilities);
        let label = labels
            .decode(class_index)
            .ok_or(InferenceError::ClassCount {
                expected: labels.len(),
                got: class_index + 1,
            })?
            .to_string();
        debug!(label = %label, confidence, ?probabilities, "raw prediction");
        Ok(RawPrediction {
            class_index,
            label,
            confidence,
            probabilities,
        })
    }
}

/// Index and value of the largest entry; ties go to the lowest index.
fn arg_max(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
}
