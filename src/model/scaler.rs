//! Feature-wise standardization with parameters fixed at training time.

use crate::error::InferenceError;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub version: String,
    pub mean: Vec<f32>,
    /// Per-feature standard deviation. Zero means the column had no variance.
    pub scale: Vec<f32>,
}

impl StandardScaler {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn is_consistent(&self) -> bool {
        self.mean.len() == self.scale.len()
    }

    /// `(x - mean) / scale`; zero or non-finite scale leaves the centred value unscaled.
    pub fn transform(&self, values: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if values.len() != self.mean.len() || values.len() != self.scale.len() {
            return Err(InferenceError::FeatureCount {
                expected: self.mean.len(),
                got: values.len(),
            });
        }
        let x = ArrayView1::from(values);
        let mean = ArrayView1::from(self.mean.as_slice());
        let scale: Array1<f32> = self
            .scale
            .iter()
            .map(|&s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
            .collect();
        Ok(((&x - &mean) / &scale).to_vec())
    }
}
