//! Versioned model bundle {classifier, scaler, label decoder} and inference over it.

mod bundle;
mod forest;
mod inference;
mod labels;
#[cfg(feature = "onnx")]
mod onnx;
mod scaler;

pub use bundle::{ArtifactRef, BundleManifest, ModelBundle, CLASSIFIER_FORMAT_FOREST};
pub use forest::{ForestClassifier, Tree, TreeNode};
pub use inference::{InferenceEngine, RawPrediction};
pub use labels::LabelDecoder;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use scaler::StandardScaler;

use crate::error::InferenceError;

/// Scaled feature vector → probability per class, in label-decoder order.
pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;
    fn n_classes(&self) -> usize;
    fn predict_proba(&self, scaled: &[f32]) -> Result<Vec<f32>, InferenceError>;
}
