//! ONNX Runtime classifier backend. Input: [1, n_features] f32 of scaled features,
//! output: class probabilities as a [1, n_classes] f32 tensor (export with zipmap off).

use super::Classifier;
use crate::error::{InferenceError, ModelConfigError};
use ndarray::{Array2, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};

static ORT_ENV: OnceLock<Arc<Environment>> = OnceLock::new();

fn init_env() -> Result<Arc<Environment>, ModelConfigError> {
    if let Some(env) = ORT_ENV.get() {
        return Ok(env.clone());
    }
    let env = Environment::builder()
        .with_name("attack-detector")
        .build()
        .map_err(|e| ModelConfigError::Backend(e.to_string()))?
        .into_arc();
    Ok(ORT_ENV.get_or_init(|| env).clone())
}

pub struct OnnxClassifier {
    session: Session,
    n_features: usize,
    n_classes: usize,
}

impl OnnxClassifier {
    pub fn load(path: &Path, n_features: usize, n_classes: usize) -> Result<Self, ModelConfigError> {
        let env = init_env()?;
        let session = SessionBuilder::new(&env)
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|b| b.with_model_from_file(path))
            .map_err(|e| ModelConfigError::Backend(e.to_string()))?;
        tracing::info!(path = %path.display(), outputs = session.outputs.len(), "ONNX classifier loaded");
        Ok(Self {
            session,
            n_features,
            n_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, scaled: &[f32]) -> Result<Vec<f32>, InferenceError> {
        if scaled.len() != self.n_features {
            return Err(InferenceError::FeatureCount {
                expected: self.n_features,
                got: scaled.len(),
            });
        }
        let backend = |e: ort::OrtError| InferenceError::Backend(e.to_string());
        let arr = Array2::from_shape_vec((1, self.n_features), scaled.to_vec())
            .map_err(|e| InferenceError::Backend(e.to_string()))?;
        let input = CowArray::from(arr.into_dyn());
        let value = Value::from_array(self.session.allocator(), &input).map_err(backend)?;
        let outputs = self.session.run(vec![value]).map_err(backend)?;

        // Classifier exports emit [label, probabilities]; take the last output.
        let out = outputs
            .last()
            .ok_or_else(|| InferenceError::Backend("model produced no outputs".into()))?;
        let tensor = out.try_extract::<f32>().map_err(backend)?;
        let proba: Vec<f32> = tensor.view().iter().copied().collect();
        if proba.len() != self.n_classes {
            return Err(InferenceError::ClassCount {
                expected: self.n_classes,
                got: proba.len(),
            });
        }
        Ok(proba)
    }
}
