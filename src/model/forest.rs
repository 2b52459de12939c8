//! Tree-ensemble classifier exported from a trained random forest.
//!
//! Node layout follows the usual flattened tree export: node 0 is the root,
//! a split sends `x[feature] <= threshold` to `left`, and leaves hold per-class
//! weights. Class probabilities are the mean of each tree's normalised leaf.

use super::Classifier;
use crate::error::InferenceError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f32>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestClassifier {
    pub version: String,
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<Tree>,
}

impl ForestClassifier {
    /// Structural check run once at load: every split points forward to an existing
    /// node, reads an existing feature, and every leaf has one weight per class.
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        left,
                        right,
                        threshold,
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!("tree {t} node {i}: feature {feature} out of range"));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {t} node {i}: non-finite threshold"));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(format!("tree {t} node {i}: bad child {child}"));
                            }
                        }
                    }
                    TreeNode::Leaf { value } => {
                        if value.len() != self.n_classes {
                            return Err(format!(
                                "tree {t} node {i}: leaf has {} classes, expected {}",
                                value.len(),
                                self.n_classes
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf<'a>(tree: &'a Tree, x: &[f32]) -> &'a [f32] {
        let mut idx = 0;
        loop {
            match &tree.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }
}

impl Classifier for ForestClassifier {
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
        let mut proba = vec![0.0f32; self.n_classes];
        for tree in &self.trees {
            let value = Self::leaf(tree, scaled);
            let total: f32 = value.iter().sum();
            if total <= 0.0 {
                continue;
            }
            for (p, v) in proba.iter_mut().zip(value) {
                *p += v / total;
            }
        }
        let n = self.trees.len() as f32;
        proba.iter_mut().for_each(|p| *p /= n);
        Ok(proba)
    }
}
