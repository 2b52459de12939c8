//! Deterministic feature extraction from raw request records.

mod extractor;
mod record;

pub use extractor::FeatureExtractor;
pub use record::RequestRecord;

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 20;

/// Column order the model bundle was trained with. Bundles must list the same names.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "email_length",
    "password_length",
    "password_special_chars",
    "is_post",
    "is_login_endpoint",
    "user_agent_length",
    "ip_octet_1",
    "ip_octet_2",
    "ip_octet_3",
    "ip_octet_4",
    "time_since_last",
    "body_field_count",
    "has_sql",
    "has_script",
    "hour",
    "day",
    "is_gmail",
    "is_yahoo",
    "is_outlook",
    "dummy",
];

/// Fixed-size, fixed-order feature vector for model input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f32; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f32; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value of a named feature, `None` for names outside [`FEATURE_NAMES`]
    pub fn get(&self, name: &str) -> Option<f32> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    pub fn named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}
