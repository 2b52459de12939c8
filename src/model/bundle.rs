//! Bundle discovery and atomic loading.
//!
//! A bundle is described by `bundle_<version>.json`, which names the three
//! artifacts and the feature order they were trained on. Directories that only
//! hold the bare triple `classifier_<v>.json`, `scaler_<v>.json`,
//! `label_encoder_<v>.json` are still accepted. Either way exactly one version is
//! selected (the greatest token) and every artifact must agree on it.

use super::{Classifier, ForestClassifier, LabelDecoder, StandardScaler};
use crate::error::ModelConfigError;
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub const CLASSIFIER_FORMAT_FOREST: &str = "forest";
#[cfg(feature = "onnx")]
pub const CLASSIFIER_FORMAT_ONNX: &str = "onnx";

const MANIFEST_PREFIX: &str = "bundle_";
const CLASSIFIER_PREFIX: &str = "classifier_";
const SCALER_PREFIX: &str = "scaler_";
const LABELS_PREFIX: &str = "label_encoder_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Relative to the model directory
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Lower-case hex SHA-256 of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ArtifactRef {
    fn bare(path: PathBuf) -> Self {
        Self {
            path,
            format: None,
            sha256: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub version: String,
    pub feature_names: Vec<String>,
    pub classifier: ArtifactRef,
    pub scaler: ArtifactRef,
    pub label_decoder: ArtifactRef,
}

/// Loaded bundle. Immutable and shared read-only by all inference calls.
pub struct ModelBundle {
    version: String,
    classifier: Box<dyn Classifier>,
    scaler: StandardScaler,
    labels: LabelDecoder,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("version", &self.version)
            .field("n_features", &self.classifier.n_features())
            .field("classes", &self.labels.classes)
            .finish()
    }
}

impl ModelBundle {
    /// Select the newest bundle in `dir` and load it. Any inconsistency is fatal.
    pub fn load(dir: &Path) -> Result<Self, ModelConfigError> {
        let manifest = discover(dir)?;
        Self::load_manifest(dir, &manifest)
    }

    pub fn load_manifest(dir: &Path, manifest: &BundleManifest) -> Result<Self, ModelConfigError> {
        let version = manifest.version.clone();
        check_feature_order(&version, &manifest.feature_names)?;

        let scaler: StandardScaler = read_json_artifact(dir, &version, "scaler", &manifest.scaler)?;
        check_version(&version, "scaler", &scaler.version)?;
        let labels: LabelDecoder =
            read_json_artifact(dir, &version, "label_decoder", &manifest.label_decoder)?;
        check_version(&version, "label_decoder", &labels.version)?;

        let format = manifest
            .classifier
            .format
            .as_deref()
            .unwrap_or(CLASSIFIER_FORMAT_FOREST);
        let classifier: Box<dyn Classifier> = match format {
            CLASSIFIER_FORMAT_FOREST => {
                let forest: ForestClassifier =
                    read_json_artifact(dir, &version, "classifier", &manifest.classifier)?;
                check_version(&version, "classifier", &forest.version)?;
                forest.validate().map_err(|detail| ModelConfigError::Shape {
                    version: version.clone(),
                    detail,
                })?;
                Box::new(forest)
            }
            #[cfg(feature = "onnx")]
            CLASSIFIER_FORMAT_ONNX => {
                let path = verified_path(dir, &version, "classifier", &manifest.classifier)?;
                Box::new(super::OnnxClassifier::load(&path, FEATURE_COUNT, labels.len())?)
            }
            other => return Err(ModelConfigError::UnsupportedFormat(other.to_string())),
        };

        let bundle = Self::from_parts(version, classifier, scaler, labels)?;
        info!(
            version = %bundle.version,
            classes = ?bundle.labels.classes,
            "model bundle loaded"
        );
        Ok(bundle)
    }

    /// Assemble a bundle from already-built members, enforcing shape agreement.
    pub fn from_parts(
        version: String,
        classifier: Box<dyn Classifier>,
        scaler: StandardScaler,
        labels: LabelDecoder,
    ) -> Result<Self, ModelConfigError> {
        let shape = |detail: String| ModelConfigError::Shape {
            version: version.clone(),
            detail,
        };
        if !scaler.is_consistent() {
            return Err(shape(format!(
                "scaler mean has {} entries, scale has {}",
                scaler.mean.len(),
                scaler.scale.len()
            )));
        }
        if scaler.n_features() != FEATURE_COUNT || classifier.n_features() != FEATURE_COUNT {
            return Err(shape(format!(
                "extractor produces {FEATURE_COUNT} features, scaler expects {}, classifier expects {}",
                scaler.n_features(),
                classifier.n_features()
            )));
        }
        if labels.is_empty() || labels.len() != classifier.n_classes() {
            return Err(shape(format!(
                "label decoder has {} classes, classifier has {}",
                labels.len(),
                classifier.n_classes()
            )));
        }
        Ok(Self {
            version,
            classifier,
            scaler,
            labels,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn labels(&self) -> &LabelDecoder {
        &self.labels
    }
}

/// Find the manifest for the greatest version token in `dir`.
pub(crate) fn discover(dir: &Path) -> Result<BundleManifest, ModelConfigError> {
    let names: Vec<String> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .collect();

    let newest_manifest = names
        .iter()
        .filter_map(|n| version_token(n, MANIFEST_PREFIX))
        .max();
    if let Some(token) = newest_manifest {
        let path = dir.join(format!("{MANIFEST_PREFIX}{token}.json"));
        let manifest: BundleManifest = read_json(&path)?;
        check_version(&token, "manifest", &manifest.version)?;
        return Ok(manifest);
    }

    let token = names
        .iter()
        .filter_map(|n| {
            [CLASSIFIER_PREFIX, SCALER_PREFIX, LABELS_PREFIX]
                .iter()
                .find_map(|p| version_token(n, p))
        })
        .max()
        .ok_or_else(|| ModelConfigError::NoBundle(dir.to_path_buf()))?;
    warn!(version = %token, "no bundle manifest found; pairing artifacts by file name");

    let file = |prefix: &str| format!("{prefix}{token}.json");
    let missing: Vec<String> = [CLASSIFIER_PREFIX, SCALER_PREFIX, LABELS_PREFIX]
        .iter()
        .map(|p| file(p))
        .filter(|f| !names.contains(f))
        .collect();
    if !missing.is_empty() {
        return Err(ModelConfigError::IncompleteBundle {
            version: token,
            missing: missing.join(", "),
        });
    }
    Ok(BundleManifest {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        classifier: ArtifactRef::bare(PathBuf::from(file(CLASSIFIER_PREFIX))),
        scaler: ArtifactRef::bare(PathBuf::from(file(SCALER_PREFIX))),
        label_decoder: ArtifactRef::bare(PathBuf::from(file(LABELS_PREFIX))),
        version: token,
    })
}

fn version_token(file_name: &str, prefix: &str) -> Option<String> {
    file_name
        .strip_prefix(prefix)?
        .strip_suffix(".json")
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn check_version(expected: &str, artifact: &str, found: &str) -> Result<(), ModelConfigError> {
    if expected == found {
        Ok(())
    } else {
        Err(ModelConfigError::VersionMismatch {
            expected: expected.to_string(),
            artifact: artifact.to_string(),
            found: found.to_string(),
        })
    }
}

fn check_feature_order(version: &str, names: &[String]) -> Result<(), ModelConfigError> {
    if names.len() != FEATURE_COUNT {
        return Err(ModelConfigError::FeatureOrder {
            version: version.to_string(),
            detail: format!("bundle lists {} features, expected {FEATURE_COUNT}", names.len()),
        });
    }
    for (i, (got, want)) in names.iter().zip(FEATURE_NAMES).enumerate() {
        if got != want {
            return Err(ModelConfigError::FeatureOrder {
                version: version.to_string(),
                detail: format!("column {i} is {got:?}, expected {want:?}"),
            });
        }
    }
    Ok(())
}

fn verified_path(
    dir: &Path,
    version: &str,
    artifact: &str,
    r: &ArtifactRef,
) -> Result<PathBuf, ModelConfigError> {
    let path = dir.join(&r.path);
    if !path.is_file() {
        return Err(ModelConfigError::IncompleteBundle {
            version: version.to_string(),
            missing: r.path.display().to_string(),
        });
    }
    if let Some(expected) = &r.sha256 {
        let bytes = std::fs::read(&path).map_err(|source| ModelConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let digest = Sha256::digest(&bytes);
        let actual: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(ModelConfigError::ChecksumMismatch {
                version: version.to_string(),
                artifact: artifact.to_string(),
            });
        }
    }
    Ok(path)
}

fn read_json_artifact<T: DeserializeOwned>(
    dir: &Path,
    version: &str,
    artifact: &str,
    r: &ArtifactRef,
) -> Result<T, ModelConfigError> {
    let path = verified_path(dir, version, artifact, r)?;
    read_json(&path)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ModelConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ModelConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ModelConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_token_requires_prefix_and_suffix() {
        assert_eq!(
            version_token("bundle_20250502_205949.json", MANIFEST_PREFIX).as_deref(),
            Some("20250502_205949")
        );
        assert_eq!(version_token("bundle_.json", MANIFEST_PREFIX), None);
        assert_eq!(version_token("scaler_1.json", MANIFEST_PREFIX), None);
        assert_eq!(version_token("bundle_1.joblib", MANIFEST_PREFIX), None);
    }

    #[test]
    fn empty_dir_has_no_bundle() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover(dir.path()),
            Err(ModelConfigError::NoBundle(_))
        ));
    }

    #[test]
    fn bare_triple_must_be_complete() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("classifier_2.json"), "{}").unwrap();
        std::fs::write(dir.path().join("scaler_2.json"), "{}").unwrap();
        std::fs::write(dir.path().join("label_encoder_1.json"), "{}").unwrap();
        match discover(dir.path()) {
            Err(ModelConfigError::IncompleteBundle { version, missing }) => {
                assert_eq!(version, "2");
                assert_eq!(missing, "label_encoder_2.json");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn feature_order_is_checked_by_name() {
        let mut names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        assert!(check_feature_order("v", &names).is_ok());
        names.swap(14, 15);
        assert!(matches!(
            check_feature_order("v", &names),
            Err(ModelConfigError::FeatureOrder { .. })
        ));
        names.pop();
        assert!(check_feature_order("v", &names).is_err());
    }
}
