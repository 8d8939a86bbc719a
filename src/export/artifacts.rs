//! Model and preprocessor artifacts

use crate::error::{ChaosError, Result};
use crate::optimizer::HyperparameterConfig;
use crate::preprocessing::DataPreprocessor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bumped whenever the on-disk layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// `<dir>/<target>_model.bin`
pub fn model_path(dir: impl AsRef<Path>, target: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_model.bin", target))
}

/// `<dir>/<target>_preprocessor.json`
pub fn preprocessor_path(dir: impl AsRef<Path>, target: &str) -> PathBuf {
    dir.as_ref().join(format!("{}_preprocessor.json", target))
}

/// Trained classifier with the metadata needed to serve it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<C> {
    pub format_version: u32,
    /// Target column the classifier predicts
    pub target: String,
    /// Winning configuration of the search
    pub hyperparameters: HyperparameterConfig,
    /// Validation accuracy of the final fit
    pub valid_accuracy: f64,
    /// Feature order the classifier expects
    pub feature_names: Vec<String>,
    /// Target class labels, indexed by class code
    pub classes: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub classifier: C,
}

impl<C: Serialize + DeserializeOwned> ModelArtifact<C> {
    /// Save with bincode
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| {
            ChaosError::SerializationError(format!("failed to write model: {}", e))
        })
    }

    /// Load a bincode artifact, rejecting other format versions
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            ChaosError::InferenceError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let artifact: Self = bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
            ChaosError::SerializationError(format!("failed to read model: {}", e))
        })?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ChaosError::ArtifactMismatch(format!(
                "model format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        Ok(artifact)
    }
}

/// Paths written by [`ArtifactPair::save`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedArtifacts {
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
}

/// The two artifacts of one training run, always persisted together
#[derive(Debug, Clone)]
pub struct ArtifactPair<C> {
    pub model: ModelArtifact<C>,
    pub preprocessor: DataPreprocessor,
}

impl<C: Serialize + DeserializeOwned> ArtifactPair<C> {
    /// Pair a classifier with its preprocessor, checking they agree
    pub fn new(model: ModelArtifact<C>, preprocessor: DataPreprocessor) -> Result<Self> {
        let pair = Self { model, preprocessor };
        pair.check_consistent()?;
        Ok(pair)
    }

    fn check_consistent(&self) -> Result<()> {
        if !self.preprocessor.is_fitted() {
            return Err(ChaosError::ArtifactMismatch(
                "preprocessor is not fitted".to_string(),
            ));
        }
        if self.preprocessor.target() != Some(self.model.target.as_str()) {
            return Err(ChaosError::ArtifactMismatch(format!(
                "model predicts '{}' but preprocessor was fitted for {:?}",
                self.model.target,
                self.preprocessor.target()
            )));
        }
        if self.preprocessor.feature_names() != self.model.feature_names {
            return Err(ChaosError::ArtifactMismatch(
                "model and preprocessor disagree on feature order".to_string(),
            ));
        }
        Ok(())
    }

    pub fn target(&self) -> &str {
        &self.model.target
    }

    /// Write `<target>_model.bin` and `<target>_preprocessor.json` into `dir`
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<SavedArtifacts> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let saved = SavedArtifacts {
            model_path: model_path(dir, self.target()),
            preprocessor_path: preprocessor_path(dir, self.target()),
        };
        let model_tmp = staging_path(&saved.model_path);
        let preprocessor_tmp = staging_path(&saved.preprocessor_path);

        // both files are written before either becomes visible
        let staged = self
            .model
            .save(&model_tmp)
            .and_then(|_| self.preprocessor.save(&preprocessor_tmp));
        if let Err(e) = staged {
            discard(&[model_tmp.as_path(), preprocessor_tmp.as_path()]);
            return Err(e);
        }
        if let Err(e) = std::fs::rename(&model_tmp, &saved.model_path) {
            discard(&[model_tmp.as_path(), preprocessor_tmp.as_path()]);
            return Err(e.into());
        }
        if let Err(e) = std::fs::rename(&preprocessor_tmp, &saved.preprocessor_path) {
            discard(&[saved.model_path.as_path(), preprocessor_tmp.as_path()]);
            return Err(e.into());
        }

        info!(
            model = %saved.model_path.display(),
            preprocessor = %saved.preprocessor_path.display(),
            "artifacts saved"
        );
        Ok(saved)
    }

    /// Load both artifacts for `target` from `dir`
    pub fn load(dir: impl AsRef<Path>, target: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let model = ModelArtifact::load(model_path(dir, target))?;
        let preprocessor = DataPreprocessor::load(preprocessor_path(dir, target))?;
        Self::new(model, preprocessor)
    }
}

/// Hidden sibling used while a pair is being written
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn discard(paths: &[&Path]) {
    for path in paths {
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "could not remove partial artifact");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use tempfile::tempdir;

    fn fitted_preprocessor() -> DataPreprocessor {
        let df = df!(
            "age" => &[30.0, 40.0, 50.0, 60.0],
            "gender" => &["M", "F", "M", "F"],
            "y" => &[0i64, 1, 0, 1]
        )
        .unwrap();
        let config = crate::preprocessing::PreprocessingConfig::with_schema(["gender"], ["age"]);
        let mut pre = DataPreprocessor::with_config(config);
        pre.fit(&df, "y").unwrap();
        pre
    }

    fn artifact(pre: &DataPreprocessor) -> ModelArtifact<Vec<f64>> {
        ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            target: "y".to_string(),
            hyperparameters: HyperparameterConfig::default(),
            valid_accuracy: 0.75,
            feature_names: pre.feature_names(),
            classes: pre.target_classes().to_vec(),
            trained_at: Utc::now(),
            classifier: vec![1.0, 2.0, 3.0],
        }
    }

    #[test]
    fn test_pair_roundtrip_writes_two_files() {
        let dir = tempdir().unwrap();
        let pre = fitted_preprocessor();
        let pair = ArtifactPair::new(artifact(&pre), pre).unwrap();
        let saved = pair.save(dir.path()).unwrap();

        assert!(saved.model_path.ends_with("y_model.bin"));
        assert!(saved.preprocessor_path.ends_with("y_preprocessor.json"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

        let loaded: ArtifactPair<Vec<f64>> = ArtifactPair::load(dir.path(), "y").unwrap();
        assert_eq!(loaded.model.classifier, vec![1.0, 2.0, 3.0]);
        assert_eq!(loaded.model.feature_names, loaded.preprocessor.feature_names());
    }

    #[test]
    fn test_failed_preprocessor_write_leaves_no_model() {
        let dir = tempdir().unwrap();
        let pre = fitted_preprocessor();
        let pair = ArtifactPair::new(artifact(&pre), pre).unwrap();

        // a directory in the way makes the preprocessor write fail
        let blocker = staging_path(&preprocessor_path(dir.path(), "y"));
        std::fs::create_dir(&blocker).unwrap();

        assert!(pair.save(dir.path()).is_err());
        assert!(!model_path(dir.path(), "y").exists());
        assert!(!preprocessor_path(dir.path(), "y").exists());
        assert!(!staging_path(&model_path(dir.path(), "y")).exists());

        // once the path is clear the same pair saves normally
        std::fs::remove_dir(&blocker).unwrap();
        pair.save(dir.path()).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_feature_order_mismatch_rejected() {
        let pre = fitted_preprocessor();
        let mut model = artifact(&pre);
        model.feature_names.reverse();
        assert!(matches!(
            ArtifactPair::new(model, pre),
            Err(ChaosError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempdir().unwrap();
        let err = ArtifactPair::<Vec<f64>>::load(dir.path(), "y").unwrap_err();
        assert!(matches!(err, ChaosError::InferenceError(_)));
    }
}
