//! Artifact persistence
//!
//! A training run produces exactly two files named after the target column:
//! the bincode-encoded model and the JSON-encoded preprocessor.

mod artifacts;

pub use artifacts::{
    model_path, preprocessor_path, ArtifactPair, ModelArtifact, SavedArtifacts,
    ARTIFACT_FORMAT_VERSION,
};
