//! Inference module
//!
//! Loads a model/preprocessor pair once and serves risk predictions for
//! single rows and whole tables. Degraded inputs (missing numeric columns,
//! unseen categories) are reported on each prediction rather than rejected.

mod service;

pub use service::{InferenceService, InferenceStats, RiskLevel, RiskPrediction, POSITIVE_CLASS};
