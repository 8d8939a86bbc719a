//! Data preprocessing module
//!
//! Provides the fitted state shared by training and inference:
//! - Mean imputation of numeric columns
//! - Label encoding of categorical columns
//! - Joint standard scaling of numeric columns
//! - Single-row transforms with documented fallbacks

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::PreprocessingConfig;
pub use encoder::{series_to_strings, LabelEncoder, MISSING_TOKEN};
pub use imputer::{numeric_column, MeanImputer};
pub use pipeline::{ColumnRole, DataPreprocessor, TransformedRow};
pub use scaler::StandardScaler;
