//! Neural architectures for tabular classification

pub mod layers;
mod tabnet;

pub use tabnet::{TabNetClassifier, TabNetConfig};
