// Wire formats and error types for classifier loading

use serde::{Deserialize, Serialize};

/// Where a loaded classifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelOrigin {
    Remote,
    Fallback,
}

/// Classifier description fetched from `<endpoint>model.json`.
///
/// One weight vector and bias per class, applied to the flattened normalized
/// RGB image at `input_width` x `input_height`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub input_width: u32,
    pub input_height: u32,
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Label manifest fetched from `<endpoint>metadata.json`. The `labels` field
/// is optional; absence or a malformed document falls back to default labels.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

/// Error types for model loading. These never escape the model manager:
/// every variant is recovered by falling back to the built-in classifier or,
/// failing that, the unavailable handle.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model fetch failed: {0}")]
    Fetch(String),

    #[error("model descriptor invalid: {0}")]
    Parse(String),

    #[error("warm-up prediction failed: {0}")]
    WarmUp(String),

    #[error("fallback model construction failed: {0}")]
    Fallback(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
