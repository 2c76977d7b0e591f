// Data structures for pose classification and the pose sequence

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==============================================================================
// Label Set
// ==============================================================================

/// Ordered set of pose identifiers. The order defines the positions of the
/// circular pose sequence, so labels must be unique and the set non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new(labels: Vec<String>) -> PoseResult<Self> {
        if labels.is_empty() {
            return Err(PoseError::EmptyLabelSet);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(PoseError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self(labels))
    }

    /// The three-pose set the built-in fallback classifier is wired for.
    pub fn default_poses() -> Self {
        Self::numbered(3)
    }

    /// Generated names "Pose1".."PoseN", used when a classifier reports a
    /// class count that no manifest covers.
    pub fn numbered(count: usize) -> Self {
        let count = count.max(1);
        Self((1..=count).map(|i| format!("Pose{}", i)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(|s| s.as_str())
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// Next sequence position, wrapping modulo the label count.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.0.len()
    }
}

// ==============================================================================
// Classification Result
// ==============================================================================

/// Whether a result came from a real classifier or was synthesized because no
/// usable model was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrigin {
    Model,
    Synthetic,
}

/// A single inference output. Created fresh on every classification call and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f32,
    pub origin: ResultOrigin,
    pub timestamp: i64,
}

impl ClassificationResult {
    pub fn from_model(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            origin: ResultOrigin::Model,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn synthetic(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            origin: ResultOrigin::Synthetic,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == ResultOrigin::Synthetic
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("label set cannot be empty")]
    EmptyLabelSet,

    #[error("duplicate label in set: {0}")]
    DuplicateLabel(String),
}

pub type PoseResult<T> = Result<T, PoseError>;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("no usable model available")]
    Unavailable,

    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("prediction failed: {0}")]
    Predict(String),

    #[error("predicted class index {0} outside the label set")]
    LabelIndex(usize),
}

pub type InferenceResult<T> = Result<T, InferenceError>;
