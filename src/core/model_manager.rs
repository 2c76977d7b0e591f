// Model lifecycle: remote load, built-in fallback, unavailable handle

use crate::core::classifier::{Classifier, FallbackClassifier, LinearClassifier};
use crate::models::model::{ModelDescriptor, ModelError, ModelMetadata, ModelOrigin, ModelResult};
use crate::models::pose::LabelSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Relative paths of the two model artifacts under a configured endpoint.
const DESCRIPTOR_FILE: &str = "model.json";
const METADATA_FILE: &str = "metadata.json";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// ==============================================================================
// Model Handle
// ==============================================================================

/// A classifier instance together with its label set. Components other than
/// the manager only ever read through this; the manager replaces the whole
/// handle on reconfiguration instead of mutating it.
pub struct LoadedModel {
    pub origin: ModelOrigin,
    pub labels: LabelSet,
    pub classifier: Box<dyn Classifier>,
}

/// Result of `ensure_loaded`. `Unavailable` is the degraded-mode signal:
/// classification calls against it yield synthetic results instead of errors.
pub enum ModelHandle {
    Loaded(LoadedModel),
    Unavailable,
}

impl ModelHandle {
    pub fn is_available(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn origin(&self) -> Option<ModelOrigin> {
        match self {
            ModelHandle::Loaded(model) => Some(model.origin),
            ModelHandle::Unavailable => None,
        }
    }

    pub fn labels(&self) -> Option<&LabelSet> {
        match self {
            ModelHandle::Loaded(model) => Some(&model.labels),
            ModelHandle::Unavailable => None,
        }
    }
}

// ==============================================================================
// Model Manager
// ==============================================================================

/// Owns the classifier lifecycle. Exactly one handle is held at a time;
/// `configure` drops it so the next `ensure_loaded` reloads from the new
/// endpoint.
pub struct ModelManager {
    endpoint: RwLock<String>,
    handle: RwLock<Option<Arc<ModelHandle>>>,
    client: reqwest::Client,
}

impl ModelManager {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: RwLock::new(Self::normalize_endpoint(endpoint)),
            handle: RwLock::new(None),
            client: reqwest::Client::new(),
        }
    }

    /// Append a trailing separator if absent, so `<base>model.json` and
    /// `<base>metadata.json` resolve the same for both spellings.
    pub fn normalize_endpoint(endpoint: &str) -> String {
        let trimmed = endpoint.trim();
        if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        }
    }

    /// Record a new model source and invalidate the held handle. The previous
    /// classifier instance is released here; no I/O happens until the next
    /// `ensure_loaded`.
    pub async fn configure(&self, endpoint: &str) {
        let normalized = Self::normalize_endpoint(endpoint);
        *self.endpoint.write().await = normalized.clone();
        *self.handle.write().await = None;
        println!("Model endpoint configured: {}", normalized);
    }

    pub async fn endpoint(&self) -> String {
        self.endpoint.read().await.clone()
    }

    /// Load the classifier if not already loaded. Attempts remote, then the
    /// built-in fallback, then gives up with `Unavailable`. Never fails
    /// outward: callers treat `Unavailable` as "run in degraded mode".
    pub async fn ensure_loaded(&self) -> Arc<ModelHandle> {
        if let Some(handle) = self.handle.read().await.clone() {
            return handle;
        }

        let handle = match self.load_remote().await {
            Ok(model) => {
                println!(
                    "Loaded remote model ({} classes) from {}",
                    model.classifier.num_classes(),
                    self.endpoint.read().await
                );
                ModelHandle::Loaded(model)
            }
            Err(e) => {
                eprintln!("Remote model load failed: {}", e);
                match Self::load_fallback() {
                    Ok(model) => {
                        println!("Using built-in fallback model");
                        ModelHandle::Loaded(model)
                    }
                    Err(e) => {
                        eprintln!("Fallback model construction failed: {}", e);
                        ModelHandle::Unavailable
                    }
                }
            }
        };

        let handle = Arc::new(handle);
        *self.handle.write().await = Some(handle.clone());
        handle
    }

    /// Fetch and validate the classifier descriptor, then the label manifest.
    /// Manifest failure is not a load failure: default labels are substituted.
    async fn load_remote(&self) -> ModelResult<LoadedModel> {
        let base = self.endpoint.read().await.clone();
        let descriptor_url = format!("{}{}", base, DESCRIPTOR_FILE);

        let response = self
            .client
            .get(&descriptor_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ModelError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ModelError::Fetch(format!(
                "{} returned {}",
                descriptor_url,
                response.status()
            )));
        }

        let descriptor: ModelDescriptor = response
            .json()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))?;

        let classifier = LinearClassifier::from_descriptor(descriptor)?;
        let labels = self.load_labels(&base, classifier.num_classes()).await;

        let model = LoadedModel {
            origin: ModelOrigin::Remote,
            labels,
            classifier: Box::new(classifier),
        };

        Self::warm_up(&model)?;
        Ok(model)
    }

    /// Fetch the label manifest. Any failure here (network, malformed JSON,
    /// missing `labels` field, count mismatch, duplicates) substitutes
    /// generated default labels rather than failing the load.
    async fn load_labels(&self, base: &str, num_classes: usize) -> LabelSet {
        let metadata_url = format!("{}{}", base, METADATA_FILE);

        let fetched = async {
            let response = self
                .client
                .get(&metadata_url)
                .timeout(FETCH_TIMEOUT)
                .send()
                .await
                .ok()?;
            if !response.status().is_success() {
                return None;
            }
            response.json::<ModelMetadata>().await.ok()?.labels
        }
        .await;

        match fetched {
            Some(labels) if labels.len() == num_classes => match LabelSet::new(labels) {
                Ok(set) => {
                    println!("Loaded labels: {:?}", set.labels());
                    set
                }
                Err(e) => {
                    eprintln!("Label manifest invalid ({}), using default labels", e);
                    LabelSet::numbered(num_classes)
                }
            },
            Some(labels) => {
                eprintln!(
                    "Label manifest has {} entries but model has {} classes, using default labels",
                    labels.len(),
                    num_classes
                );
                LabelSet::numbered(num_classes)
            }
            None => {
                eprintln!("Could not load label manifest, using default labels");
                LabelSet::numbered(num_classes)
            }
        }
    }

    /// Build the minimal built-in classifier over the default label set.
    fn load_fallback() -> ModelResult<LoadedModel> {
        let classifier = FallbackClassifier::new()?;
        let model = LoadedModel {
            origin: ModelOrigin::Fallback,
            labels: LabelSet::default_poses(),
            classifier: Box::new(classifier),
        };
        Self::warm_up(&model)?;
        Ok(model)
    }

    /// Dummy prediction on a zeroed input. Surfaces descriptor shape problems
    /// at load time instead of mid-session.
    fn warm_up(model: &LoadedModel) -> ModelResult<()> {
        let len = (model.classifier.input_width() * model.classifier.input_height() * 3) as usize;
        let zeros = vec![0.0f32; len];
        model
            .classifier
            .predict(&zeros)
            .map_err(|e| ModelError::WarmUp(e.to_string()))?;
        Ok(())
    }
}
