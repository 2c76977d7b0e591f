pub mod core;
pub mod models;

pub use crate::core::camera::{CameraBackend, CameraSource, FrameSource, SyntheticCamera};
pub use crate::core::confidence_gate::{ConfidenceGate, GateDecision, GateThresholds};
pub use crate::core::inference::InferenceEngine;
pub use crate::core::model_manager::{ModelHandle, ModelManager};
pub use crate::core::sequence::{SequenceController, SequencePhase, SequenceTiming};
pub use crate::core::session::{RecognitionSession, SessionConfig, SessionEvent};
pub use crate::core::settings::Settings;
pub use crate::models::pose::{ClassificationResult, LabelSet, ResultOrigin};

use std::sync::Arc;
use tokio::sync::mpsc;

// Engine state wired from settings
pub struct RecognitionEngine {
    pub settings: Settings,
    pub model_manager: Arc<ModelManager>,
    pub session: Arc<RecognitionSession>,
}

impl RecognitionEngine {
    /// Wire the full pipeline from persisted settings and a camera backend.
    /// The returned receiver carries every `SessionEvent` the session emits.
    pub fn new(
        settings: Settings,
        backend: Box<dyn CameraBackend>,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);

        let model_manager = Arc::new(ModelManager::new(&settings.model_url));
        let camera = CameraSource::new(backend);
        let session = Arc::new(RecognitionSession::new(
            SessionConfig::default(),
            Arc::clone(&model_manager),
            camera,
            event_tx,
        ));

        (
            Self {
                settings,
                model_manager,
                session,
            },
            event_rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_engine_wiring_uses_settings_endpoint() {
        let mut settings = Settings::default();
        settings.model_url = "http://127.0.0.1:1/model".to_string();

        let (engine, _rx) = RecognitionEngine::new(settings, Box::new(SyntheticCamera));
        assert_eq!(
            engine.model_manager.endpoint().await,
            "http://127.0.0.1:1/model/"
        );
        assert!(!engine.session.is_running().await);
    }
}
