// Recognition session: wires camera, inference, gate and sequence together

use crate::core::camera::CameraSource;
use crate::core::confidence_gate::{ConfidenceGate, GateDecision, GateThresholds};
use crate::core::inference::InferenceEngine;
use crate::core::model_manager::{ModelHandle, ModelManager};
use crate::core::sequence::{CountdownStep, ReportOutcome, SequenceController, SequenceTiming};
use crate::models::pose::{ClassificationResult, LabelSet};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

// ==============================================================================
// Configuration
// ==============================================================================

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between classification attempts.
    pub classify_interval: Duration,
    pub gate: GateThresholds,
    pub timing: SequenceTiming,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            classify_interval: Duration::from_millis(500),
            gate: GateThresholds::default(),
            timing: SequenceTiming::default(),
        }
    }
}

// ==============================================================================
// Events
// ==============================================================================

/// Everything the session tells the outside world. Consumed from the channel
/// handed to `RecognitionSession::new`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session_id: String,
        expected_label: String,
    },
    /// A detection passed the confidence gate (update or report).
    PoseDetected {
        label: String,
        confidence: f32,
        synthetic: bool,
    },
    /// The expected pose was matched; countdown starts.
    PoseMatched { label: String },
    CountdownTick { remaining: u8 },
    SequenceAdvanced {
        expected_index: usize,
        expected_label: String,
    },
    /// The session is running without a real model or camera.
    Degraded { reason: String },
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a recognition session is already running")]
    AlreadyRunning,
}

pub type SessionResult<T> = Result<T, SessionError>;

// ==============================================================================
// Recognition Session
// ==============================================================================

/// Drives the whole pipeline on a fixed tick. Each `start` mints a session id
/// that every spawned task checks before touching state, so a stale task from
/// a previous session can never mutate or emit after `stop`.
pub struct RecognitionSession {
    config: SessionConfig,
    model_manager: Arc<ModelManager>,
    engine: InferenceEngine,
    gate: Mutex<ConfidenceGate>,
    sequence: Mutex<SequenceController>,
    camera: Mutex<CameraSource>,
    epoch: RwLock<Option<Uuid>>,
    in_flight: AtomicBool,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl RecognitionSession {
    pub fn new(
        config: SessionConfig,
        model_manager: Arc<ModelManager>,
        camera: CameraSource,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let gate = ConfidenceGate::new(config.gate);
        let sequence = SequenceController::new(LabelSet::default_poses(), config.timing);

        Self {
            config,
            model_manager,
            engine: InferenceEngine::new(),
            gate: Mutex::new(gate),
            sequence: Mutex::new(sequence),
            camera: Mutex::new(camera),
            epoch: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            event_tx,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.epoch.read().await.is_some()
    }

    /// Start a session: load the model, acquire the camera, begin the
    /// classification loop. Model and camera failures degrade the session
    /// instead of failing the start.
    pub async fn start(self: &Arc<Self>) -> SessionResult<Uuid> {
        let session_id = {
            let mut epoch = self.epoch.write().await;
            if epoch.is_some() {
                return Err(SessionError::AlreadyRunning);
            }
            let id = Uuid::new_v4();
            *epoch = Some(id);
            id
        };

        self.gate.lock().await.reset();

        let handle = self.model_manager.ensure_loaded().await;
        match handle.labels() {
            Some(labels) => {
                let mut sequence = self.sequence.lock().await;
                if sequence.labels() != labels {
                    sequence.set_labels(labels.clone());
                }
                sequence.start();
            }
            None => {
                self.sequence.lock().await.start();
                self.emit(SessionEvent::Degraded {
                    reason: "no usable model, results will be synthetic".to_string(),
                })
                .await;
            }
        }

        if let Err(e) = self.camera.lock().await.acquire().await {
            eprintln!("Camera unavailable for session {}: {}", session_id, e);
            self.emit(SessionEvent::Degraded {
                reason: format!("camera unavailable: {}", e),
            })
            .await;
        }

        let expected_label = self.sequence.lock().await.expected_label().to_string();
        self.emit(SessionEvent::Started {
            session_id: session_id.to_string(),
            expected_label,
        })
        .await;

        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.classification_loop(session_id).await;
        });

        println!("Recognition session {} started", session_id);
        Ok(session_id)
    }

    /// Stop the session. Idempotent; a second call is a no-op.
    pub async fn stop(self: &Arc<Self>) {
        let stopped = self.epoch.write().await.take();
        if stopped.is_none() {
            return;
        }

        self.gate.lock().await.reset();
        self.sequence.lock().await.stop();
        self.camera.lock().await.release().await;
        self.emit(SessionEvent::Stopped).await;
        println!("Recognition session stopped");
    }

    /// Fixed-interval classification driver. One in-flight classification at
    /// a time: a tick that fires while the previous one is still working is
    /// skipped outright rather than queued.
    async fn classification_loop(self: Arc<Self>, session_id: Uuid) {
        let mut interval = tokio::time::interval(self.config.classify_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if *self.epoch.read().await != Some(session_id) {
                break;
            }

            if self.in_flight.swap(true, Ordering::SeqCst) {
                continue;
            }
            self.classify_once(session_id).await;
            self.in_flight.store(false, Ordering::SeqCst);
        }
    }

    /// One classification attempt: frame to result, result through the gate.
    /// Every failure path degrades to a synthetic result so the pipeline
    /// keeps producing output.
    async fn classify_once(self: &Arc<Self>, session_id: Uuid) {
        let handle = self.model_manager.ensure_loaded().await;

        let frame = self.camera.lock().await.next_frame().await;

        let result = match frame {
            Ok(frame) => match self.engine.classify(&frame, &handle) {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("Classification failed, using synthetic result: {}", e);
                    self.synthetic_result(&handle).await
                }
            },
            Err(e) => {
                eprintln!("Frame capture failed, using synthetic result: {}", e);
                self.synthetic_result(&handle).await
            }
        };

        // A stop may have landed while classifying
        if *self.epoch.read().await != Some(session_id) {
            return;
        }

        self.process_result(&result, session_id).await;
    }

    async fn synthetic_result(&self, handle: &ModelHandle) -> ClassificationResult {
        let labels = match handle.labels() {
            Some(labels) => labels.clone(),
            None => LabelSet::default_poses(),
        };
        self.engine.synthetic_result(&labels)
    }

    /// Route one result through the gate and, on a report, the sequence.
    async fn process_result(self: &Arc<Self>, result: &ClassificationResult, session_id: Uuid) {
        let decision = self.gate.lock().await.accept(result);

        match decision {
            GateDecision::Hold => {}
            GateDecision::Update => {
                self.emit(SessionEvent::PoseDetected {
                    label: result.label.clone(),
                    confidence: result.confidence,
                    synthetic: result.is_synthetic(),
                })
                .await;
            }
            GateDecision::Report(detection) => {
                self.emit(SessionEvent::PoseDetected {
                    label: detection.label.clone(),
                    confidence: detection.confidence,
                    synthetic: result.is_synthetic(),
                })
                .await;

                let outcome = self.sequence.lock().await.on_report(&detection.label);
                if outcome == ReportOutcome::Matched {
                    self.emit(SessionEvent::PoseMatched {
                        label: detection.label.clone(),
                    })
                    .await;

                    let session = Arc::clone(self);
                    tokio::spawn(async move {
                        session.countdown(session_id).await;
                    });
                }
            }
        }
    }

    /// Countdown task spawned on a match. Displays the initial value
    /// immediately, decrements on each tick, holds the trailing delay, then
    /// advances the sequence.
    async fn countdown(self: Arc<Self>, session_id: Uuid) {
        let timing = self.config.timing;

        self.emit(SessionEvent::CountdownTick {
            remaining: timing.countdown_from,
        })
        .await;

        loop {
            tokio::time::sleep(timing.tick).await;

            if *self.epoch.read().await != Some(session_id) {
                return;
            }

            match self.sequence.lock().await.countdown_tick() {
                CountdownStep::Continue(remaining) => {
                    self.emit(SessionEvent::CountdownTick { remaining }).await;
                }
                CountdownStep::Done => {
                    self.emit(SessionEvent::CountdownTick { remaining: 0 }).await;
                    break;
                }
            }
        }

        tokio::time::sleep(timing.trailing_delay).await;

        if *self.epoch.read().await != Some(session_id) {
            return;
        }

        let (expected_index, expected_label) = {
            let mut sequence = self.sequence.lock().await;
            let index = sequence.advance();
            (index, sequence.expected_label().to_string())
        };

        self.emit(SessionEvent::SequenceAdvanced {
            expected_index,
            expected_label,
        })
        .await;
    }

    async fn emit(&self, event: SessionEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.event_tx.send(event).await;
    }
}
