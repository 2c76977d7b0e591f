// Confidence gating between raw classification and the sequence controller

use crate::models::pose::ClassificationResult;

/// Gate thresholds. Defaults match the tuned values: results under
/// `hold_below` are noise, results at or above `report_at` are stable
/// enough to drive the sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateThresholds {
    pub hold_below: f32,
    pub report_at: f32,
}

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            hold_below: 0.3,
            report_at: 0.5,
        }
    }
}

/// What the gate decided about a single result.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Below the hold threshold; the stable detection is unchanged.
    Hold,
    /// Intermediate confidence; the stable detection was updated but is not
    /// reported downstream.
    Update,
    /// At or above the report threshold; the detection is forwarded.
    Report(StableDetection),
}

/// The detection the gate currently considers current.
#[derive(Debug, Clone, PartialEq)]
pub struct StableDetection {
    pub label: String,
    pub confidence: f32,
}

/// Filters a stream of classification results down to stable detections.
/// Purely synchronous; one instance per session, reset on start and stop.
pub struct ConfidenceGate {
    thresholds: GateThresholds,
    stable: Option<StableDetection>,
}

impl ConfidenceGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self {
            thresholds,
            stable: None,
        }
    }

    /// Evaluate one result. Feeding the same result repeatedly yields the
    /// same decision each time; the gate holds no per-call state beyond the
    /// stable detection itself.
    pub fn accept(&mut self, result: &ClassificationResult) -> GateDecision {
        if result.confidence < self.thresholds.hold_below {
            return GateDecision::Hold;
        }

        let detection = StableDetection {
            label: result.label.clone(),
            confidence: result.confidence,
        };
        self.stable = Some(detection.clone());

        if result.confidence >= self.thresholds.report_at {
            GateDecision::Report(detection)
        } else {
            GateDecision::Update
        }
    }

    pub fn stable(&self) -> Option<&StableDetection> {
        self.stable.as_ref()
    }

    pub fn reset(&mut self) {
        self.stable = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, confidence: f32) -> ClassificationResult {
        ClassificationResult::from_model(label, confidence)
    }

    #[test]
    fn test_low_confidence_holds() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        assert_eq!(gate.accept(&result("Pose1", 0.1)), GateDecision::Hold);
        assert!(gate.stable().is_none());
    }

    #[test]
    fn test_intermediate_updates_without_reporting() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        assert_eq!(gate.accept(&result("Pose2", 0.4)), GateDecision::Update);

        let stable = gate.stable().unwrap();
        assert_eq!(stable.label, "Pose2");
        assert!((stable.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_high_confidence_reports() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        match gate.accept(&result("Pose3", 0.8)) {
            GateDecision::Report(detection) => {
                assert_eq!(detection.label, "Pose3");
                assert!((detection.confidence - 0.8).abs() < 1e-6);
            }
            other => panic!("expected report, got {:?}", other),
        }
        assert_eq!(gate.stable().unwrap().label, "Pose3");
    }

    #[test]
    fn test_boundary_values() {
        // Exactly at hold_below updates, exactly at report_at reports
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        assert_eq!(gate.accept(&result("Pose1", 0.3)), GateDecision::Update);
        assert!(matches!(
            gate.accept(&result("Pose1", 0.5)),
            GateDecision::Report(_)
        ));
    }

    #[test]
    fn test_hold_preserves_previous_stable() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        gate.accept(&result("Pose1", 0.7));
        assert_eq!(gate.accept(&result("Pose2", 0.05)), GateDecision::Hold);
        assert_eq!(gate.stable().unwrap().label, "Pose1");
    }

    #[test]
    fn test_repeated_input_is_idempotent() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        let r = result("Pose1", 0.6);
        let first = gate.accept(&r);
        let second = gate.accept(&r);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_thresholds() {
        let mut gate = ConfidenceGate::new(GateThresholds {
            hold_below: 0.6,
            report_at: 0.9,
        });
        assert_eq!(gate.accept(&result("Pose1", 0.5)), GateDecision::Hold);
        assert_eq!(gate.accept(&result("Pose1", 0.7)), GateDecision::Update);
        assert!(matches!(
            gate.accept(&result("Pose1", 0.95)),
            GateDecision::Report(_)
        ));
    }

    #[test]
    fn test_reset_clears_stable() {
        let mut gate = ConfidenceGate::new(GateThresholds::default());
        gate.accept(&result("Pose1", 0.7));
        gate.reset();
        assert!(gate.stable().is_none());
    }
}
