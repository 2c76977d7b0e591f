// Pose sequence progression: listening, countdown, advance

use crate::models::pose::LabelSet;
use std::time::Duration;

/// Countdown pacing. Timers themselves live in the session driver; the
/// controller only exposes the values it should be driven with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceTiming {
    /// Starting countdown value, displayed immediately on a match.
    pub countdown_from: u8,
    /// Delay between countdown decrements.
    pub tick: Duration,
    /// Extra delay after the countdown reaches zero, before advancing.
    pub trailing_delay: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            countdown_from: 3,
            tick: Duration::from_secs(1),
            trailing_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// No session running.
    Idle,
    /// Waiting for the expected pose to be reported.
    Listening,
    /// Expected pose matched; counting down before advancing.
    Counting,
}

/// What the controller did with a reported detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The expected pose was matched; the countdown has started.
    Matched,
    /// Some other pose; recorded but no transition.
    NoMatch,
    /// Report arrived outside `Listening` and was dropped.
    Ignored,
}

/// One countdown decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Countdown still running; the value to display.
    Continue(u8),
    /// Countdown finished; hold for the trailing delay, then advance.
    Done,
}

/// Drives the ordered pose sequence. Purely synchronous state machine;
/// the session owns the clock and calls `countdown_tick` on schedule.
pub struct SequenceController {
    labels: LabelSet,
    timing: SequenceTiming,
    phase: SequencePhase,
    expected_index: usize,
    countdown_remaining: Option<u8>,
    last_detected: Option<String>,
}

impl SequenceController {
    pub fn new(labels: LabelSet, timing: SequenceTiming) -> Self {
        Self {
            labels,
            timing,
            phase: SequencePhase::Idle,
            expected_index: 0,
            countdown_remaining: None,
            last_detected: None,
        }
    }

    pub fn phase(&self) -> SequencePhase {
        self.phase
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn timing(&self) -> SequenceTiming {
        self.timing
    }

    pub fn expected_index(&self) -> usize {
        self.expected_index
    }

    /// Label the sequence is currently waiting for.
    pub fn expected_label(&self) -> &str {
        self.labels.get(self.expected_index).unwrap_or("")
    }

    pub fn last_detected(&self) -> Option<&str> {
        self.last_detected.as_deref()
    }

    /// Replace the label set, used when a model load yields different labels
    /// than the controller was built with. Resets progression to the start.
    pub fn set_labels(&mut self, labels: LabelSet) {
        self.labels = labels;
        self.expected_index = 0;
        self.countdown_remaining = None;
        self.last_detected = None;
        if self.phase == SequencePhase::Counting {
            self.phase = SequencePhase::Listening;
        }
    }

    /// Begin listening from the first pose. Safe to call when already
    /// started; progression restarts from index zero.
    pub fn start(&mut self) {
        self.phase = SequencePhase::Listening;
        self.expected_index = 0;
        self.countdown_remaining = None;
        self.last_detected = None;
    }

    /// Return to idle and clear all progression state.
    pub fn stop(&mut self) {
        self.phase = SequencePhase::Idle;
        self.expected_index = 0;
        self.countdown_remaining = None;
        self.last_detected = None;
    }

    /// Handle a stable detection from the gate. Reports are only acted on
    /// while listening; during a countdown they are dropped so a wobbling
    /// classifier cannot restart or skip the countdown.
    pub fn on_report(&mut self, label: &str) -> ReportOutcome {
        if self.phase != SequencePhase::Listening {
            return ReportOutcome::Ignored;
        }

        self.last_detected = Some(label.to_string());

        if label == self.expected_label() {
            self.phase = SequencePhase::Counting;
            self.countdown_remaining = Some(self.timing.countdown_from);
            ReportOutcome::Matched
        } else {
            ReportOutcome::NoMatch
        }
    }

    /// Decrement the countdown. Call once per tick interval after the
    /// initial value has been displayed.
    pub fn countdown_tick(&mut self) -> CountdownStep {
        let remaining = match self.countdown_remaining {
            Some(r) if self.phase == SequencePhase::Counting => r,
            _ => return CountdownStep::Done,
        };

        if remaining <= 1 {
            self.countdown_remaining = Some(0);
            CountdownStep::Done
        } else {
            self.countdown_remaining = Some(remaining - 1);
            CountdownStep::Continue(remaining - 1)
        }
    }

    pub fn countdown_remaining(&self) -> Option<u8> {
        self.countdown_remaining
    }

    /// Move to the next pose in order, wrapping at the end of the label set,
    /// and resume listening. Returns the new expected index.
    pub fn advance(&mut self) -> usize {
        self.expected_index = self.labels.next_index(self.expected_index);
        self.phase = SequencePhase::Listening;
        self.countdown_remaining = None;
        self.expected_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SequenceController {
        SequenceController::new(LabelSet::default_poses(), SequenceTiming::default())
    }

    #[test]
    fn test_starts_idle_listening_on_start() {
        let mut c = controller();
        assert_eq!(c.phase(), SequencePhase::Idle);

        c.start();
        assert_eq!(c.phase(), SequencePhase::Listening);
        assert_eq!(c.expected_index(), 0);
        assert_eq!(c.expected_label(), "Pose1");
    }

    #[test]
    fn test_report_before_start_is_ignored() {
        let mut c = controller();
        assert_eq!(c.on_report("Pose1"), ReportOutcome::Ignored);
        assert_eq!(c.phase(), SequencePhase::Idle);
    }

    #[test]
    fn test_mismatched_report_records_but_stays_listening() {
        let mut c = controller();
        c.start();
        assert_eq!(c.on_report("Pose3"), ReportOutcome::NoMatch);
        assert_eq!(c.phase(), SequencePhase::Listening);
        assert_eq!(c.last_detected(), Some("Pose3"));
        assert_eq!(c.expected_index(), 0);
    }

    #[test]
    fn test_match_starts_countdown() {
        let mut c = controller();
        c.start();
        assert_eq!(c.on_report("Pose1"), ReportOutcome::Matched);
        assert_eq!(c.phase(), SequencePhase::Counting);
        assert_eq!(c.countdown_remaining(), Some(3));
    }

    #[test]
    fn test_reports_during_countdown_are_dropped() {
        let mut c = controller();
        c.start();
        c.on_report("Pose1");

        assert_eq!(c.on_report("Pose1"), ReportOutcome::Ignored);
        assert_eq!(c.on_report("Pose2"), ReportOutcome::Ignored);
        assert_eq!(c.countdown_remaining(), Some(3));
    }

    #[test]
    fn test_countdown_ticks_down_to_done() {
        let mut c = controller();
        c.start();
        c.on_report("Pose1");

        assert_eq!(c.countdown_tick(), CountdownStep::Continue(2));
        assert_eq!(c.countdown_tick(), CountdownStep::Continue(1));
        assert_eq!(c.countdown_tick(), CountdownStep::Done);
        assert_eq!(c.countdown_remaining(), Some(0));
    }

    #[test]
    fn test_advance_wraps_modulo_label_count() {
        let mut c = controller();
        c.start();

        assert_eq!(c.advance(), 1);
        assert_eq!(c.expected_label(), "Pose2");
        assert_eq!(c.advance(), 2);
        assert_eq!(c.advance(), 0);
        assert_eq!(c.expected_label(), "Pose1");
        assert_eq!(c.phase(), SequencePhase::Listening);
    }

    #[test]
    fn test_full_cycle() {
        let mut c = controller();
        c.start();

        for expected in ["Pose1", "Pose2", "Pose3", "Pose1"] {
            assert_eq!(c.expected_label(), expected);
            assert_eq!(c.on_report(expected), ReportOutcome::Matched);
            while c.countdown_tick() != CountdownStep::Done {}
            c.advance();
        }
        assert_eq!(c.expected_index(), 1);
    }

    #[test]
    fn test_stop_resets_everything() {
        let mut c = controller();
        c.start();
        c.on_report("Pose1");
        c.stop();

        assert_eq!(c.phase(), SequencePhase::Idle);
        assert_eq!(c.expected_index(), 0);
        assert!(c.countdown_remaining().is_none());
        assert!(c.last_detected().is_none());
    }

    #[test]
    fn test_set_labels_resets_progression() {
        let mut c = controller();
        c.start();
        c.advance();

        c.set_labels(LabelSet::numbered(5));
        assert_eq!(c.expected_index(), 0);
        assert_eq!(c.expected_label(), "Pose1");
        assert_eq!(c.phase(), SequencePhase::Listening);
    }
}
