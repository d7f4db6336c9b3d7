use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::ServiceError,
    prediction::{ESCALATION_THRESHOLD, PredictionResult},
    shell::Tab,
};

/// State shared by every collector and the alert workflow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedUiState {
    pub active_tab: Tab,
    pub result: Option<PredictionResult>,
    pub error_message: Option<String>,
    pub critical_alert: Option<PredictionResult>,
}

impl Default for SharedUiState {
    fn default() -> Self {
        Self {
            active_tab: Tab::Manual,
            result: None,
            error_message: None,
            critical_alert: None,
        }
    }
}

/// Identifies one submission so its completion can be matched to the
/// collector mount that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub generation: u64,
    pub tab: Tab,
}

/// "Submission completed" event emitted by a collector.
#[derive(Debug, Clone)]
pub struct SubmissionEvent {
    pub ticket: SubmissionTicket,
    pub outcome: Result<PredictionResult, ServiceError>,
}

/// What the escalation rule decided for a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Nothing to decide: the result was cleared.
    Cleared,
    NotCritical,
    /// Critical score, alert workflow opened.
    Opened,
    /// Critical score without a prediction id; no alert is possible.
    Skipped,
}

/// Returns true when a result must open the critical-alert workflow.
pub fn should_escalate(result: &PredictionResult) -> bool {
    result.risk_score > ESCALATION_THRESHOLD && result.alert_id().is_some()
}

/// Owner of the shared result, error banner and critical-alert subject.
#[derive(Debug, Clone, Default)]
pub struct Coordinator {
    state: SharedUiState,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SharedUiState {
        &self.state
    }

    /// Accept a fresh result (or `None` to clear) and apply the escalation rule.
    pub fn handle_result(&mut self, data: Option<PredictionResult>) -> Escalation {
        let Some(data) = data else {
            self.state.result = None;
            return Escalation::Cleared;
        };

        let escalation = if data.risk_score <= ESCALATION_THRESHOLD {
            Escalation::NotCritical
        } else if should_escalate(&data) {
            info!(
                prediction_id = ?data.prediction_id,
                risk_score = data.risk_score,
                "Critical risk detected, opening alert workflow"
            );
            self.state.critical_alert = Some(data.clone());
            Escalation::Opened
        } else {
            warn!(
                risk_score = data.risk_score,
                "High risk detected, but no prediction_id was provided to trigger the alert"
            );
            Escalation::Skipped
        };

        self.state.result = Some(data);
        escalation
    }

    pub fn set_error(&mut self, message: Option<String>) {
        self.state.error_message = message;
    }

    /// Clear the result and error banner, as at the start of a submission.
    pub fn reset_transient(&mut self) {
        self.state.result = None;
        self.state.error_message = None;
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.state.active_tab = tab;
        self.reset_transient();
    }

    pub fn dismiss_alert(&mut self) {
        self.state.critical_alert = None;
    }

    /// The shared card is suppressed on the symptom tab, which renders its own readout.
    pub fn shows_result_card(&self) -> bool {
        self.state.result.is_some() && self.state.active_tab != Tab::Symptoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_manual_with_nothing_set() {
        let coordinator = Coordinator::new();
        assert_eq!(coordinator.state(), &SharedUiState::default());
        assert_eq!(coordinator.state().active_tab, Tab::Manual);
    }

    #[test]
    fn scores_at_or_below_threshold_never_escalate() {
        for score in [0.0, 0.5, 0.79, 0.80, -1.0] {
            for id in [None, Some("p1")] {
                let mut coordinator = Coordinator::new();
                let mut result = PredictionResult::new(score);
                result.prediction_id = id.map(str::to_string);
                assert_eq!(
                    coordinator.handle_result(Some(result.clone())),
                    Escalation::NotCritical
                );
                assert!(coordinator.state().critical_alert.is_none());
                assert_eq!(coordinator.state().result, Some(result));
            }
        }
    }

    #[test]
    fn critical_score_with_id_escalates_with_exact_result() {
        for score in [0.8000001, 0.95, 1.0, 3.2] {
            let mut coordinator = Coordinator::new();
            let result = PredictionResult::new(score)
                .with_prediction_id("p1")
                .with_patient_name("Jane Roe");
            assert_eq!(
                coordinator.handle_result(Some(result.clone())),
                Escalation::Opened
            );
            assert_eq!(coordinator.state().critical_alert, Some(result));
        }
    }

    #[test]
    fn critical_score_without_id_is_skipped_silently() {
        for id in [None, Some("")] {
            let mut coordinator = Coordinator::new();
            let mut result = PredictionResult::new(0.81);
            result.prediction_id = id.map(str::to_string);
            assert_eq!(coordinator.handle_result(Some(result)), Escalation::Skipped);
            assert!(coordinator.state().critical_alert.is_none());
            assert!(coordinator.state().error_message.is_none());
            assert!(coordinator.state().result.is_some());
        }
    }

    #[test]
    fn none_clears_result_but_not_alert() {
        let mut coordinator = Coordinator::new();
        coordinator.handle_result(Some(PredictionResult::new(0.9).with_prediction_id("p1")));
        assert_eq!(coordinator.handle_result(None), Escalation::Cleared);
        assert!(coordinator.state().result.is_none());
        assert!(coordinator.state().critical_alert.is_some());
    }

    #[test]
    fn tab_switch_resets_result_and_error() {
        let mut coordinator = Coordinator::new();
        coordinator.handle_result(Some(PredictionResult::new(0.3)));
        coordinator.set_error(Some("Server error: 500".to_string()));

        coordinator.select_tab(Tab::Upload);
        assert_eq!(coordinator.state().active_tab, Tab::Upload);
        assert!(coordinator.state().result.is_none());
        assert!(coordinator.state().error_message.is_none());
    }

    #[test]
    fn result_card_hidden_on_symptom_tab() {
        let mut coordinator = Coordinator::new();
        coordinator.select_tab(Tab::Symptoms);
        coordinator.handle_result(Some(PredictionResult::new(0.2)));
        assert!(!coordinator.shows_result_card());

        coordinator.select_tab(Tab::Manual);
        coordinator.handle_result(Some(PredictionResult::new(0.2)));
        assert!(coordinator.shows_result_card());
    }
}
