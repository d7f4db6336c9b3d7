//! Critical-alert workflow.
//!
//! `Closed -> Open` on escalation, `Open -> Sending` on submit, then either
//! `Sending -> Sent` (closes itself after a delay) or `Sending -> Open` with
//! the failure text so the user can retry. Cancel closes from any phase.
//!
//! Every open and every cancel bumps a generation counter. Tickets issued for
//! an older generation are ignored, which is how a late response from a
//! cancelled send is kept away from the UI.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{FlowError, Result, ServiceError},
    payload::{AlertReceipt, AlertRequest},
    prediction::PredictionResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPhase {
    Closed,
    Open,
    Sending,
    Sent,
}

/// Issued when a send starts; hand it back with the response.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTicket {
    pub generation: u64,
    pub request: AlertRequest,
}

/// Issued on a successful send; closes the workflow when honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoClose {
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct AlertWorkflow {
    phase: AlertPhase,
    subject: Option<PredictionResult>,
    clinician_email: String,
    message: Option<String>,
    generation: u64,
}

impl Default for AlertWorkflow {
    fn default() -> Self {
        Self {
            phase: AlertPhase::Closed,
            subject: None,
            clinician_email: String::new(),
            message: None,
            generation: 0,
        }
    }
}

impl AlertWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AlertPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != AlertPhase::Closed
    }

    pub fn subject(&self) -> Option<&PredictionResult> {
        self.subject.as_ref()
    }

    pub fn clinician_email(&self) -> &str {
        &self.clinician_email
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Open for a freshly escalated result. Any earlier send is orphaned.
    pub fn open(&mut self, subject: PredictionResult, default_email: Option<&str>) {
        self.generation += 1;
        self.phase = AlertPhase::Open;
        self.subject = Some(subject);
        self.clinician_email = default_email.unwrap_or_default().to_string();
        self.message = None;
    }

    pub fn set_clinician_email(&mut self, email: impl Into<String>) -> Result<()> {
        if !self.is_open() {
            return Err(FlowError::AlertNotOpen);
        }
        self.clinician_email = email.into();
        Ok(())
    }

    /// Validate the form and move to `Sending`.
    pub fn begin_send(&mut self) -> Result<AlertTicket> {
        match self.phase {
            AlertPhase::Closed => return Err(FlowError::AlertNotOpen),
            AlertPhase::Sending => return Err(FlowError::AlertSendInFlight),
            AlertPhase::Open | AlertPhase::Sent => {}
        }

        let prediction_id = self
            .subject
            .as_ref()
            .and_then(|s| s.alert_id())
            .map(str::to_string)
            .ok_or(FlowError::AlertNotOpen)?;

        let email = self.clinician_email.trim().to_string();
        if let Err(reason) = validate_clinician_email(&email) {
            self.message = Some(reason.clone());
            return Err(FlowError::LocalValidation(reason));
        }

        self.phase = AlertPhase::Sending;
        self.message = None;
        info!(prediction_id = %prediction_id, "Alert send started");

        Ok(AlertTicket {
            generation: self.generation,
            request: AlertRequest {
                prediction_id,
                clinician_email: email,
            },
        })
    }

    /// Apply the outcome of a send. Returns an auto-close token on success.
    pub fn complete_send(
        &mut self,
        ticket: &AlertTicket,
        outcome: std::result::Result<AlertReceipt, ServiceError>,
    ) -> Option<AutoClose> {
        if ticket.generation != self.generation || self.phase != AlertPhase::Sending {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding alert response for a closed or replaced alert"
            );
            return None;
        }

        match outcome {
            Ok(receipt) => {
                info!(prediction_id = %ticket.request.prediction_id, "Alert sent");
                self.phase = AlertPhase::Sent;
                self.message = Some(receipt.message);
                Some(AutoClose {
                    generation: self.generation,
                })
            }
            Err(err) => {
                warn!(
                    prediction_id = %ticket.request.prediction_id,
                    error = %err,
                    "Alert send failed"
                );
                self.phase = AlertPhase::Open;
                self.message = Some(err.alert_message());
                None
            }
        }
    }

    /// Close after a successful send, unless the workflow moved on meanwhile.
    pub fn auto_close(&mut self, token: AutoClose) -> bool {
        if token.generation == self.generation && self.phase == AlertPhase::Sent {
            self.close();
            true
        } else {
            false
        }
    }

    /// Close immediately. A send still in flight loses its effect.
    pub fn cancel(&mut self) {
        if self.phase == AlertPhase::Sending {
            info!("Alert cancelled while sending; response will be ignored");
        }
        self.close();
    }

    fn close(&mut self) {
        self.generation += 1;
        self.phase = AlertPhase::Closed;
        self.subject = None;
        self.message = None;
    }

    pub fn view(&self) -> Option<AlertView> {
        let subject = self.subject.as_ref()?;
        if !self.is_open() {
            return None;
        }
        Some(AlertView {
            phase: self.phase,
            patient_name: subject
                .patient_name
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "N/A".to_string()),
            risk_percent: subject.percent(),
            clinician_email: self.clinician_email.clone(),
            message: self.message.clone(),
            can_send: matches!(self.phase, AlertPhase::Open | AlertPhase::Sent),
            can_cancel: true,
        })
    }
}

/// Minimal shape check: one `@` with text on both sides and no whitespace.
pub fn validate_clinician_email(email: &str) -> std::result::Result<(), String> {
    if email.is_empty() {
        return Err("Please enter the responsible clinician's email.".to_string());
    }
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid email address.", email))
    }
}

/// Read-only snapshot of the alert modal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertView {
    pub phase: AlertPhase,
    pub patient_name: String,
    pub risk_percent: String,
    pub clinician_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub can_send: bool,
    pub can_cancel: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> AlertWorkflow {
        let mut workflow = AlertWorkflow::new();
        workflow.open(
            PredictionResult::new(0.95).with_prediction_id("p1"),
            Some("supervisor@hospital.com"),
        );
        workflow
    }

    #[test]
    fn opens_prefilled() {
        let workflow = opened();
        let view = workflow.view().unwrap();
        assert_eq!(view.phase, AlertPhase::Open);
        assert_eq!(view.clinician_email, "supervisor@hospital.com");
        assert_eq!(view.patient_name, "N/A");
        assert_eq!(view.risk_percent, "95.0%");
        assert!(view.can_send);
    }

    #[test]
    fn send_success_then_auto_close() {
        let mut workflow = opened();
        let ticket = workflow.begin_send().unwrap();
        assert_eq!(ticket.request.prediction_id, "p1");
        assert_eq!(workflow.phase(), AlertPhase::Sending);
        assert!(!workflow.view().unwrap().can_send);
        assert!(matches!(
            workflow.begin_send(),
            Err(FlowError::AlertSendInFlight)
        ));

        let token = workflow
            .complete_send(
                &ticket,
                Ok(AlertReceipt {
                    message: "Alert sent successfully".to_string(),
                }),
            )
            .unwrap();
        assert_eq!(workflow.phase(), AlertPhase::Sent);
        assert_eq!(workflow.message(), Some("Alert sent successfully"));

        assert!(workflow.auto_close(token));
        assert_eq!(workflow.phase(), AlertPhase::Closed);
        assert!(workflow.view().is_none());
    }

    #[test]
    fn send_failure_keeps_modal_open_with_detail() {
        let mut workflow = opened();
        let ticket = workflow.begin_send().unwrap();
        let token = workflow.complete_send(
            &ticket,
            Err(ServiceError::Server {
                status: 500,
                detail: Some("SMTP down".to_string()),
            }),
        );
        assert!(token.is_none());
        assert_eq!(workflow.phase(), AlertPhase::Open);
        assert_eq!(workflow.message(), Some("SMTP down"));

        // retry is allowed
        assert!(workflow.begin_send().is_ok());
    }

    #[test]
    fn cancel_discards_late_response() {
        let mut workflow = opened();
        let ticket = workflow.begin_send().unwrap();
        workflow.cancel();
        assert_eq!(workflow.phase(), AlertPhase::Closed);

        let token = workflow.complete_send(
            &ticket,
            Ok(AlertReceipt {
                message: "Alert sent successfully".to_string(),
            }),
        );
        assert!(token.is_none());
        assert_eq!(workflow.phase(), AlertPhase::Closed);
    }

    #[test]
    fn stale_auto_close_does_not_close_a_new_alert() {
        let mut workflow = opened();
        let ticket = workflow.begin_send().unwrap();
        let token = workflow
            .complete_send(&ticket, Ok(AlertReceipt { message: "ok".into() }))
            .unwrap();

        workflow.open(
            PredictionResult::new(0.99).with_prediction_id("p2"),
            Some("supervisor@hospital.com"),
        );
        assert!(!workflow.auto_close(token));
        assert_eq!(workflow.phase(), AlertPhase::Open);
    }

    #[test]
    fn invalid_email_blocks_send() {
        let mut workflow = AlertWorkflow::new();
        workflow.open(PredictionResult::new(0.9).with_prediction_id("p1"), None);
        assert!(matches!(
            workflow.begin_send(),
            Err(FlowError::LocalValidation(_))
        ));
        assert_eq!(workflow.phase(), AlertPhase::Open);
        assert!(workflow.message().is_some());

        workflow.set_clinician_email("not-an-address").unwrap();
        assert!(workflow.begin_send().is_err());

        workflow.set_clinician_email(" dr.who@clinic.example ").unwrap();
        let ticket = workflow.begin_send().unwrap();
        assert_eq!(ticket.request.clinician_email, "dr.who@clinic.example");
    }

    #[test]
    fn closed_workflow_rejects_actions() {
        let mut workflow = AlertWorkflow::new();
        assert!(matches!(workflow.begin_send(), Err(FlowError::AlertNotOpen)));
        assert!(matches!(
            workflow.set_clinician_email("a@b"),
            Err(FlowError::AlertNotOpen)
        ));
    }

    #[test]
    fn email_shape_check() {
        assert!(validate_clinician_email("a@b").is_ok());
        assert!(validate_clinician_email("").is_err());
        assert!(validate_clinician_email("@b").is_err());
        assert!(validate_clinician_email("a@").is_err());
        assert!(validate_clinician_email("a@b@c").is_err());
        assert!(validate_clinician_email("a b@c").is_err());
    }
}
