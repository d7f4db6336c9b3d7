use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::{
    alert::{AlertTicket, AlertView, AlertWorkflow, AutoClose},
    collector::{CollectorView, MountedCollector, Submission},
    coordinator::{Coordinator, Escalation, SharedUiState, SubmissionEvent, SubmissionTicket},
    error::{FlowError, Result, ServiceError},
    payload::{AlertReceipt, ManualEntry, ReportFile, SymptomFlags},
    prediction::ResultCard,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    Manual,
    Symptoms,
    Upload,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tab::Manual => "manual",
            Tab::Symptoms => "symptoms",
            Tab::Upload => "upload",
        };
        f.write_str(name)
    }
}

/// A submission accepted by the shell, waiting for its network half.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub ticket: SubmissionTicket,
    pub submission: Submission,
}

/// Everything a page needs to render the console.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellView {
    pub active_tab: Tab,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub result_card: Option<ResultCard>,
    pub collector: CollectorView,
    pub alert: Option<AlertView>,
}

/// The console's state container: active tab, one mounted collector, the
/// coordinator's shared state and the alert workflow.
///
/// All methods are synchronous. Network calls happen between a `begin_*`
/// and the matching `complete_*`, outside of any borrow of the shell.
#[derive(Debug, Clone)]
pub struct Shell {
    coordinator: Coordinator,
    collector: MountedCollector,
    alert: AlertWorkflow,
    mount_generation: u64,
    default_clinician_email: Option<String>,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Shell {
    pub fn new(default_clinician_email: Option<String>) -> Self {
        Self {
            coordinator: Coordinator::new(),
            collector: MountedCollector::mount(Tab::Manual),
            alert: AlertWorkflow::new(),
            mount_generation: 0,
            default_clinician_email,
        }
    }

    pub fn state(&self) -> &SharedUiState {
        self.coordinator.state()
    }

    pub fn active_tab(&self) -> Tab {
        self.coordinator.state().active_tab
    }

    pub fn collector(&self) -> &MountedCollector {
        &self.collector
    }

    pub fn alert(&self) -> &AlertWorkflow {
        &self.alert
    }

    /// Switch tabs. Clears result and error; a different tab remounts its
    /// collector, dropping the outgoing collector's form state.
    pub fn select_tab(&mut self, tab: Tab) {
        let previous = self.active_tab();
        self.coordinator.select_tab(tab);
        if previous != tab {
            info!(from = %previous, to = %tab, "Switching tab");
            self.collector = MountedCollector::mount(tab);
            self.mount_generation += 1;
        }
    }

    pub fn edit_manual(&mut self, entry: ManualEntry) -> Result<()> {
        match &mut self.collector {
            MountedCollector::Manual(c) => {
                c.entry = entry;
                Ok(())
            }
            _ => Err(self.wrong_tab(Tab::Manual)),
        }
    }

    pub fn edit_symptoms(&mut self, flags: SymptomFlags) -> Result<()> {
        match &mut self.collector {
            MountedCollector::Symptoms(c) => {
                c.flags = flags;
                Ok(())
            }
            _ => Err(self.wrong_tab(Tab::Symptoms)),
        }
    }

    pub fn choose_report(&mut self, report: ReportFile) -> Result<()> {
        match &mut self.collector {
            MountedCollector::Upload(c) => {
                c.choose(report);
                Ok(())
            }
            _ => Err(self.wrong_tab(Tab::Upload)),
        }
    }

    pub fn clear_report(&mut self) -> Result<()> {
        match &mut self.collector {
            MountedCollector::Upload(c) => {
                c.clear();
                Ok(())
            }
            _ => Err(self.wrong_tab(Tab::Upload)),
        }
    }

    fn wrong_tab(&self, expected: Tab) -> FlowError {
        FlowError::WrongTab {
            expected,
            actual: self.active_tab(),
        }
    }

    /// Start a submission of the mounted collector.
    ///
    /// Local validation failures go to the error banner and no request is
    /// produced. While a request is in flight further submits are refused.
    pub fn begin_submission(&mut self) -> Result<PendingSubmission> {
        let collector = self.collector.as_collector();
        if collector.is_loading() {
            return Err(FlowError::SubmissionInFlight);
        }

        let submission = match collector.prepare() {
            Ok(submission) => submission,
            Err(err) => {
                if let FlowError::LocalValidation(message) = &err {
                    self.coordinator.set_error(Some(message.clone()));
                }
                return Err(err);
            }
        };

        let collector = self.collector.as_collector_mut();
        collector.set_loading(true);
        collector.on_submit_start();
        let tab = collector.tab();
        self.coordinator.set_error(None);
        self.coordinator.handle_result(None);

        Ok(PendingSubmission {
            ticket: SubmissionTicket {
                generation: self.mount_generation,
                tab,
            },
            submission,
        })
    }

    /// Apply a completed submission. Completions from an unmounted
    /// collector are dropped and yield `None`.
    pub fn complete_submission(&mut self, event: SubmissionEvent) -> Option<Escalation> {
        if event.ticket.generation != self.mount_generation {
            debug!(
                tab = %event.ticket.tab,
                "Discarding response for a collector that is no longer mounted"
            );
            return None;
        }

        let collector = self.collector.as_collector_mut();
        collector.set_loading(false);

        match event.outcome {
            Ok(result) => {
                collector.on_success(&result);
                let escalation = self.coordinator.handle_result(Some(result));
                if escalation == Escalation::Opened {
                    if let Some(subject) = self.coordinator.state().critical_alert.clone() {
                        self.alert
                            .open(subject, self.default_clinician_email.as_deref());
                    }
                }
                Some(escalation)
            }
            Err(err) => {
                let message = collector.failure_message(&err);
                self.coordinator.set_error(Some(message));
                None
            }
        }
    }

    pub fn set_clinician_email(&mut self, email: impl Into<String>) -> Result<()> {
        self.alert.set_clinician_email(email)
    }

    pub fn begin_alert_send(&mut self) -> Result<AlertTicket> {
        self.alert.begin_send()
    }

    pub fn complete_alert_send(
        &mut self,
        ticket: &AlertTicket,
        outcome: std::result::Result<AlertReceipt, ServiceError>,
    ) -> Option<AutoClose> {
        self.alert.complete_send(ticket, outcome)
    }

    pub fn auto_close_alert(&mut self, token: AutoClose) -> bool {
        let closed = self.alert.auto_close(token);
        if closed {
            self.coordinator.dismiss_alert();
        }
        closed
    }

    /// Explicit dismissal of the alert modal.
    pub fn cancel_alert(&mut self) {
        self.alert.cancel();
        self.coordinator.dismiss_alert();
    }

    pub fn view(&self) -> ShellView {
        let state = self.coordinator.state();
        let result_card = if self.coordinator.shows_result_card() {
            state.result.as_ref().map(ResultCard::from)
        } else {
            None
        };

        ShellView {
            active_tab: state.active_tab,
            is_loading: self.collector.as_collector().is_loading(),
            error_message: state.error_message.clone(),
            result_card,
            collector: self.collector.view(),
            alert: self.alert.view(),
        }
    }
}
