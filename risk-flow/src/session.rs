use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::{
    sync::Mutex,
    task::{AbortHandle, Id as TaskId},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    alert::AutoClose,
    client::PredictionService,
    config::FlowConfig,
    coordinator::SubmissionEvent,
    error::{FlowError, Result, ServiceError},
    payload::{ManualEntry, ReportFile, SymptomFlags},
    shell::{Shell, ShellView, Tab},
};

/// One console instance: a `Shell` plus the service it talks to.
///
/// The shell lock is never held across a network call. Each operation takes
/// the lock to begin, releases it for the request, and re-takes it to apply
/// the outcome.
pub struct ConsoleSession {
    id: String,
    shell: Mutex<Shell>,
    service: Arc<dyn PredictionService>,
    alert_auto_close: Duration,
    alert_task: StdMutex<Option<AbortHandle>>,
    last_active: StdMutex<Instant>,
}

impl ConsoleSession {
    pub fn new(service: Arc<dyn PredictionService>, config: &FlowConfig) -> Arc<Self> {
        Self::with_id(Uuid::new_v4().to_string(), service, config)
    }

    pub fn with_id(
        id: impl Into<String>,
        service: Arc<dyn PredictionService>,
        config: &FlowConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            shell: Mutex::new(Shell::new(config.default_clinician_email.clone())),
            service,
            alert_auto_close: config.alert_auto_close,
            alert_task: StdMutex::new(None),
            last_active: StdMutex::new(Instant::now()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record a request against this session.
    pub fn touch(&self) {
        *self
            .last_active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    /// Time since the last `touch` (or since creation).
    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }

    pub async fn view(&self) -> ShellView {
        self.shell.lock().await.view()
    }

    pub async fn select_tab(&self, tab: Tab) -> ShellView {
        let mut shell = self.shell.lock().await;
        shell.select_tab(tab);
        shell.view()
    }

    pub async fn edit_manual(&self, entry: ManualEntry) -> Result<ShellView> {
        let mut shell = self.shell.lock().await;
        shell.edit_manual(entry)?;
        Ok(shell.view())
    }

    pub async fn edit_symptoms(&self, flags: SymptomFlags) -> Result<ShellView> {
        let mut shell = self.shell.lock().await;
        shell.edit_symptoms(flags)?;
        Ok(shell.view())
    }

    pub async fn choose_report(&self, report: ReportFile) -> Result<ShellView> {
        let mut shell = self.shell.lock().await;
        shell.choose_report(report)?;
        Ok(shell.view())
    }

    pub async fn clear_report(&self) -> Result<ShellView> {
        let mut shell = self.shell.lock().await;
        shell.clear_report()?;
        Ok(shell.view())
    }

    /// Submit the mounted collector and wait for its response.
    ///
    /// Local validation failures are not errors here: they land in the
    /// view's error banner. A second submit while one is pending fails with
    /// `SubmissionInFlight`.
    ///
    /// The request and its completion run in their own task, so the
    /// collector leaves the loading state even if the caller stops waiting.
    pub async fn submit(self: &Arc<Self>) -> Result<ShellView> {
        let started = self.shell.lock().await.begin_submission();
        let pending = match started {
            Ok(pending) => pending,
            Err(FlowError::LocalValidation(message)) => {
                debug!(session_id = %self.id, "Submission rejected locally: {}", message);
                return Ok(self.view().await);
            }
            Err(err) => return Err(err),
        };

        let ticket = pending.ticket;
        info!(session_id = %self.id, tab = %ticket.tab, "Submitting collector");

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = pending.submission.dispatch(session.service.as_ref()).await;
            let mut shell = session.shell.lock().await;
            shell.complete_submission(SubmissionEvent { ticket, outcome });
            shell.view()
        });

        match task.await {
            Ok(view) => Ok(view),
            Err(err) => {
                error!(session_id = %self.id, "Submission task failed: {}", err);
                let mut shell = self.shell.lock().await;
                shell.complete_submission(SubmissionEvent {
                    ticket,
                    outcome: Err(ServiceError::Transport(err.to_string())),
                });
                Ok(shell.view())
            }
        }
    }

    pub async fn set_clinician_email(&self, email: String) -> Result<ShellView> {
        let mut shell = self.shell.lock().await;
        shell.set_clinician_email(email)?;
        Ok(shell.view())
    }

    /// Send the critical alert and wait until it succeeds, fails or is cancelled.
    ///
    /// The request runs in its own task so `cancel_alert` can abort it.
    pub async fn send_alert(self: &Arc<Self>) -> Result<ShellView> {
        let started = self.shell.lock().await.begin_alert_send();
        let ticket = match started {
            Ok(ticket) => ticket,
            Err(FlowError::LocalValidation(_)) => return Ok(self.view().await),
            Err(err) => return Err(err),
        };

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = session.service.send_alert(&ticket.request).await;
            let auto_close = session
                .shell
                .lock()
                .await
                .complete_alert_send(&ticket, outcome);
            if let Some(token) = auto_close {
                session.schedule_auto_close(token);
            }
        });
        let task_id = task.id();
        self.replace_alert_task(Some(task.abort_handle()));

        if let Err(err) = task.await {
            if err.is_cancelled() {
                debug!(session_id = %self.id, "Alert send aborted");
            } else {
                warn!(session_id = %self.id, "Alert send task failed: {}", err);
            }
        }
        self.release_alert_task(task_id);

        Ok(self.view().await)
    }

    /// Close the alert modal, aborting any send still in flight.
    pub async fn cancel_alert(&self) -> ShellView {
        let mut shell = self.shell.lock().await;
        shell.cancel_alert();
        if let Some(handle) = self.replace_alert_task(None) {
            handle.abort();
        }
        shell.view()
    }

    fn schedule_auto_close(self: &Arc<Self>, token: AutoClose) {
        let session = Arc::clone(self);
        let delay = self.alert_auto_close;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.shell.lock().await.auto_close_alert(token) {
                debug!(session_id = %session.id, "Alert closed after successful send");
            }
        });
    }

    fn replace_alert_task(&self, handle: Option<AbortHandle>) -> Option<AbortHandle> {
        let mut slot = self
            .alert_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, handle)
    }

    /// Empty the slot only if it still holds the given task.
    fn release_alert_task(&self, task_id: TaskId) {
        let mut slot = self
            .alert_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.as_ref().is_some_and(|handle| handle.id() == task_id) {
            *slot = None;
        }
    }
}
