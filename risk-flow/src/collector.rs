//! Input collectors: the manual vitals form, the symptom checklist and the
//! report upload.
//!
//! Every collector owns its own form state and loading flag. The shell
//! mounts exactly one of them at a time; remounting (a tab switch) builds a
//! fresh collector and so discards whatever the user had entered.

use serde::Serialize;

use crate::{
    client::{PredictionService, ServiceResult},
    error::{FlowError, Result, ServiceError},
    payload::{
        ACCEPTED_REPORT_EXTENSIONS, ManualEntry, ManualPayload, ReportFile, SymptomFlags,
    },
    prediction::{PredictionResult, RiskReadout},
    shell::Tab,
};

/// Local error raised when the upload collector is submitted without a file.
pub const MISSING_REPORT_MESSAGE: &str = "Please select a report file.";

/// A request ready to go to the collector's endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Form(ManualPayload),
    Symptoms(SymptomFlags),
    Report(ReportFile),
}

impl Submission {
    /// Issue exactly one request for this submission.
    pub async fn dispatch(&self, service: &dyn PredictionService) -> ServiceResult<PredictionResult> {
        match self {
            Submission::Form(payload) => service.predict_from_form(payload).await,
            Submission::Symptoms(flags) => service.predict_from_symptoms(flags).await,
            Submission::Report(report) => service.predict_with_report(report).await,
        }
    }
}

/// Capabilities shared by all collectors
pub trait Collector: Send + Sync {
    fn tab(&self) -> Tab;

    fn is_loading(&self) -> bool;

    fn set_loading(&mut self, loading: bool);

    /// Validate local input and build the request. Errors here are raised
    /// before any network call.
    fn prepare(&self) -> Result<Submission>;

    /// Called once a submission has been accepted and is about to be sent.
    fn on_submit_start(&mut self) {}

    /// Called with a successful result before it reaches the coordinator.
    fn on_success(&mut self, _result: &PredictionResult) {}

    /// Banner text for a failed request.
    fn failure_message(&self, error: &ServiceError) -> String {
        error.prediction_message()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualCollector {
    pub entry: ManualEntry,
    is_loading: bool,
}

impl Collector for ManualCollector {
    fn tab(&self) -> Tab {
        Tab::Manual
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn prepare(&self) -> Result<Submission> {
        Ok(Submission::Form(self.entry.to_payload()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymptomCollector {
    pub flags: SymptomFlags,
    is_loading: bool,
    last_result: Option<PredictionResult>,
}

impl SymptomCollector {
    /// The collector's own percentage readout, independent of the result card.
    pub fn readout(&self) -> Option<RiskReadout> {
        self.last_result.as_ref().map(RiskReadout::from)
    }
}

impl Collector for SymptomCollector {
    fn tab(&self) -> Tab {
        Tab::Symptoms
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    // An all-false checklist is a valid submission.
    fn prepare(&self) -> Result<Submission> {
        Ok(Submission::Symptoms(self.flags))
    }

    fn on_submit_start(&mut self) {
        self.last_result = None;
    }

    fn on_success(&mut self, result: &PredictionResult) {
        self.last_result = Some(result.clone());
    }

    fn failure_message(&self, error: &ServiceError) -> String {
        error.status_message()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadCollector {
    report: Option<ReportFile>,
    is_loading: bool,
}

impl UploadCollector {
    pub fn choose(&mut self, report: ReportFile) {
        self.report = Some(report);
    }

    pub fn clear(&mut self) {
        self.report = None;
    }

    pub fn report(&self) -> Option<&ReportFile> {
        self.report.as_ref()
    }
}

impl Collector for UploadCollector {
    fn tab(&self) -> Tab {
        Tab::Upload
    }

    fn is_loading(&self) -> bool {
        self.is_loading
    }

    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn prepare(&self) -> Result<Submission> {
        self.report
            .clone()
            .map(Submission::Report)
            .ok_or_else(|| FlowError::LocalValidation(MISSING_REPORT_MESSAGE.to_string()))
    }
}

/// The collector currently mounted by the shell.
#[derive(Debug, Clone)]
pub enum MountedCollector {
    Manual(ManualCollector),
    Symptoms(SymptomCollector),
    Upload(UploadCollector),
}

impl MountedCollector {
    /// Mount a fresh collector with default form state.
    pub fn mount(tab: Tab) -> Self {
        match tab {
            Tab::Manual => MountedCollector::Manual(ManualCollector::default()),
            Tab::Symptoms => MountedCollector::Symptoms(SymptomCollector::default()),
            Tab::Upload => MountedCollector::Upload(UploadCollector::default()),
        }
    }

    pub fn as_collector(&self) -> &dyn Collector {
        match self {
            MountedCollector::Manual(c) => c,
            MountedCollector::Symptoms(c) => c,
            MountedCollector::Upload(c) => c,
        }
    }

    pub fn as_collector_mut(&mut self) -> &mut dyn Collector {
        match self {
            MountedCollector::Manual(c) => c,
            MountedCollector::Symptoms(c) => c,
            MountedCollector::Upload(c) => c,
        }
    }

    pub fn view(&self) -> CollectorView {
        match self {
            MountedCollector::Manual(c) => CollectorView::Manual {
                entry: c.entry.clone(),
            },
            MountedCollector::Symptoms(c) => CollectorView::Symptoms {
                flags: c.flags,
                readout: c.readout(),
            },
            MountedCollector::Upload(c) => CollectorView::Upload {
                file_name: c.report.as_ref().map(|r| r.file_name.clone()),
                accepted_type: c.report.as_ref().map(ReportFile::is_accepted_type),
                accepted_extensions: ACCEPTED_REPORT_EXTENSIONS,
            },
        }
    }
}

/// Read-only snapshot of the mounted collector's form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectorView {
    Manual {
        entry: ManualEntry,
    },
    Symptoms {
        flags: SymptomFlags,
        #[serde(skip_serializing_if = "Option::is_none")]
        readout: Option<RiskReadout>,
    },
    Upload {
        file_name: Option<String>,
        accepted_type: Option<bool>,
        accepted_extensions: &'static [&'static str],
    },
}
