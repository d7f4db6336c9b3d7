use async_trait::async_trait;
use reqwest::{Response, multipart};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    config::FlowConfig,
    error::ServiceError,
    payload::{AlertReceipt, AlertRequest, ManualPayload, ReportFile, SymptomFlags},
    prediction::PredictionResult,
};

pub const FORM_PATH: &str = "/predict-from-form";
pub const SYMPTOMS_PATH: &str = "/predict-from-symptoms";
pub const REPORT_PATH: &str = "/predict-with-report";
pub const ALERT_PATH: &str = "/send-alert";

/// Multipart field name the report endpoint reads.
pub const REPORT_FIELD: &str = "report_file";

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// The external prediction and alert-dispatch service.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict_from_form(&self, payload: &ManualPayload) -> ServiceResult<PredictionResult>;

    async fn predict_from_symptoms(
        &self,
        flags: &SymptomFlags,
    ) -> ServiceResult<PredictionResult>;

    async fn predict_with_report(&self, report: &ReportFile) -> ServiceResult<PredictionResult>;

    async fn send_alert(&self, request: &AlertRequest) -> ServiceResult<AlertReceipt>;
}

/// Whether a failure body's `detail` is passed on to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailPolicy {
    Surface,
    Ignore,
}

/// `PredictionService` over HTTP/JSON. One request per call; no retries.
#[derive(Clone)]
pub struct HttpPredictionService {
    client: reqwest::Client,
    config: FlowConfig,
}

impl HttpPredictionService {
    pub fn new(config: FlowConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServiceError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    async fn read<T: DeserializeOwned>(
        &self,
        path: &str,
        response: std::result::Result<Response, reqwest::Error>,
        policy: DetailPolicy,
    ) -> ServiceResult<T> {
        let response = response.map_err(|e| {
            warn!("Request to {} failed: {}", path, e);
            ServiceError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match policy {
                DetailPolicy::Surface => extract_detail(response).await,
                DetailPolicy::Ignore => None,
            };
            warn!(
                path = %path,
                status = status.as_u16(),
                detail = ?detail,
                "Prediction service returned an error"
            );
            return Err(ServiceError::Server {
                status: status.as_u16(),
                detail,
            });
        }

        response.json::<T>().await.map_err(|e| {
            warn!("Failed to decode response from {}: {}", path, e);
            ServiceError::Decode(e.to_string())
        })
    }
}

/// Pull a string `detail` out of an error body; anything else counts as absent.
async fn extract_detail(response: Response) -> Option<String> {
    let body = response.json::<Value>().await.ok()?;
    match body.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => Some(detail.clone()),
        Some(other) => {
            debug!("Ignoring non-string error detail: {}", other);
            None
        }
        None => None,
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict_from_form(&self, payload: &ManualPayload) -> ServiceResult<PredictionResult> {
        info!("Submitting manual entry for {}", payload.patient_name);
        let response = self
            .client
            .post(self.config.endpoint(FORM_PATH))
            .json(payload)
            .send()
            .await;
        self.read(FORM_PATH, response, DetailPolicy::Surface).await
    }

    async fn predict_from_symptoms(
        &self,
        flags: &SymptomFlags,
    ) -> ServiceResult<PredictionResult> {
        info!("Submitting symptom checklist");
        let response = self
            .client
            .post(self.config.endpoint(SYMPTOMS_PATH))
            .json(flags)
            .send()
            .await;
        self.read(SYMPTOMS_PATH, response, DetailPolicy::Ignore)
            .await
    }

    async fn predict_with_report(&self, report: &ReportFile) -> ServiceResult<PredictionResult> {
        info!(
            "Uploading report {} ({} bytes)",
            report.file_name,
            report.bytes.len()
        );
        let part = multipart::Part::bytes(report.bytes.clone())
            .file_name(report.file_name.clone())
            .mime_str(report.content_type())
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part(REPORT_FIELD, part);

        let response = self
            .client
            .post(self.config.endpoint(REPORT_PATH))
            .multipart(form)
            .send()
            .await;
        self.read(REPORT_PATH, response, DetailPolicy::Surface).await
    }

    async fn send_alert(&self, request: &AlertRequest) -> ServiceResult<AlertReceipt> {
        info!(
            "Sending critical alert for prediction {} to {}",
            request.prediction_id, request.clinician_email
        );
        let response = self
            .client
            .post(self.config.endpoint(ALERT_PATH))
            .json(request)
            .send()
            .await;
        self.read(ALERT_PATH, response, DetailPolicy::Surface).await
    }
}
