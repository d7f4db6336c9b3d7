use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post, put},
};
use risk_flow::{
    ConsoleRunner, ConsoleSession, FlowConfig, FlowError, HttpPredictionService,
    InMemorySessionStorage, ManualEntry, ReportFile, SymptomFlags,
    client::REPORT_FIELD,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::models::{ClinicianRequest, SelectTabRequest, SessionResponse};

/// Largest report accepted by the upload route.
const MAX_REPORT_BYTES: usize = 10 * 1024 * 1024;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn conflict_error(message: &str) -> ApiError {
    (StatusCode::CONFLICT, Json(json!({ "error": message })))
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn flow_error(err: FlowError) -> ApiError {
    match &err {
        FlowError::SessionNotFound(id) => not_found_error("Session not found", id),
        FlowError::SubmissionInFlight | FlowError::AlertSendInFlight => {
            conflict_error(&err.to_string())
        }
        FlowError::AlertNotOpen => conflict_error(&err.to_string()),
        FlowError::WrongTab { .. } | FlowError::LocalValidation(_) => {
            bad_request_error(&err.to_string())
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub runner: ConsoleRunner,
}

impl AppState {
    async fn session(&self, session_id: &str) -> Result<Arc<ConsoleSession>, ApiError> {
        self.runner.open(session_id).await.map_err(flow_error)
    }
}

/// Build the application. Must be called inside a tokio runtime.
pub fn create_app(config: FlowConfig) -> anyhow::Result<Router> {
    info!("Prediction service at {}", config.api_base_url);
    let service = HttpPredictionService::new(config.clone())?;
    let runner = ConsoleRunner::new(
        Arc::new(service),
        Arc::new(InMemorySessionStorage::new()),
        config,
    );
    if runner.spawn_idle_sweep().is_some() {
        info!("Idle console sessions will be evicted");
    }
    Ok(build_router(AppState { runner }))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/console", post(create_session))
        .route("/console/{session_id}", get(get_view).delete(close_session))
        .route("/console/{session_id}/tab", post(select_tab))
        .route("/console/{session_id}/manual", put(edit_manual))
        .route("/console/{session_id}/symptoms", put(edit_symptoms))
        .route(
            "/console/{session_id}/report",
            post(choose_report).delete(clear_report),
        )
        .route("/console/{session_id}/submit", post(submit))
        .route("/console/{session_id}/alert/clinician", put(set_clinician))
        .route("/console/{session_id}/alert/send", post(send_alert))
        .route("/console/{session_id}/alert/cancel", post(cancel_alert))
        .layer(DefaultBodyLimit::max(MAX_REPORT_BYTES))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Patient Risk Console",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Console state for manual, symptom and report-based risk prediction with critical alerts",
        "endpoints": {
            "POST /console": "Create a console session",
            "GET /console/{session_id}": "Current console view",
            "DELETE /console/{session_id}": "Close a console session",
            "POST /console/{session_id}/tab": "Switch input tab",
            "PUT /console/{session_id}/manual": "Replace the manual entry form",
            "PUT /console/{session_id}/symptoms": "Replace the symptom checklist",
            "POST /console/{session_id}/report": "Choose a report file (multipart, field report_file)",
            "DELETE /console/{session_id}/report": "Clear the chosen report",
            "POST /console/{session_id}/submit": "Submit the active tab",
            "PUT /console/{session_id}/alert/clinician": "Set the clinician email for the alert",
            "POST /console/{session_id}/alert/send": "Send the critical alert",
            "POST /console/{session_id}/alert/cancel": "Dismiss the critical alert",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<SessionResponse> {
    let session = state.runner.create().await.map_err(|e| {
        error!("Failed to create session: {}", e);
        internal_error("Failed to create console session", &e.to_string())
    })?;

    Ok(Json(SessionResponse {
        session_id: session.id().to_string(),
        view: session.view().await,
    }))
}

async fn get_view(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    Ok(Json(SessionResponse {
        session_id,
        view: session.view().await,
    }))
}

async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state.runner.close(&session_id).await.map_err(flow_error)?;
    Ok(Json(json!({
        "session_id": session_id,
        "status": "closed"
    })))
}

async fn select_tab(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<SelectTabRequest>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.select_tab(request.tab).await;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn edit_manual(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(entry): Json<ManualEntry>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.edit_manual(entry).await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn edit_symptoms(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(flags): Json<SymptomFlags>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.edit_symptoms(flags).await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn choose_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let report = read_report(multipart).await?;
    info!(
        session_id = %session_id,
        file_name = %report.file_name,
        bytes = report.bytes.len(),
        "Report chosen"
    );
    let view = session.choose_report(report).await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn read_report(mut multipart: Multipart) -> Result<ReportFile, ApiError> {
    loop {
        let field = multipart.next_field().await.map_err(|e| {
            warn!("Malformed multipart body: {}", e);
            bad_request_error("Malformed multipart body")
        })?;
        let Some(field) = field else {
            return Err(bad_request_error("report_file field is required"));
        };
        if field.name() != Some(REPORT_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or("report")
            .to_string();
        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read report upload: {}", e);
            bad_request_error("Failed to read report upload")
        })?;
        return Ok(ReportFile::new(file_name, bytes.to_vec()));
    }
}

async fn clear_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.clear_report().await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn submit(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.submit().await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn set_clinician(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ClinicianRequest>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session
        .set_clinician_email(request.clinician_email)
        .await
        .map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn send_alert(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.send_alert().await.map_err(flow_error)?;
    Ok(Json(SessionResponse { session_id, view }))
}

async fn cancel_alert(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = state.session(&session_id).await?;
    let view = session.cancel_alert().await;
    Ok(Json(SessionResponse { session_id, view }))
}
