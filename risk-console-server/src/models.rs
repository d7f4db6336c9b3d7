use risk_flow::{ShellView, Tab};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectTabRequest {
    pub tab: Tab,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClinicianRequest {
    pub clinician_email: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub view: ShellView,
}
