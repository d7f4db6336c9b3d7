use thiserror::Error;

use crate::shell::Tab;

/// Generic banner text when a prediction call fails without a usable status.
pub const PREDICTION_FAILED: &str = "Prediction failed.";

/// Generic banner text when an alert call fails without a server detail.
pub const ALERT_FAILED: &str = "Failed to send alert.";

/// Errors raised by the console state machine and session layer
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("{0}")]
    LocalValidation(String),

    #[error("A submission is already in flight for this collector")]
    SubmissionInFlight,

    #[error("Operation requires the {expected} tab, but {actual} is active")]
    WrongTab { expected: Tab, actual: Tab },

    #[error("No critical alert is open")]
    AlertNotOpen,

    #[error("An alert is already being sent")]
    AlertSendInFlight,

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors returned by a prediction or alert endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// Non-success status. `detail` is the server-supplied text, if any.
    #[error("Server error: {status}")]
    Server { status: u16, detail: Option<String> },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Response could not be decoded: {0}")]
    Decode(String),
}

impl ServiceError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            ServiceError::Server {
                detail: Some(detail),
                ..
            } if !detail.is_empty() => Some(detail),
            _ => None,
        }
    }

    /// Banner text for a failed prediction: server detail, then status, then generic.
    pub fn prediction_message(&self) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        match self {
            ServiceError::Server { status, .. } => format!("Server error: {}", status),
            _ => PREDICTION_FAILED.to_string(),
        }
    }

    /// Status-only banner text, used where the endpoint's detail is not surfaced.
    pub fn status_message(&self) -> String {
        match self {
            ServiceError::Server { status, .. } => format!("Server error: {}", status),
            _ => PREDICTION_FAILED.to_string(),
        }
    }

    /// Alert modal text for a failed send.
    pub fn alert_message(&self) -> String {
        self.detail()
            .map(str::to_string)
            .unwrap_or_else(|| ALERT_FAILED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_detail_wins_over_status() {
        let err = ServiceError::Server {
            status: 400,
            detail: Some("Invalid file type. Please upload a CSV or PDF.".to_string()),
        };
        assert_eq!(
            err.prediction_message(),
            "Invalid file type. Please upload a CSV or PDF."
        );
        assert_eq!(err.status_message(), "Server error: 400");
    }

    #[test]
    fn empty_detail_falls_back_to_status() {
        let err = ServiceError::Server {
            status: 502,
            detail: Some(String::new()),
        };
        assert_eq!(err.prediction_message(), "Server error: 502");
        assert_eq!(err.alert_message(), ALERT_FAILED);
    }

    #[test]
    fn transport_failures_use_generic_text() {
        let err = ServiceError::Transport("connection refused".to_string());
        assert_eq!(err.prediction_message(), PREDICTION_FAILED);
        assert_eq!(err.alert_message(), ALERT_FAILED);
    }
}
