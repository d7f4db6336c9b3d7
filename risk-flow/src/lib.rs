pub mod alert;
pub mod client;
pub mod collector;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod payload;
pub mod prediction;
pub mod runner;
pub mod session;
pub mod shell;
pub mod storage;

// Re-export commonly used types
pub use alert::{AlertPhase, AlertView, AlertWorkflow};
pub use client::{HttpPredictionService, PredictionService, ServiceResult};
pub use collector::{Collector, CollectorView, MISSING_REPORT_MESSAGE, Submission};
pub use config::FlowConfig;
pub use coordinator::{Coordinator, Escalation, SharedUiState, should_escalate};
pub use error::{FlowError, Result, ServiceError};
pub use payload::{AlertReceipt, AlertRequest, ManualEntry, ReportFile, SymptomFlags};
pub use prediction::{PredictionResult, ResultCard, RiskBand, format_risk_percent};
pub use runner::ConsoleRunner;
pub use session::ConsoleSession;
pub use shell::{Shell, ShellView, Tab};
pub use storage::{InMemorySessionStorage, SessionStorage};
