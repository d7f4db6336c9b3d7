use serde::{Deserialize, Serialize};

/// Scores strictly above this value open the critical-alert workflow.
pub const ESCALATION_THRESHOLD: f64 = 0.80;

/// Scores strictly above this value (and not critical) render as elevated.
pub const ELEVATED_THRESHOLD: f64 = 0.50;

/// Response shape shared by every prediction endpoint.
///
/// Instances are never mutated after decoding; a new submission replaces
/// the previous result wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub risk_score: f64,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub follow_up: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    /// Set by the report endpoint when it found a clinician address and mailed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_found_and_sent: Option<bool>,
}

impl PredictionResult {
    pub fn new(risk_score: f64) -> Self {
        Self {
            risk_score,
            outcome: String::new(),
            follow_up: String::new(),
            message: None,
            prediction_id: None,
            patient_name: None,
            email_found_and_sent: None,
        }
    }

    pub fn with_prediction_id(mut self, id: impl Into<String>) -> Self {
        self.prediction_id = Some(id.into());
        self
    }

    pub fn with_patient_name(mut self, name: impl Into<String>) -> Self {
        self.patient_name = Some(name.into());
        self
    }

    /// Prediction id usable for an alert; empty strings count as absent.
    pub fn alert_id(&self) -> Option<&str> {
        self.prediction_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn system_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }

    pub fn band(&self) -> RiskBand {
        RiskBand::from_score(self.risk_score)
    }

    pub fn percent(&self) -> String {
        format_risk_percent(self.risk_score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Elevated,
    Critical,
}

impl RiskBand {
    pub fn from_score(score: f64) -> Self {
        if score > ESCALATION_THRESHOLD {
            RiskBand::Critical
        } else if score > ELEVATED_THRESHOLD {
            RiskBand::Elevated
        } else {
            RiskBand::Low
        }
    }
}

/// Render a score as a percentage with one decimal, e.g. `0.95` -> `"95.0%"`.
///
/// Ties round away from zero. Scores outside `[0, 1]` are rendered as-is.
pub fn format_risk_percent(score: f64) -> String {
    let tenths = (score * 1000.0).round() / 10.0;
    format!("{:.1}%", tenths)
}

/// Shared result card shown below the active collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultCard {
    pub risk_percent: String,
    pub band: RiskBand,
    pub outcome: String,
    pub follow_up: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl From<&PredictionResult> for ResultCard {
    fn from(result: &PredictionResult) -> Self {
        Self {
            risk_percent: result.percent(),
            band: result.band(),
            outcome: result.outcome.clone(),
            follow_up: result.follow_up.clone(),
            system_message: result.system_message().map(str::to_string),
        }
    }
}

/// Compact percentage readout rendered inside the symptom collector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReadout {
    pub risk_percent: String,
    pub band: RiskBand,
}

impl From<&PredictionResult> for RiskReadout {
    fn from(result: &PredictionResult) -> Self {
        Self {
            risk_percent: result.percent(),
            band: result.band(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_matches_display_rules() {
        assert_eq!(format_risk_percent(0.95), "95.0%");
        assert_eq!(format_risk_percent(0.81), "81.0%");
        assert_eq!(format_risk_percent(0.0), "0.0%");
        assert_eq!(format_risk_percent(0.12345), "12.3%");
        assert_eq!(format_risk_percent(1.5), "150.0%");
        assert_eq!(format_risk_percent(-0.05), "-5.0%");
    }

    #[test]
    fn bands_use_strict_thresholds() {
        assert_eq!(RiskBand::from_score(0.80), RiskBand::Elevated);
        assert_eq!(RiskBand::from_score(0.8000001), RiskBand::Critical);
        assert_eq!(RiskBand::from_score(0.50), RiskBand::Low);
        assert_eq!(RiskBand::from_score(0.51), RiskBand::Elevated);
    }

    #[test]
    fn decodes_minimal_symptom_response() {
        let result: PredictionResult = serde_json::from_str(r#"{"risk_score": 0.42}"#).unwrap();
        assert_eq!(result.risk_score, 0.42);
        assert!(result.outcome.is_empty());
        assert!(result.alert_id().is_none());
    }

    #[test]
    fn decodes_report_response() {
        let body = r#"{
            "risk_score": 0.91,
            "outcome": "High Risk",
            "follow_up": "CRITICAL: Immediate attention required.",
            "prediction_id": "66f1",
            "email_found_and_sent": false,
            "patient_name": "jane roe",
            "message": "No alert sent."
        }"#;
        let result: PredictionResult = serde_json::from_str(body).unwrap();
        assert_eq!(result.alert_id(), Some("66f1"));
        assert_eq!(result.email_found_and_sent, Some(false));

        let card = ResultCard::from(&result);
        assert_eq!(card.risk_percent, "91.0%");
        assert_eq!(card.band, RiskBand::Critical);
        assert_eq!(card.system_message.as_deref(), Some("No alert sent."));
    }

    #[test]
    fn empty_message_and_id_count_as_absent() {
        let mut result = PredictionResult::new(0.9).with_prediction_id("");
        result.message = Some(String::new());
        assert!(result.alert_id().is_none());
        assert!(ResultCard::from(&result).system_message.is_none());
    }
}
