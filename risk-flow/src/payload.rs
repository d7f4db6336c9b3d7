use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Form state of the manual-entry collector, as typed by the user.
///
/// Numeric vitals are kept as text and coerced only when a submission is
/// built, the same way an HTML number input hands its value over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualEntry {
    pub patient_name: String,
    pub age: String,
    pub sex: String,
    pub cp: String,
    pub trestbps: String,
    pub chol: String,
    pub fbs: bool,
    pub restecg: String,
    /// Maximum heart rate achieved.
    pub thalch: String,
    pub exang: bool,
    pub oldpeak: String,
    pub slope: String,
    pub ca: String,
    pub thal: String,
    pub symptom_chest_pain: bool,
    pub symptom_shortness_of_breath: bool,
    pub symptom_dizziness: bool,
    pub symptom_fatigue: bool,
}

impl Default for ManualEntry {
    fn default() -> Self {
        Self {
            patient_name: "John Doe".to_string(),
            age: "52".to_string(),
            sex: "male".to_string(),
            cp: "asymptomatic".to_string(),
            trestbps: "125".to_string(),
            chol: "212".to_string(),
            fbs: true,
            restecg: "normal".to_string(),
            thalch: "168".to_string(),
            exang: false,
            oldpeak: "1.0".to_string(),
            slope: "upsloping".to_string(),
            ca: "2".to_string(),
            thal: "reversable defect".to_string(),
            symptom_chest_pain: false,
            symptom_shortness_of_breath: false,
            symptom_dizziness: false,
            symptom_fatigue: false,
        }
    }
}

impl ManualEntry {
    /// Build the wire payload for `/predict-from-form`.
    pub fn to_payload(&self) -> ManualPayload {
        ManualPayload {
            patient_name: self.patient_name.clone(),
            age: coerce_number(&self.age),
            sex: self.sex.clone(),
            cp: self.cp.clone(),
            trestbps: coerce_number(&self.trestbps),
            chol: coerce_number(&self.chol),
            fbs: self.fbs,
            restecg: self.restecg.clone(),
            max_heart_rate: coerce_number(&self.thalch),
            exang: self.exang,
            oldpeak: coerce_number(&self.oldpeak),
            slope: self.slope.clone(),
            ca: coerce_number(&self.ca),
            thal: self.thal.clone(),
            symptom_chest_pain: self.symptom_chest_pain as u8,
            symptom_shortness_of_breath: self.symptom_shortness_of_breath as u8,
            symptom_dizziness: self.symptom_dizziness as u8,
            symptom_fatigue: self.symptom_fatigue as u8,
        }
    }
}

/// JSON body for `/predict-from-form`. Unparsable numbers travel as `null`
/// and are left for the server to reject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualPayload {
    pub patient_name: String,
    pub age: Option<Number>,
    pub sex: String,
    pub cp: String,
    pub trestbps: Option<Number>,
    pub chol: Option<Number>,
    pub fbs: bool,
    pub restecg: String,
    #[serde(rename = "thalch")]
    pub max_heart_rate: Option<Number>,
    pub exang: bool,
    pub oldpeak: Option<Number>,
    pub slope: String,
    pub ca: Option<Number>,
    pub thal: String,
    pub symptom_chest_pain: u8,
    pub symptom_shortness_of_breath: u8,
    pub symptom_dizziness: u8,
    pub symptom_fatigue: u8,
}

/// Coerce form text into a JSON number. Whole values stay integral so the
/// server's integer fields accept them.
pub fn coerce_number(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    let value = trimmed.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        return Some(Number::from(value as i64));
    }
    Number::from_f64(value)
}

/// Checklist used by the symptom collector and sent as-is to
/// `/predict-from-symptoms`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomFlags {
    pub symptom_chest_pain: bool,
    pub symptom_shortness_of_breath: bool,
    pub symptom_dizziness: bool,
    pub symptom_fatigue: bool,
}

/// File extensions offered by the report picker. Advisory only.
pub const ACCEPTED_REPORT_EXTENSIONS: &[&str] = &[".csv", ".pdf"];

/// A report chosen in the upload collector.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ReportFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| format!(".{}", ext.to_ascii_lowercase()))
    }

    /// Whether the picker's allow-list would have offered this file.
    pub fn is_accepted_type(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_REPORT_EXTENSIONS.contains(&ext.as_str()))
    }

    /// MIME type declared in the multipart part.
    pub fn content_type(&self) -> &'static str {
        match self.extension().as_deref() {
            Some(".csv") => "text/csv",
            Some(".pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

/// Body of `/send-alert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub prediction_id: String,
    pub clinician_email: String,
}

/// Success body of `/send-alert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertReceipt {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_entry_serialises_with_backend_field_names() {
        let payload = serde_json::to_value(ManualEntry::default().to_payload()).unwrap();
        assert_eq!(payload["thalch"], json!(168));
        assert!(payload.get("thalach").is_none());
        assert!(payload.get("max_heart_rate").is_none());
        assert_eq!(payload["age"], json!(52));
        assert_eq!(payload["oldpeak"], json!(1));
        assert_eq!(payload["fbs"], json!(true));
        assert_eq!(payload["exang"], json!(false));
        assert_eq!(payload["symptom_fatigue"], json!(0));
        assert_eq!(payload["patient_name"], json!("John Doe"));
    }

    #[test]
    fn checked_symptoms_travel_as_integers() {
        let entry = ManualEntry {
            symptom_chest_pain: true,
            symptom_dizziness: true,
            ..ManualEntry::default()
        };
        let payload = serde_json::to_value(entry.to_payload()).unwrap();
        assert_eq!(payload["symptom_chest_pain"], json!(1));
        assert_eq!(payload["symptom_shortness_of_breath"], json!(0));
        assert_eq!(payload["symptom_dizziness"], json!(1));
    }

    #[test]
    fn coercion_keeps_fractions_and_nulls_garbage() {
        assert_eq!(coerce_number("2.3"), Number::from_f64(2.3));
        assert_eq!(coerce_number(" 140 "), Some(Number::from(140)));
        assert_eq!(coerce_number("140.0"), Some(Number::from(140)));
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("abc"), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn unparsable_vitals_are_sent_as_null() {
        let entry = ManualEntry {
            chol: "high".to_string(),
            ..ManualEntry::default()
        };
        let payload = serde_json::to_value(entry.to_payload()).unwrap();
        assert!(payload["chol"].is_null());
    }

    #[test]
    fn report_types_follow_extension() {
        let pdf = ReportFile::new("Scan.PDF", vec![1, 2, 3]);
        assert!(pdf.is_accepted_type());
        assert_eq!(pdf.content_type(), "application/pdf");

        let csv = ReportFile::new("vitals.csv", b"age\n52\n".to_vec());
        assert_eq!(csv.content_type(), "text/csv");

        let other = ReportFile::new("notes.docx", Vec::new());
        assert!(!other.is_accepted_type());
        assert_eq!(other.content_type(), "application/octet-stream");

        let bare = ReportFile::new("README", Vec::new());
        assert!(!bare.is_accepted_type());
    }

    #[test]
    fn partial_symptom_json_defaults_to_unchecked() {
        let flags: SymptomFlags = serde_json::from_str(r#"{"symptom_fatigue": true}"#).unwrap();
        assert!(flags.symptom_fatigue);
        assert!(!flags.symptom_chest_pain);
    }
}
