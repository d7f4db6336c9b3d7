use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_CLINICIAN_EMAIL: &str = "supervisor@hospital.com";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTO_CLOSE_SECS: u64 = 3;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Runtime settings for the console and its prediction-service client
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Base host of the prediction service, without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    /// Delay between a successful alert send and the modal closing itself.
    pub alert_auto_close: Duration,
    /// Address pre-filled in the alert form. `None` leaves the field blank.
    pub default_clinician_email: Option<String>,
    /// Sessions untouched for this long are dropped. `None` keeps them forever.
    pub session_idle_ttl: Option<Duration>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            alert_auto_close: Duration::from_secs(DEFAULT_AUTO_CLOSE_SECS),
            default_clinician_email: Some(DEFAULT_CLINICIAN_EMAIL.to_string()),
            session_idle_ttl: Some(Duration::from_secs(DEFAULT_SESSION_IDLE_SECS)),
        }
    }
}

impl FlowConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or malformed values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("PREDICTION_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_base_url);

        let request_timeout = lookup("PREDICTION_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let alert_auto_close = lookup("ALERT_AUTO_CLOSE_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.alert_auto_close);

        // An explicitly empty value switches the pre-fill off.
        let default_clinician_email = match lookup("ALERT_DEFAULT_CLINICIAN") {
            Some(email) if email.trim().is_empty() => None,
            Some(email) => Some(email.trim().to_string()),
            None => defaults.default_clinician_email,
        };

        // 0 disables eviction.
        let session_idle_ttl = match lookup("SESSION_IDLE_TTL_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.session_idle_ttl,
        };

        Self {
            api_base_url,
            request_timeout,
            alert_auto_close,
            default_clinician_email,
            session_idle_ttl,
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = FlowConfig::from_lookup(|_| None);
        assert_eq!(config, FlowConfig::default());
        assert_eq!(
            config.endpoint("/predict-from-form"),
            "http://127.0.0.1:8000/predict-from-form"
        );
    }

    #[test]
    fn overrides_are_applied() {
        let config = FlowConfig::from_lookup(lookup_from(&[
            ("PREDICTION_API_URL", "https://risk.example.org/api/"),
            ("PREDICTION_TIMEOUT_SECS", "5"),
            ("ALERT_AUTO_CLOSE_SECS", "0"),
            ("ALERT_DEFAULT_CLINICIAN", "oncall@clinic.example"),
        ]));
        assert_eq!(config.api_base_url, "https://risk.example.org/api");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.alert_auto_close, Duration::ZERO);
        assert_eq!(
            config.default_clinician_email.as_deref(),
            Some("oncall@clinic.example")
        );
        assert_eq!(
            config.endpoint("send-alert"),
            "https://risk.example.org/api/send-alert"
        );
    }

    #[test]
    fn empty_clinician_disables_prefill_and_bad_numbers_are_ignored() {
        let config = FlowConfig::from_lookup(lookup_from(&[
            ("ALERT_DEFAULT_CLINICIAN", "  "),
            ("PREDICTION_TIMEOUT_SECS", "soon"),
        ]));
        assert!(config.default_clinician_email.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn session_idle_ttl_can_be_tuned_or_disabled() {
        let config = FlowConfig::from_lookup(|_| None);
        assert_eq!(config.session_idle_ttl, Some(Duration::from_secs(1800)));

        let config = FlowConfig::from_lookup(lookup_from(&[("SESSION_IDLE_TTL_SECS", "60")]));
        assert_eq!(config.session_idle_ttl, Some(Duration::from_secs(60)));

        let config = FlowConfig::from_lookup(lookup_from(&[("SESSION_IDLE_TTL_SECS", "0")]));
        assert!(config.session_idle_ttl.is_none());
    }
}
