//! Error types for the health monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// HTTP request failed outside of a probe
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// A service descriptor cannot be probed (empty name, bad URL)
    InvalidDescriptor(String),

    /// No registered service carries this name
    NotFound(String),

    /// Monitoring interval is not a positive number of minutes
    InvalidInterval(f64),

    /// The notification channel rejected or never received the message
    Notification(String),

    /// Generic error with message
    Other(String),
}

impl MonitorError {
    /// True for failures of the notification channel itself, as opposed to
    /// internal errors of the monitor.
    pub fn is_delivery_failure(&self) -> bool {
        matches!(self, MonitorError::Notification(_) | MonitorError::Config(_))
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::InvalidDescriptor(msg) => write!(f, "Invalid service descriptor: {}", msg),
            MonitorError::NotFound(name) => write!(f, "Service {} non trouvé", name),
            MonitorError::InvalidInterval(minutes) => write!(
                f,
                "Intervalle invalide: {} (doit être un nombre de minutes strictement positif)",
                minutes
            ),
            MonitorError::Notification(msg) => write!(f, "Notification error: {}", msg),
            MonitorError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_service() {
        let err = MonitorError::NotFound("billing".to_string());
        assert_eq!(err.to_string(), "Service billing non trouvé");
    }

    #[test]
    fn test_delivery_failure_classification() {
        assert!(MonitorError::Notification("rejected".into()).is_delivery_failure());
        assert!(MonitorError::Config("no webhook".into()).is_delivery_failure());
        assert!(!MonitorError::Other("boom".into()).is_delivery_failure());
        assert!(!MonitorError::NotFound("x".into()).is_delivery_failure());
    }
}
