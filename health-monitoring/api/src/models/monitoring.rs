use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringRequest {
    pub action: Option<String>,
    pub interval_minutes: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Alert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Alert => "alert",
        }
    }

    pub fn is_alert(&self) -> bool {
        *self == NotificationKind::Alert
    }

    pub fn test_message(&self) -> &'static str {
        match self {
            NotificationKind::Info => "Ceci est une notification de test (info) du service de monitoring",
            NotificationKind::Alert => "Ceci est une alerte de test du service de monitoring",
        }
    }
}

impl From<Option<&str>> for NotificationKind {
    fn from(kind: Option<&str>) -> Self {
        match kind {
            Some(k) if k.eq_ignore_ascii_case("alert") => NotificationKind::Alert,
            _ => NotificationKind::Info,
        }
    }
}
