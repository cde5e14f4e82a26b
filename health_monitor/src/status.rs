//! Health status data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Static identity of a monitored dependency
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub url: String,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[serde(alias = "healthy", alias = "ok")]
    Up,
    #[serde(alias = "unhealthy", alias = "error")]
    Down,
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthState::Up => write!(f, "up"),
            HealthState::Down => write!(f, "down"),
        }
    }
}

impl From<&str> for HealthState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "up" | "healthy" | "ok" => HealthState::Up,
            _ => HealthState::Down,
        }
    }
}

/// Classification of a failed probe
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeErrorKind {
    ConnectionRefused,
    Timeout,
    HttpError,
    Unknown,
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::ConnectionRefused => "connection-refused",
            ProbeErrorKind::Timeout => "timeout",
            ProbeErrorKind::HttpError => "http-error",
            ProbeErrorKind::Unknown => "unknown",
        }
    }
}

/// Normalized probe failure, built where the transport error is first caught.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeError {
    pub kind: ProbeErrorKind,
    pub code: String,
    pub detail: String,
}

impl ProbeError {
    pub fn connection_refused(detail: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::ConnectionRefused,
            code: "ECONNREFUSED".to_string(),
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::Timeout,
            code: "ETIMEDOUT".to_string(),
            detail: detail.into(),
        }
    }

    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::HttpError,
            code: format!("HTTP_{}", status),
            detail: detail.into(),
        }
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self {
            kind: ProbeErrorKind::Unknown,
            code: "UNKNOWN".to_string(),
            detail: detail.into(),
        }
    }

    pub fn to_details(&self) -> Value {
        json!({
            "kind": self.kind.as_str(),
            "code": self.code,
            "message": self.detail,
        })
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.kind.as_str(), self.detail)
    }
}

/// Outcome of one probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub name: String,
    pub status: HealthState,
    pub response_time: Option<u64>,
    #[serde(alias = "lastChecked")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Value,
}

impl ServiceStatus {
    pub fn up(name: impl Into<String>, response_time_ms: u64, details: Value) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Up,
            response_time: Some(response_time_ms),
            timestamp: Utc::now(),
            details,
        }
    }

    pub fn down(name: impl Into<String>, error: &ProbeError) -> Self {
        Self {
            name: name.into(),
            status: HealthState::Down,
            response_time: None,
            timestamp: Utc::now(),
            details: error.to_details(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthState::Up
    }
}

/// Result of one aggregation cycle
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AggregateSnapshot {
    pub services: Vec<ServiceStatus>,
    pub timestamp: DateTime<Utc>,
}

impl AggregateSnapshot {
    pub fn new(services: Vec<ServiceStatus>) -> Self {
        Self {
            services,
            timestamp: Utc::now(),
        }
    }

    pub fn down_services(&self) -> impl Iterator<Item = &ServiceStatus> {
        self.services.iter().filter(|s| !s.is_up())
    }
}
