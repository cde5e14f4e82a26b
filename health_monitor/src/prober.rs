//! HTTP probing of a single service

use crate::errors::{MonitorError, Result};
use crate::status::{ProbeError, ServiceDescriptor, ServiceStatus};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::error::Error as _;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Performs one health check against one service.
///
/// Implementations report an unhealthy service as a `down` status; `Err` is
/// reserved for descriptors that cannot be probed at all.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn check(&self, service: &ServiceDescriptor) -> Result<ServiceStatus>;
}

/// Prober issuing `GET {url}{health_path}` with a bounded timeout
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    health_path: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(health_path: impl Into<String>, probe_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(probe_timeout)
            .user_agent(format!("health_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        let mut health_path = health_path.into();
        if !health_path.is_empty() && !health_path.starts_with('/') {
            health_path.insert(0, '/');
        }

        Ok(Self {
            client,
            health_path,
            timeout: probe_timeout,
        })
    }

    fn health_url(&self, service: &ServiceDescriptor) -> String {
        format!("{}{}", service.url.trim_end_matches('/'), self.health_path)
    }

    async fn fetch(&self, url: &str, service: &ServiceDescriptor) -> std::result::Result<Value, ProbeError> {
        let response = self.client.get(url).send().await.map_err(|e| classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::http(
                status.as_u16(),
                format!("{} responded with status {}", service.name, status),
            ));
        }

        let body = response.text().await.map_err(|e| classify_error(&e))?;
        if body.trim().is_empty() {
            return Ok(json!({ "service": service.name }));
        }

        Ok(serde_json::from_str(&body).unwrap_or_else(|_| {
            json!({
                "service": service.name,
                "body": body,
            })
        }))
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn check(&self, service: &ServiceDescriptor) -> Result<ServiceStatus> {
        if service.name.is_empty() {
            return Err(MonitorError::InvalidDescriptor("service name is empty".to_string()));
        }
        if url::Url::parse(&service.url).is_err() {
            return Err(MonitorError::InvalidDescriptor(format!(
                "service {} has an invalid url: {:?}",
                service.name, service.url
            )));
        }

        let url = self.health_url(service);
        debug!("Probing {} at {}", service.name, url);

        let started = Instant::now();
        let outcome = match timeout(self.timeout, self.fetch(&url, service)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::timeout(format!(
                "no response from {} within {}ms",
                service.name,
                self.timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(details) => {
                let elapsed = started.elapsed().as_millis() as u64;
                debug!("Service {} is up ({}ms)", service.name, elapsed);
                Ok(ServiceStatus::up(&service.name, elapsed, details))
            }
            Err(error) => {
                warn!("Service {} is down: {}", service.name, error);
                Ok(ServiceStatus::down(&service.name, &error))
            }
        }
    }
}

/// Map a transport error onto the probe failure taxonomy.
pub fn classify_error(err: &reqwest::Error) -> ProbeError {
    let detail = error_chain(err);

    if err.is_timeout() {
        ProbeError::timeout(detail)
    } else if err.is_connect() {
        let mut error = ProbeError::connection_refused(detail);
        if error.detail.contains("dns error") {
            error.code = "ENOTFOUND".to_string();
        }
        error
    } else if let Some(status) = err.status() {
        ProbeError::http(status.as_u16(), detail)
    } else if err.is_body() || err.is_decode() {
        ProbeError::unknown(format!("malformed response: {}", detail))
    } else {
        ProbeError::unknown(detail)
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}
