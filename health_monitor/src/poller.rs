//! Client-side polling of the aggregation endpoint

use crate::errors::{MonitorError, Result};
use crate::response::ApiResponse;
use crate::scheduler::{FirstRun, TaskHandle, schedule};
use crate::status::{AggregateSnapshot, HealthState, ServiceStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// The monitoring endpoints the poller consumes
#[async_trait]
pub trait HealthApi: Send + Sync {
    /// `GET /health/all`
    async fn fetch_all(&self) -> Result<AggregateSnapshot>;

    /// `POST /health/check`
    async fn trigger_check(&self) -> Result<()>;
}

/// reqwest client for a running monitoring API
#[derive(Debug, Clone)]
pub struct HttpHealthApi {
    client: Client,
    base_url: String,
}

impl HttpHealthApi {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("health_monitor/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MonitorError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<ApiResponse<T>> {
        let status = response.status();
        let body = response.text().await.map_err(MonitorError::Http)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or_else(|| format!("monitoring API responded with status {}", status));
            return Err(MonitorError::Other(message));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl HealthApi for HttpHealthApi {
    async fn fetch_all(&self) -> Result<AggregateSnapshot> {
        let response = self
            .client
            .get(format!("{}/health/all", self.base_url))
            .send()
            .await?;

        Self::read_envelope::<AggregateSnapshot>(response)
            .await?
            .data
            .ok_or_else(|| MonitorError::Other("response carried no data".to_string()))
    }

    async fn trigger_check(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/health/check", self.base_url))
            .send()
            .await?;

        Self::read_envelope::<serde_json::Value>(response).await?;
        Ok(())
    }
}

/// What the poller currently knows
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerState {
    pub services: Vec<ServiceStatus>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Summary derived from a service list
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    pub is_all_operational: bool,
    pub down_services_count: usize,
    /// Mean response time in ms, missing values counted as 0
    pub response_time: f64,
}

/// A service as seen from the client
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PerceivedState {
    Unknown,
    Up,
    Down,
}

pub fn compute_stats(services: &[ServiceStatus]) -> ServiceStats {
    let down_services_count = services
        .iter()
        .filter(|s| s.status == HealthState::Down)
        .count();
    let total: u64 = services.iter().map(|s| s.response_time.unwrap_or(0)).sum();

    ServiceStats {
        is_all_operational: !services.is_empty() && down_services_count == 0,
        down_services_count,
        response_time: total as f64 / services.len().max(1) as f64,
    }
}

struct PollerInner<A> {
    api: A,
    state: RwLock<PollerState>,
    /// Sequence number handed to the most recently started fetch
    issued: AtomicU64,
    /// Sequence number of the fetch whose outcome is in `state`. Only
    /// touched while holding the `state` write lock.
    applied: AtomicU64,
}

/// Periodically fetches the aggregate snapshot and keeps the last known data
/// visible when a fetch fails.
pub struct ServicesPoller<A> {
    inner: Arc<PollerInner<A>>,
}

impl<A> Clone for ServicesPoller<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: HealthApi + 'static> ServicesPoller<A> {
    pub fn new(api: A) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                api,
                state: RwLock::new(PollerState::default()),
                issued: AtomicU64::new(0),
                applied: AtomicU64::new(0),
            }),
        }
    }

    /// Fetch now, then every `every`. Polling ends when the handle is
    /// cancelled or dropped.
    pub fn start(&self, every: Duration) -> TaskHandle {
        let poller = self.clone();
        schedule(every, FirstRun::Immediately, move || {
            let poller = poller.clone();
            async move {
                let _ = poller.fetch_services().await;
            }
        })
    }

    /// Fetch the snapshot. Errors are recorded in the state and also returned.
    /// When fetches overlap, an outcome older than the one already applied is
    /// discarded.
    pub async fn fetch_services(&self) -> Result<()> {
        let seq = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.inner.state.write().await;
            if state.services.is_empty() {
                state.loading = true;
            }
        }

        let outcome = self.inner.api.fetch_all().await;

        let mut state = self.inner.state.write().await;
        if seq < self.inner.applied.load(Ordering::SeqCst) {
            debug!("Discarding outcome of superseded fetch #{}", seq);
            return outcome.map(|_| ());
        }
        self.inner.applied.store(seq, Ordering::SeqCst);

        state.loading = false;
        match outcome {
            Ok(snapshot) => {
                debug!("Fetched status of {} services", snapshot.services.len());
                state.services = snapshot.services;
                state.error = None;
                state.last_updated = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch service status: {}", e);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Ask the server for an immediate check, then re-fetch.
    pub async fn refresh_services(&self) -> Result<()> {
        if let Err(e) = self.inner.api.trigger_check().await {
            warn!("Manual health check failed: {}", e);
            self.inner.state.write().await.error = Some(e.to_string());
            return Err(e);
        }

        self.fetch_services().await
    }

    pub async fn state(&self) -> PollerState {
        self.inner.state.read().await.clone()
    }

    pub async fn stats(&self) -> ServiceStats {
        compute_stats(&self.inner.state.read().await.services)
    }

    pub async fn perceived_state(&self, name: &str) -> PerceivedState {
        let state = self.inner.state.read().await;
        match state.services.iter().find(|s| s.name == name) {
            Some(service) if service.is_up() => PerceivedState::Up,
            Some(_) => PerceivedState::Down,
            None => PerceivedState::Unknown,
        }
    }
}
