//! Fan-out of probes across the registry

use crate::errors::{MonitorError, Result};
use crate::prober::Prober;
use crate::registry::ServiceRegistry;
use crate::status::{AggregateSnapshot, ProbeError, ServiceStatus};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Runs the prober against every registered service
#[derive(Clone)]
pub struct Aggregator {
    registry: ServiceRegistry,
    prober: Arc<dyn Prober>,
}

impl Aggregator {
    pub fn new(registry: ServiceRegistry, prober: Arc<dyn Prober>) -> Self {
        Self { registry, prober }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Probe every service concurrently. Results follow registry order and a
    /// failing probe never fails the whole call.
    #[instrument(skip(self))]
    pub async fn check_all_services(&self) -> Result<Vec<ServiceStatus>> {
        let probes = self.registry.iter().map(|service| async move {
            match self.prober.check(service).await {
                Ok(status) => status,
                Err(e) => {
                    error!("Probe of {} failed: {}", service.name, e);
                    ServiceStatus::down(&service.name, &ProbeError::unknown(e.to_string()))
                }
            }
        });

        let statuses = join_all(probes).await;
        let down = statuses.iter().filter(|s| !s.is_up()).count();

        info!(
            "Checked {} services: {} up, {} down",
            statuses.len(),
            statuses.len() - down,
            down
        );

        Ok(statuses)
    }

    pub async fn snapshot(&self) -> Result<AggregateSnapshot> {
        Ok(AggregateSnapshot::new(self.check_all_services().await?))
    }

    /// Probe a single service by exact name. Prober errors propagate here.
    pub async fn check_service_health(&self, name: &str) -> Result<ServiceStatus> {
        let service = self
            .registry
            .find(name)
            .ok_or_else(|| MonitorError::NotFound(name.to_string()))?;

        self.prober.check(service).await
    }
}
