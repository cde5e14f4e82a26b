//! Service Health Monitor Library
//!
//! This library probes the HTTP health endpoints of dependent services,
//! aggregates their status, raises Discord alerts when a service goes down
//! or recovers, and provides a polling client for the monitoring API.

pub mod aggregator;
pub mod config;
pub mod errors;
pub mod monitor;
pub mod notifier;
pub mod poller;
pub mod prober;
pub mod registry;
pub mod response;
pub mod scheduler;
pub mod status;

pub use aggregator::Aggregator;
pub use config::{AlertPolicy, Config};
pub use errors::{MonitorError, Result};
pub use monitor::{MonitorSession, MonitoringStatus};
pub use notifier::{DiscordNotifier, Notifier};
pub use poller::{HealthApi, HttpHealthApi, PerceivedState, ServiceStats, ServicesPoller, compute_stats};
pub use prober::{HttpProber, Prober};
pub use registry::ServiceRegistry;
pub use response::ApiResponse;
pub use scheduler::{FirstRun, TaskHandle, schedule};
pub use status::{AggregateSnapshot, HealthState, ProbeError, ProbeErrorKind, ServiceDescriptor, ServiceStatus};
