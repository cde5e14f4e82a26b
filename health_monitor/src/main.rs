//! Service Health Monitor command line

use clap::{Parser, Subcommand};
use health_monitor::{
    Aggregator, Config, HttpHealthApi, HttpProber, PerceivedState, Result, ServiceRegistry,
    ServicesPoller,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, interval_at};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "health-monitor", version, about = "Probe services and watch the monitoring API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the configured services once and print the result as JSON
    Check {
        /// Only probe this service
        #[arg(long)]
        service: Option<String>,
    },
    /// Poll a running monitoring API and log what it reports
    Watch {
        #[arg(long, env = "MONITORING_API_URL", default_value = "http://localhost:8080")]
        api_url: String,

        #[arg(long, default_value_t = 30)]
        interval_secs: u64,

        /// Trigger a server-side check before the first poll
        #[arg(long)]
        refresh: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { service } => {
            let healthy = check(service).await?;
            if !healthy {
                std::process::exit(2);
            }
        }
        Command::Watch {
            api_url,
            interval_secs,
            refresh,
        } => watch(api_url, interval_secs.max(1), refresh).await?,
    }

    Ok(())
}

async fn check(service: Option<String>) -> Result<bool> {
    let config = Config::from_env();
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    let prober = HttpProber::new(config.health_path.clone(), config.probe_timeout)?;
    let aggregator = Aggregator::new(ServiceRegistry::new(config.services), Arc::new(prober));

    let (json, healthy) = match service {
        Some(name) => {
            let status = aggregator.check_service_health(&name).await?;
            (serde_json::to_string_pretty(&status)?, status.is_up())
        }
        None => {
            let snapshot = aggregator.snapshot().await?;
            let healthy = snapshot.down_services().next().is_none();
            (serde_json::to_string_pretty(&snapshot)?, healthy)
        }
    };

    println!("{}", json);
    Ok(healthy)
}

async fn watch(api_url: String, interval_secs: u64, refresh: bool) -> Result<()> {
    let every = Duration::from_secs(interval_secs);
    let poller = ServicesPoller::new(HttpHealthApi::new(api_url.clone(), Duration::from_secs(10))?);

    info!("Watching monitoring API at {} every {}s", api_url, interval_secs);

    if refresh {
        if let Err(e) = poller.refresh_services().await {
            warn!("Initial refresh failed: {}", e);
        }
    }

    let polling = poller.start(every);
    let mut report = interval_at(Instant::now() + Duration::from_secs(1), every);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = report.tick() => report_state(&poller).await,
            _ = &mut shutdown => break,
        }
    }

    polling.cancel();
    info!("Stopped watching");
    Ok(())
}

async fn report_state(poller: &ServicesPoller<HttpHealthApi>) {
    let state = poller.state().await;
    let stats = poller.stats().await;

    if let Some(e) = &state.error {
        warn!("Last refresh failed, showing data from {:?}: {}", state.last_updated, e);
    }

    info!(
        all_operational = stats.is_all_operational,
        down = stats.down_services_count,
        avg_response_ms = stats.response_time,
        "{} services",
        state.services.len()
    );

    for service in &state.services {
        if poller.perceived_state(&service.name).await == PerceivedState::Down {
            warn!("Service {} is down: {}", service.name, service.details);
        }
    }
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
