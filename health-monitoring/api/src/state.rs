use std::sync::Arc;

use health_monitor::{
    Aggregator, AlertPolicy, Config, DiscordNotifier, HttpProber, MonitorSession, Notifier,
    Result, ServiceRegistry,
};

// App state
pub struct AppState {
    pub monitor: MonitorSession,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        aggregator: Aggregator,
        notifier: Arc<dyn Notifier>,
        policy: AlertPolicy,
        default_interval_minutes: f64,
    ) -> Self {
        Self {
            monitor: MonitorSession::new(
                aggregator,
                Arc::clone(&notifier),
                policy,
                default_interval_minutes,
            ),
            notifier,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let prober = HttpProber::new(config.health_path.clone(), config.probe_timeout)?;
        let notifier = DiscordNotifier::new(
            config.discord_webhook_url.clone(),
            config.discord_username.clone(),
        )?;
        let aggregator = Aggregator::new(
            ServiceRegistry::new(config.services.clone()),
            Arc::new(prober),
        );

        Ok(Self::new(
            aggregator,
            Arc::new(notifier),
            config.alert_policy,
            config.monitoring_interval_minutes,
        ))
    }
}
