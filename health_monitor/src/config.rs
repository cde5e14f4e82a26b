//! Configuration management for the health monitor

use crate::status::ServiceDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// When the monitoring cycle raises notifications
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AlertPolicy {
    /// Alert on up→down (and unknown→down), info on down→up
    #[default]
    Transitions,
    /// Alert every cycle while any service is down, info on down→up
    EveryDown,
}

impl From<&str> for AlertPolicy {
    fn from(s: &str) -> Self {
        match s.to_lowercase().replace('_', "-").as_str() {
            "every-down" | "always" => AlertPolicy::EveryDown,
            _ => AlertPolicy::Transitions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Monitored services, in registry order
    pub services: Vec<ServiceDescriptor>,

    /// Path appended to each service URL when probing
    pub health_path: String,

    /// Upper bound for a single probe
    pub probe_timeout: Duration,

    /// Discord webhook receiving alerts
    pub discord_webhook_url: Option<String>,

    /// Username displayed by Discord for webhook messages
    pub discord_username: String,

    /// Interval used by `start` when none is given
    pub monitoring_interval_minutes: f64,

    pub alert_policy: AlertPolicy,

    /// Start the monitoring session when the process boots
    pub autostart: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            health_path: "/health".to_string(),
            probe_timeout: Duration::from_millis(5000),
            discord_webhook_url: None,
            discord_username: "CRM Monitoring".to_string(),
            monitoring_interval_minutes: 5.0,
            alert_policy: AlertPolicy::Transitions,
            autostart: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(services) = lookup("MONITORED_SERVICES") {
            config.services = parse_services(&services);
        }

        if let Some(path) = lookup("HEALTH_CHECK_PATH") {
            config.health_path = path;
        }

        if let Some(timeout) = lookup("HEALTH_CHECK_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                config.probe_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(webhook) = lookup("DISCORD_WEBHOOK_URL") {
            if !webhook.trim().is_empty() {
                config.discord_webhook_url = Some(webhook.trim().to_string());
            }
        }

        if let Some(username) = lookup("DISCORD_USERNAME") {
            config.discord_username = username;
        }

        if let Some(interval) = lookup("MONITORING_INTERVAL_MINUTES") {
            if let Ok(minutes) = interval.parse::<f64>() {
                config.monitoring_interval_minutes = minutes;
            }
        }

        if let Some(policy) = lookup("ALERT_POLICY") {
            config.alert_policy = AlertPolicy::from(policy.as_str());
        }

        if let Some(autostart) = lookup("MONITORING_AUTOSTART") {
            config.autostart = autostart.to_lowercase() == "true";
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();

        for service in &self.services {
            if service.name.is_empty() {
                return Err("service name cannot be empty".to_string());
            }

            if url::Url::parse(&service.url).is_err() {
                return Err(format!("service {} has an invalid url: {}", service.name, service.url));
            }

            if !seen.insert(service.name.as_str()) {
                return Err(format!("service {} is registered twice", service.name));
            }
        }

        if self.probe_timeout.is_zero() {
            return Err("probe timeout must be greater than 0".to_string());
        }

        if !self.monitoring_interval_minutes.is_finite() || self.monitoring_interval_minutes <= 0.0 {
            return Err("monitoring interval must be a positive number of minutes".to_string());
        }

        if let Some(webhook) = &self.discord_webhook_url {
            if url::Url::parse(webhook).is_err() {
                return Err("discord webhook url is invalid".to_string());
            }
        }

        Ok(())
    }
}

/// Parse `name=url` pairs separated by commas. Entries without `=` are skipped.
pub fn parse_services(raw: &str) -> Vec<ServiceDescriptor> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (name, url) = entry.split_once('=')?;
            Some(ServiceDescriptor::new(name.trim(), url.trim()))
        })
        .collect()
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
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);

        assert!(config.services.is_empty());
        assert_eq!(config.health_path, "/health");
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.monitoring_interval_minutes, 5.0);
        assert_eq!(config.alert_policy, AlertPolicy::Transitions);
        assert!(config.discord_webhook_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_services_keep_registry_order() {
        let config = Config::from_lookup(lookup_from(&[(
            "MONITORED_SERVICES",
            "auth=http://auth:3001, db=http://db:5432 ,,mailer=http://mailer",
        )]));

        let names: Vec<_> = config.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["auth", "db", "mailer"]);
        assert_eq!(config.services[1].url, "http://db:5432");
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HEALTH_CHECK_TIMEOUT_MS", "250"),
            ("MONITORING_INTERVAL_MINUTES", "0.5"),
            ("ALERT_POLICY", "every_down"),
            ("MONITORING_AUTOSTART", "TRUE"),
            ("DISCORD_WEBHOOK_URL", "https://discord.com/api/webhooks/1/abc"),
        ]));

        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert_eq!(config.monitoring_interval_minutes, 0.5);
        assert_eq!(config.alert_policy, AlertPolicy::EveryDown);
        assert!(config.autostart);
        assert!(config.discord_webhook_url.is_some());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = Config {
            services: parse_services("auth=http://a,auth=http://b"),
            ..Config::default()
        };

        assert!(config.validate().unwrap_err().contains("auth"));
    }

    #[test]
    fn test_validate_rejects_bad_url_and_interval() {
        let config = Config {
            services: parse_services("auth=not a url"),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            monitoring_interval_minutes: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
