//! Monitoring session: recurring aggregation and alerting

use crate::aggregator::Aggregator;
use crate::config::AlertPolicy;
use crate::errors::{MonitorError, Result};
use crate::notifier::Notifier;
use crate::scheduler::{FirstRun, TaskHandle, schedule};
use crate::status::{AggregateSnapshot, HealthState, ServiceStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Read-only view of the session
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringStatus {
    pub is_running: bool,
    pub interval_minutes: f64,
    pub last_run: Option<DateTime<Utc>>,
    pub cycles: u64,
}

/// A message the cycle wants delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNotification {
    pub message: String,
    pub is_alert: bool,
}

/// Owns the single recurring monitoring task.
///
/// `start` and `stop` are the only mutators of the task slot; starting while
/// running replaces the previous task instead of stacking a second one.
pub struct MonitorSession {
    cycle: Arc<Cycle>,
    default_interval_minutes: f64,
    state: Mutex<SessionState>,
}

struct SessionState {
    task: Option<TaskHandle>,
    interval_minutes: f64,
}

struct Cycle {
    aggregator: Aggregator,
    notifier: Arc<dyn Notifier>,
    policy: AlertPolicy,
    last_states: Mutex<HashMap<String, HealthState>>,
    last_run: Mutex<Option<DateTime<Utc>>>,
    cycles: AtomicU64,
}

impl MonitorSession {
    pub fn new(
        aggregator: Aggregator,
        notifier: Arc<dyn Notifier>,
        policy: AlertPolicy,
        default_interval_minutes: f64,
    ) -> Self {
        Self {
            cycle: Arc::new(Cycle {
                aggregator,
                notifier,
                policy,
                last_states: Mutex::new(HashMap::new()),
                last_run: Mutex::new(None),
                cycles: AtomicU64::new(0),
            }),
            default_interval_minutes,
            state: Mutex::new(SessionState {
                task: None,
                interval_minutes: default_interval_minutes,
            }),
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.cycle.aggregator
    }

    /// Start (or restart) the recurring cycle. Returns the interval in use.
    pub async fn start(&self, interval_minutes: Option<f64>) -> Result<f64> {
        let minutes = interval_minutes.unwrap_or(self.default_interval_minutes);
        let every = interval_duration(minutes)?;

        let mut state = self.state.lock().await;
        if let Some(previous) = state.task.take() {
            info!(
                "Replacing running monitoring task (every {:?})",
                previous.every()
            );
            previous.cancel();
        }

        let cycle = Arc::clone(&self.cycle);
        state.task = Some(schedule(every, FirstRun::AfterInterval, move || {
            let cycle = Arc::clone(&cycle);
            async move {
                if let Err(e) = cycle.run().await {
                    error!("Monitoring cycle failed: {}", e);
                }
            }
        }));
        state.interval_minutes = minutes;

        info!("Monitoring started with an interval of {} minutes", minutes);
        Ok(minutes)
    }

    /// Stop the recurring cycle. Returns whether a task was running.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.task.take() {
            Some(task) => {
                task.cancel();
                info!("Monitoring stopped");
                true
            }
            None => false,
        }
    }

    /// Run one cycle now, outside of the schedule.
    pub async fn run_cycle(&self) -> Result<AggregateSnapshot> {
        self.cycle.run().await
    }

    pub async fn is_running(&self) -> bool {
        self.state
            .lock()
            .await
            .task
            .as_ref()
            .is_some_and(TaskHandle::is_active)
    }

    pub async fn status(&self) -> MonitoringStatus {
        let (is_running, interval_minutes) = {
            let state = self.state.lock().await;
            (
                state.task.as_ref().is_some_and(TaskHandle::is_active),
                state.interval_minutes,
            )
        };

        MonitoringStatus {
            is_running,
            interval_minutes,
            last_run: *self.cycle.last_run.lock().await,
            cycles: self.cycle.cycles.load(Ordering::SeqCst),
        }
    }
}

impl Cycle {
    #[instrument(skip(self))]
    async fn run(&self) -> Result<AggregateSnapshot> {
        let snapshot = self.aggregator.snapshot().await?;

        // New states are committed only after delivery; a cycle dropped
        // mid-send leaves the transition to be reported by the next one.
        let mut last_states = self.last_states.lock().await;
        let mut next_states = last_states.clone();
        let planned = plan_notifications(&mut next_states, &snapshot.services, self.policy);

        for notification in planned {
            if let Err(e) = self
                .notifier
                .send_notification(&notification.message, notification.is_alert)
                .await
            {
                warn!("Could not deliver monitoring notification: {}", e);
            }
        }

        *last_states = next_states;
        drop(last_states);

        *self.last_run.lock().await = Some(snapshot.timestamp);
        self.cycles.fetch_add(1, Ordering::SeqCst);

        Ok(snapshot)
    }
}

fn interval_duration(minutes: f64) -> Result<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return Err(MonitorError::InvalidInterval(minutes));
    }

    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or(MonitorError::InvalidInterval(minutes))
}

/// Compare a cycle's statuses with the previously observed states, record the
/// new states and decide what to send.
pub fn plan_notifications(
    last_states: &mut HashMap<String, HealthState>,
    services: &[ServiceStatus],
    policy: AlertPolicy,
) -> Vec<PlannedNotification> {
    let mut newly_down = Vec::new();
    let mut still_down = Vec::new();
    let mut recovered = Vec::new();

    for service in services {
        let previous = last_states.insert(service.name.clone(), service.status);

        match (previous, service.status) {
            (Some(HealthState::Up) | None, HealthState::Down) => newly_down.push(service),
            (Some(HealthState::Down), HealthState::Down) => still_down.push(service),
            (Some(HealthState::Down), HealthState::Up) => recovered.push(service),
            _ => {}
        }
    }

    let mut planned = Vec::new();

    let alerting: Vec<&ServiceStatus> = match policy {
        AlertPolicy::Transitions => newly_down,
        AlertPolicy::EveryDown => newly_down.into_iter().chain(still_down).collect(),
    };

    if !alerting.is_empty() {
        let lines: Vec<String> = alerting.iter().map(|s| describe_down(s)).collect();
        planned.push(PlannedNotification {
            message: format!("Services indisponibles :\n{}", lines.join("\n")),
            is_alert: true,
        });
    }

    if !recovered.is_empty() {
        let lines: Vec<String> = recovered
            .iter()
            .map(|s| match s.response_time {
                Some(ms) => format!("• {} ({} ms)", s.name, ms),
                None => format!("• {}", s.name),
            })
            .collect();
        planned.push(PlannedNotification {
            message: format!("Services rétablis :\n{}", lines.join("\n")),
            is_alert: false,
        });
    }

    planned
}

fn describe_down(status: &ServiceStatus) -> String {
    let code = status.details.get("code").and_then(Value::as_str);
    let message = status.details.get("message").and_then(Value::as_str);

    match (code, message) {
        (Some(code), Some(message)) => format!("• {} ({}: {})", status.name, code, message),
        (Some(code), None) => format!("• {} ({})", status.name, code),
        _ => format!("• {}", status.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::tests::{Scripted, ScriptedProber};
    use crate::notifier::tests::RecordingNotifier;
    use crate::registry::ServiceRegistry;
    use crate::status::{ProbeError, ServiceDescriptor};
    use tokio::time::advance;

    fn registry() -> ServiceRegistry {
        ServiceRegistry::new(vec![
            ServiceDescriptor::new("auth", "http://auth"),
            ServiceDescriptor::new("db", "http://db"),
        ])
    }

    fn session(
        prober: Arc<ScriptedProber>,
        notifier: Arc<RecordingNotifier>,
        policy: AlertPolicy,
    ) -> MonitorSession {
        MonitorSession::new(Aggregator::new(registry(), prober), notifier, policy, 5.0)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn probe_calls(prober: &ScriptedProber) -> usize {
        prober.calls.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_a_single_task() {
        let prober = Arc::new(ScriptedProber::default());
        let session = session(prober.clone(), Arc::default(), AlertPolicy::Transitions);

        session.start(Some(1.0)).await.unwrap();
        session.start(Some(1.0)).await.unwrap();
        assert!(session.is_running().await);

        for _ in 0..3 {
            advance(Duration::from_secs(61)).await;
            settle().await;
        }

        // two services, three cycles
        assert_eq!(probe_calls(&prober), 6);
        assert_eq!(session.status().await.cycles, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_cycles() {
        let prober = Arc::new(ScriptedProber::default());
        let session = session(prober.clone(), Arc::default(), AlertPolicy::Transitions);

        session.start(Some(1.0)).await.unwrap();
        assert!(session.stop().await);

        advance(Duration::from_secs(150)).await;
        settle().await;

        assert_eq!(probe_calls(&prober), 0);
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let session = session(Arc::default(), Arc::default(), AlertPolicy::Transitions);
        assert!(!session.stop().await);
        assert!(!session.stop().await);
        assert!(!session.status().await.is_running);
    }

    #[tokio::test]
    async fn test_start_uses_default_interval() {
        let session = session(Arc::default(), Arc::default(), AlertPolicy::Transitions);

        assert_eq!(session.start(None).await.unwrap(), 5.0);
        let status = session.status().await;
        assert!(status.is_running);
        assert_eq!(status.interval_minutes, 5.0);

        assert_eq!(session.start(Some(0.5)).await.unwrap(), 0.5);
        assert_eq!(session.status().await.interval_minutes, 0.5);
    }

    #[tokio::test]
    async fn test_invalid_interval_is_rejected() {
        let session = session(Arc::default(), Arc::default(), AlertPolicy::Transitions);

        for minutes in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let result = session.start(Some(minutes)).await;
            assert!(matches!(result, Err(MonitorError::InvalidInterval(_))));
        }
        assert!(!session.is_running().await);
    }

    #[tokio::test]
    async fn test_transition_alerts_once_then_recovers() {
        let prober = Arc::new(ScriptedProber::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session(prober.clone(), notifier.clone(), AlertPolicy::Transitions);

        session.run_cycle().await.unwrap();
        assert!(notifier.sent.lock().await.is_empty());

        prober.set("db", Scripted::Down).await;
        session.run_cycle().await.unwrap();
        session.run_cycle().await.unwrap();

        prober.set("db", Scripted::Up { delay_ms: 0 }).await;
        session.run_cycle().await.unwrap();

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[0].1);
        assert!(sent[0].0.contains("db"));
        assert!(!sent[0].0.contains("auth"));
        assert!(!sent[1].1);
        assert!(sent[1].0.contains("rétablis"));
    }

    #[tokio::test]
    async fn test_every_down_policy_repeats_alerts() {
        let prober = Arc::new(ScriptedProber::default());
        prober.set("db", Scripted::Down).await;
        let notifier = Arc::new(RecordingNotifier::default());
        let session = session(prober, notifier.clone(), AlertPolicy::EveryDown);

        session.run_cycle().await.unwrap();
        session.run_cycle().await.unwrap();

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, is_alert)| *is_alert));
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_fail_cycle() {
        let prober = Arc::new(ScriptedProber::default());
        prober.set("auth", Scripted::Down).await;
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..Default::default()
        });
        let session = session(prober, notifier.clone(), AlertPolicy::Transitions);

        let snapshot = session.run_cycle().await.unwrap();

        assert_eq!(snapshot.services.len(), 2);
        assert_eq!(notifier.sent.lock().await.len(), 1);
        let status = session.status().await;
        assert_eq!(status.cycles, 1);
        assert_eq!(status.last_run, Some(snapshot.timestamp));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_dropped_mid_delivery_alerts_again() {
        let prober = Arc::new(ScriptedProber::default());
        let notifier = Arc::new(RecordingNotifier {
            delay: Duration::from_secs(2),
            ..Default::default()
        });
        let session = Arc::new(session(prober.clone(), notifier.clone(), AlertPolicy::Transitions));

        session.run_cycle().await.unwrap();
        prober.set("db", Scripted::Down).await;

        let interrupted = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        interrupted.abort();
        assert!(interrupted.await.unwrap_err().is_cancelled());
        assert!(notifier.sent.lock().await.is_empty());

        for _ in 0..3 {
            session.run_cycle().await.unwrap();
        }

        let sent = notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1);
        assert!(sent[0].0.contains("db"));
    }

    #[test]
    fn test_plan_unknown_to_down_alerts() {
        let mut last = HashMap::new();
        let services = vec![ServiceStatus::down("db", &ProbeError::connection_refused("refused"))];

        let planned = plan_notifications(&mut last, &services, AlertPolicy::Transitions);

        assert_eq!(planned.len(), 1);
        assert!(planned[0].is_alert);
        assert!(planned[0].message.contains("• db (ECONNREFUSED: refused)"));
        assert_eq!(last.get("db"), Some(&HealthState::Down));
    }

    #[test]
    fn test_plan_unknown_to_up_is_silent() {
        let mut last = HashMap::new();
        let services = vec![ServiceStatus::up("auth", 12, Value::Null)];

        assert!(plan_notifications(&mut last, &services, AlertPolicy::EveryDown).is_empty());
    }
}
