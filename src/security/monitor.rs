use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::MonitorConfig;
use super::detect::{self, BURST_TYPE_KEY, IDENTITY_KEYS, USER_AGENT_KEY};
use super::types::{
    AlertType, EventSeverity, Metadata, SecurityAlert, SecurityEvent, SecurityEventType,
    SecurityMetrics,
};
use crate::storage::{MemoryStorage, Storage, StorageExt};

const HOUR: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Default)]
struct Log {
    events: VecDeque<SecurityEvent>,
    alerts: VecDeque<SecurityAlert>,
}

impl Log {
    fn push_event(&mut self, event: SecurityEvent, cap: usize) {
        self.events.push_back(event);
        while self.events.len() > cap {
            self.events.pop_front();
        }
    }

    fn push_alert(&mut self, alert: SecurityAlert, cap: usize) {
        self.alerts.push_back(alert);
        while self.alerts.len() > cap {
            self.alerts.pop_front();
        }
    }

    fn metrics(&self, now: DateTime<Utc>) -> SecurityMetrics {
        let hour_ago = detect::window_start(now, HOUR);
        let mut metrics = SecurityMetrics {
            total_events: self.events.len(),
            total_alerts: self.alerts.len(),
            ..Default::default()
        };

        for event in &self.events {
            *metrics.events_by_type.entry(event.event_type).or_default() += 1;
            *metrics.events_by_severity.entry(event.severity).or_default() += 1;

            let recent = event.timestamp >= hour_ago;
            if recent {
                metrics.events_last_hour += 1;
            }
            match event.event_type {
                SecurityEventType::LoginFailure => {
                    metrics.failed_logins += 1;
                    if recent {
                        metrics.failed_logins_last_hour += 1;
                    }
                }
                SecurityEventType::SuspiciousActivity => {
                    metrics.suspicious_activities += 1;
                    if recent {
                        metrics.suspicious_last_hour += 1;
                    }
                }
                _ => {}
            }
        }

        metrics.unacknowledged_alerts = self.alerts.iter().filter(|a| !a.acknowledged).count();
        metrics
    }
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    config: MonitorConfig,
    storage: Arc<dyn Storage>,
    log: RwLock<Log>,
    task: Mutex<Option<MonitorTask>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = task.take() {
            task.cancel.cancel();
        }
    }
}

/// Bounded security event log with derived alerts.
///
/// Cloning yields another handle to the same log. The periodic check task
/// holds only a weak reference, so dropping the last handle stops it.
#[derive(Clone)]
pub struct SecurityMonitor {
    inner: Arc<Inner>,
}

impl SecurityMonitor {
    /// Create a monitor, loading any events and alerts persisted under the
    /// configured keys. Corrupt or missing entries load as empty.
    pub fn new(config: MonitorConfig, storage: Arc<dyn Storage>) -> Self {
        let mut log = Log::default();
        if config.persist {
            if let Some(events) = storage.load_json::<Vec<SecurityEvent>>(&config.events_key) {
                for event in events {
                    log.push_event(event, config.max_events);
                }
            }
            if let Some(alerts) = storage.load_json::<Vec<SecurityAlert>>(&config.alerts_key) {
                for alert in alerts {
                    log.push_alert(alert, config.max_alerts);
                }
            }
            tracing::debug!(
                storage = storage.name(),
                events = log.events.len(),
                alerts = log.alerts.len(),
                "Loaded persisted security log"
            );
        }

        Self {
            inner: Arc::new(Inner {
                config,
                storage,
                log: RwLock::new(log),
                task: Mutex::new(None),
            }),
        }
    }

    /// A monitor that never touches persistent storage.
    pub fn in_memory() -> Self {
        Self::new(MonitorConfig::ephemeral(), Arc::new(MemoryStorage::new()))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Append a new event stamped with the current time. Returns its id.
    pub fn log_event(
        &self,
        event_type: SecurityEventType,
        severity: EventSeverity,
        details: impl Into<String>,
        metadata: Metadata,
    ) -> Uuid {
        let mut event = SecurityEvent::new(event_type, severity, details);
        event.metadata = metadata;
        let id = event.id;
        self.record(event);
        id
    }

    /// Append `event`, run the per-event detections and persist. Returns
    /// the alerts raised by this append.
    pub fn record(&self, mut event: SecurityEvent) -> Vec<SecurityAlert> {
        for key in IDENTITY_KEYS {
            if let Some(Value::String(identity)) = event.metadata.get_mut(key) {
                *identity = detect::mask_identity(identity);
            }
        }

        let config = &self.inner.config;
        let now = event.timestamp;
        let event_id = event.id;
        let event_type = event.event_type;
        let identity = detect::identity_of(&event).map(str::to_string);
        let user_agent = event.metadata_str(USER_AGENT_KEY).map(str::to_string);

        let mut log = self.inner.log.write().unwrap_or_else(|e| e.into_inner());
        log.push_event(event, config.max_events);

        let mut raised = Vec::new();

        let burst: Option<Vec<Uuid>> = detect::detect_burst(
            &log.events,
            event_type,
            now,
            config.burst_window,
            config.burst_threshold,
        )
        .map(|events| events.iter().map(|e| e.id).collect());
        if let Some(related) = burst {
            let count = related.len();
            let message = format!(
                "{count} {event_type} events within {}s",
                config.burst_window.as_secs()
            );
            let suspicious = SecurityEvent::new(
                SecurityEventType::SuspiciousActivity,
                EventSeverity::High,
                format!("Burst detected: {message}"),
            )
            .at(now)
            .with_metadata(BURST_TYPE_KEY, event_type.as_str())
            .with_metadata("count", count);
            let alert = SecurityAlert::new(AlertType::BurstActivity, EventSeverity::High, message)
                .at(now)
                .subject(event_type.as_str())
                .related(related);

            log.push_event(suspicious, config.max_events);
            log.push_alert(alert.clone(), config.max_alerts);
            raised.push(alert);
        }

        if event_type == SecurityEventType::LoginFailure
            && let Some(identity) = &identity
        {
            let failures: Option<Vec<Uuid>> = detect::detect_failed_logins(
                &log.events,
                &log.alerts,
                identity,
                now,
                config.failed_login_window,
                config.failed_login_threshold,
            )
            .map(|events| events.iter().map(|e| e.id).collect());
            if let Some(related) = failures {
                let alert = SecurityAlert::new(
                    AlertType::RepeatedLoginFailure,
                    EventSeverity::High,
                    format!(
                        "{} failed logins for {identity} within {} minutes",
                        related.len(),
                        config.failed_login_window.as_secs() / 60
                    ),
                )
                .at(now)
                .subject(identity.as_str())
                .related(related);
                log.push_alert(alert.clone(), config.max_alerts);
                raised.push(alert);
            }
        }

        if event_type != SecurityEventType::SuspiciousActivity
            && let Some(user_agent) = &user_agent
            && let Some(marker) = detect::is_unusual_user_agent(user_agent)
        {
            let suspicious = SecurityEvent::new(
                SecurityEventType::SuspiciousActivity,
                EventSeverity::Medium,
                format!("Unusual user agent ({marker})"),
            )
            .at(now)
            .with_metadata(USER_AGENT_KEY, user_agent.as_str())
            .with_metadata("source_event", event_id.to_string());
            let alert = SecurityAlert::new(
                AlertType::UnusualUserAgent,
                EventSeverity::Medium,
                format!("Non-browser user agent detected: {user_agent}"),
            )
            .at(now)
            .subject(marker)
            .related([event_id, suspicious.id]);

            log.push_event(suspicious, config.max_events);
            log.push_alert(alert.clone(), config.max_alerts);
            raised.push(alert);
        }

        self.persist_events(&log);
        if !raised.is_empty() {
            self.persist_alerts(&log);
        }
        drop(log);

        for alert in &raised {
            tracing::warn!(
                alert_type = ?alert.alert_type,
                severity = ?alert.severity,
                subject = alert.subject.as_deref().unwrap_or(""),
                "{}",
                alert.message
            );
        }
        raised
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        log.events.iter().cloned().collect()
    }

    pub fn events_of_type(&self, event_type: SecurityEventType) -> Vec<SecurityEvent> {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        log.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn alerts(&self) -> Vec<SecurityAlert> {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        log.alerts.iter().cloned().collect()
    }

    pub fn unacknowledged_alerts(&self) -> Vec<SecurityAlert> {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        log.alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect()
    }

    pub fn get_metrics(&self) -> SecurityMetrics {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        log.metrics(Utc::now())
    }

    /// Mark an alert as read. Returns whether an alert with `id` exists.
    pub fn acknowledge_alert(&self, id: Uuid) -> bool {
        let mut log = self.inner.log.write().unwrap_or_else(|e| e.into_inner());
        let Some(alert) = log.alerts.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        if !alert.acknowledged {
            alert.acknowledged = true;
            self.persist_alerts(&log);
        }
        true
    }

    /// Drop every event and alert, in memory and in storage.
    pub fn clear(&self) {
        let mut log = self.inner.log.write().unwrap_or_else(|e| e.into_inner());
        log.events.clear();
        log.alerts.clear();
        drop(log);

        let config = &self.inner.config;
        if !config.persist {
            return;
        }
        for key in [&config.events_key, &config.alerts_key] {
            if let Err(e) = self.inner.storage.remove_item(key) {
                tracing::warn!(key = %key, error = %e, "Failed to clear persisted security log");
            }
        }
    }

    /// Re-evaluate hourly aggregates. Returns the alerts raised.
    pub fn run_periodic_checks(&self) -> Vec<SecurityAlert> {
        let config = &self.inner.config;
        let now = Utc::now();
        let mut log = self.inner.log.write().unwrap_or_else(|e| e.into_inner());
        let metrics = log.metrics(now);

        let checks = [
            (
                metrics.events_last_hour,
                config.hourly_event_threshold,
                AlertType::HighEventVolume,
                EventSeverity::Medium,
                "security events",
            ),
            (
                metrics.failed_logins_last_hour,
                config.hourly_failed_login_threshold,
                AlertType::HighFailedLoginRate,
                EventSeverity::High,
                "failed logins",
            ),
            (
                metrics.suspicious_last_hour,
                config.hourly_suspicious_threshold,
                AlertType::HighSuspiciousActivity,
                EventSeverity::Critical,
                "suspicious activities",
            ),
        ];

        let mut raised = Vec::new();
        for (count, threshold, alert_type, severity, what) in checks {
            if count <= threshold {
                continue;
            }
            let alert = SecurityAlert::new(
                alert_type,
                severity,
                format!("{count} {what} in the last hour (threshold {threshold})"),
            )
            .at(now);
            log.push_alert(alert.clone(), config.max_alerts);
            raised.push(alert);
        }

        if !raised.is_empty() {
            self.persist_alerts(&log);
        }
        drop(log);

        tracing::debug!(
            events_last_hour = metrics.events_last_hour,
            failed_logins_last_hour = metrics.failed_logins_last_hour,
            suspicious_last_hour = metrics.suspicious_last_hour,
            alerts = raised.len(),
            "Periodic security check"
        );
        for alert in &raised {
            tracing::warn!(alert_type = ?alert.alert_type, severity = ?alert.severity, "{}", alert.message);
        }
        raised
    }

    /// Start running [`run_periodic_checks`](Self::run_periodic_checks)
    /// every `check_interval`. Returns false if a task is already running
    /// or no tokio runtime is available.
    pub fn start_monitoring(&self) -> bool {
        let mut task = self.inner.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let period = self.inner.config.check_interval;
        if period.is_zero() {
            tracing::warn!("Security monitoring not started: check interval is zero");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Security monitoring not started: no tokio runtime");
            return false;
        };

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(periodic_checks(
            Arc::downgrade(&self.inner),
            period,
            cancel.clone(),
        ));
        *task = Some(MonitorTask { cancel, handle });

        tracing::info!(interval_secs = period.as_secs(), "Security monitoring started");
        true
    }

    /// Cancel the periodic task. Returns whether one was running.
    pub fn stop_monitoring(&self) -> bool {
        let task = self
            .inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match task {
            Some(task) => {
                task.cancel.cancel();
                let was_running = !task.handle.is_finished();
                tracing::info!("Security monitoring stopped");
                was_running
            }
            None => false,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.inner
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
    }

    fn persist_events(&self, log: &Log) {
        let config = &self.inner.config;
        if !config.persist {
            return;
        }
        if let Err(e) = self.inner.storage.store_json(&config.events_key, &log.events) {
            tracing::warn!(key = %config.events_key, error = %e, "Failed to persist security events");
        }
    }

    fn persist_alerts(&self, log: &Log) {
        let config = &self.inner.config;
        if !config.persist {
            return;
        }
        if let Err(e) = self.inner.storage.store_json(&config.alerts_key, &log.alerts) {
            tracing::warn!(key = %config.alerts_key, error = %e, "Failed to persist security alerts");
        }
    }
}

async fn periodic_checks(inner: Weak<Inner>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                SecurityMonitor { inner }.run_periodic_checks();
            }
        }
    }
    tracing::debug!("Security check task exited");
}

impl std::fmt::Debug for SecurityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.inner.log.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("SecurityMonitor")
            .field("events", &log.events.len())
            .field("alerts", &log.alerts.len())
            .field("storage", &self.inner.storage.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    fn monitor_with(config: MonitorConfig) -> (SecurityMonitor, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (SecurityMonitor::new(config, storage.clone()), storage)
    }

    #[test]
    fn test_fifo_eviction_keeps_newest() {
        let config = MonitorConfig {
            max_events: 10,
            burst_threshold: usize::MAX,
            ..MonitorConfig::ephemeral()
        };
        let (monitor, _) = monitor_with(config);

        let ids: Vec<Uuid> = (0..25)
            .map(|i| {
                monitor.log_event(
                    SecurityEventType::LoginAttempt,
                    EventSeverity::Low,
                    format!("attempt {i}"),
                    Metadata::new(),
                )
            })
            .collect();

        let kept: Vec<Uuid> = monitor.events().iter().map(|e| e.id).collect();
        assert_eq!(kept, &ids[15..]);
    }

    #[test]
    fn test_burst_emits_single_suspicious_event() {
        let monitor = SecurityMonitor::in_memory();
        for _ in 0..6 {
            monitor.log_event(
                SecurityEventType::PermissionDenied,
                EventSeverity::Medium,
                "denied",
                Metadata::new(),
            );
        }
        assert_eq!(
            monitor
                .events_of_type(SecurityEventType::SuspiciousActivity)
                .len(),
            1
        );

        for _ in 0..4 {
            monitor.log_event(
                SecurityEventType::PermissionDenied,
                EventSeverity::Medium,
                "denied",
                Metadata::new(),
            );
        }
        let suspicious = monitor.events_of_type(SecurityEventType::SuspiciousActivity);
        assert_eq!(suspicious.len(), 1);
        assert_eq!(
            suspicious[0].metadata_str(BURST_TYPE_KEY),
            Some("permission_denied")
        );

        let alerts = monitor.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::BurstActivity);
        assert_eq!(alerts[0].related_events.len(), 6);
    }

    #[test]
    fn test_burst_flags_again_after_window() {
        let monitor = SecurityMonitor::in_memory();
        let start = Utc::now() - TimeDelta::minutes(10);

        for i in 0..6 {
            monitor.record(
                SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "a")
                    .at(start + TimeDelta::seconds(i)),
            );
        }
        for i in 0..6 {
            monitor.record(
                SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "a")
                    .at(start + TimeDelta::seconds(120 + i)),
            );
        }
        assert_eq!(
            monitor
                .events_of_type(SecurityEventType::SuspiciousActivity)
                .len(),
            2
        );
    }

    #[test]
    fn test_failed_logins_masked_and_alerted_once() {
        let monitor = SecurityMonitor::in_memory();
        let mut raised = Vec::new();
        for _ in 0..8 {
            let event = SecurityEvent::new(
                SecurityEventType::LoginFailure,
                EventSeverity::Medium,
                "bad password",
            )
            .with_metadata("email", "jane.doe@school.edu");
            raised.extend(monitor.record(event));
        }

        let login_alerts: Vec<_> = raised
            .iter()
            .filter(|a| a.alert_type == AlertType::RepeatedLoginFailure)
            .collect();
        assert_eq!(login_alerts.len(), 1);
        assert_eq!(login_alerts[0].subject.as_deref(), Some("ja***@school.edu"));
        assert_eq!(login_alerts[0].related_events.len(), 6);

        assert!(
            monitor
                .events()
                .iter()
                .all(|e| e.metadata_str("email") != Some("jane.doe@school.edu"))
        );
    }

    #[test]
    fn test_unusual_user_agent() {
        let monitor = SecurityMonitor::in_memory();
        let raised = monitor.record(
            SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "login")
                .with_metadata(USER_AGENT_KEY, "python-requests/2.31"),
        );

        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].alert_type, AlertType::UnusualUserAgent);
        assert_eq!(raised[0].subject.as_deref(), Some("python"));
        assert_eq!(
            monitor
                .events_of_type(SecurityEventType::SuspiciousActivity)
                .len(),
            1
        );

        let raised = monitor.record(
            SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "login")
                .with_metadata(USER_AGENT_KEY, "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0"),
        );
        assert!(raised.is_empty());
    }

    #[test]
    fn test_metrics() {
        let monitor = SecurityMonitor::in_memory();
        monitor.log_event(
            SecurityEventType::LoginFailure,
            EventSeverity::Medium,
            "x",
            meta(&[("username", "instructor1")]),
        );
        monitor.log_event(
            SecurityEventType::LoginSuccess,
            EventSeverity::Low,
            "x",
            Metadata::new(),
        );
        monitor.record(
            SecurityEvent::new(SecurityEventType::LoginFailure, EventSeverity::Medium, "old")
                .at(Utc::now() - TimeDelta::hours(3)),
        );

        let metrics = monitor.get_metrics();
        assert_eq!(metrics.total_events, 3);
        assert_eq!(metrics.events_last_hour, 2);
        assert_eq!(metrics.failed_logins, 2);
        assert_eq!(metrics.failed_logins_last_hour, 1);
        assert_eq!(
            metrics.events_by_type[&SecurityEventType::LoginFailure],
            2
        );
        assert_eq!(metrics.events_by_severity[&EventSeverity::Low], 1);
        assert_eq!(metrics.unacknowledged_alerts, 0);
    }

    #[test]
    fn test_acknowledge_is_idempotent() {
        let (monitor, storage) = monitor_with(MonitorConfig::default());
        let alert = monitor
            .record(
                SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "x")
                    .with_metadata(USER_AGENT_KEY, "curl/8.0"),
            )
            .remove(0);

        assert!(monitor.acknowledge_alert(alert.id));
        assert!(monitor.acknowledge_alert(alert.id));
        assert!(!monitor.acknowledge_alert(Uuid::new_v4()));

        assert!(monitor.unacknowledged_alerts().is_empty());
        assert_eq!(monitor.alerts().len(), 1);

        let stored: Vec<SecurityAlert> = storage.load_json("security_alerts").unwrap();
        assert!(stored[0].acknowledged);
    }

    #[test]
    fn test_reload_restores_window() {
        let storage = Arc::new(MemoryStorage::new());
        let first = SecurityMonitor::new(MonitorConfig::default(), storage.clone());
        for i in 0..3 {
            first.log_event(
                SecurityEventType::SessionCreated,
                EventSeverity::Low,
                format!("session {i}"),
                Metadata::new(),
            );
        }

        let second = SecurityMonitor::new(MonitorConfig::default(), storage);
        assert_eq!(first.events(), second.events());
    }

    #[test]
    fn test_reload_trims_to_capacity() {
        let storage = Arc::new(MemoryStorage::new());
        let big = SecurityMonitor::new(MonitorConfig::default(), storage.clone());
        let start = Utc::now() - TimeDelta::hours(1);
        for i in 0..20 {
            big.record(
                SecurityEvent::new(SecurityEventType::Logout, EventSeverity::Low, "bye")
                    .at(start + TimeDelta::minutes(i)),
            );
        }
        let expected: Vec<Uuid> = big.events()[15..].iter().map(|e| e.id).collect();

        let small = SecurityMonitor::new(
            MonitorConfig {
                max_events: 5,
                ..Default::default()
            },
            storage,
        );
        let ids: Vec<Uuid> = small.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("security_events", "[{\"broken\"").unwrap();
        storage.set_item("security_alerts", "42").unwrap();

        let monitor = SecurityMonitor::new(MonitorConfig::default(), storage);
        assert!(monitor.events().is_empty());
        assert!(monitor.alerts().is_empty());
    }

    #[test]
    fn test_persist_failure_is_swallowed() {
        let storage = Arc::new(MemoryStorage::with_quota(64));
        let monitor = SecurityMonitor::new(MonitorConfig::default(), storage.clone());

        for _ in 0..3 {
            monitor.log_event(
                SecurityEventType::PasswordChange,
                EventSeverity::High,
                "a fairly long description that will not fit in the quota",
                Metadata::new(),
            );
        }

        assert_eq!(monitor.events().len(), 3);
        assert_eq!(storage.get_item("security_events").unwrap(), None);
    }

    #[test]
    fn test_ephemeral_never_writes() {
        let (monitor, storage) = monitor_with(MonitorConfig::ephemeral());
        monitor.log_event(
            SecurityEventType::Logout,
            EventSeverity::Low,
            "bye",
            Metadata::new(),
        );
        assert!(storage.is_empty());
    }

    #[test]
    fn test_clear_removes_storage() {
        let (monitor, storage) = monitor_with(MonitorConfig::default());
        monitor.log_event(
            SecurityEventType::Logout,
            EventSeverity::Low,
            "bye",
            Metadata::new(),
        );
        assert!(!storage.is_empty());

        monitor.clear();
        assert!(monitor.events().is_empty());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_periodic_checks_thresholds() {
        let config = MonitorConfig {
            hourly_event_threshold: 3,
            hourly_failed_login_threshold: 2,
            burst_threshold: usize::MAX,
            failed_login_threshold: usize::MAX,
            ..MonitorConfig::ephemeral()
        };
        let (monitor, _) = monitor_with(config);

        for i in 0..3 {
            monitor.log_event(
                SecurityEventType::LoginFailure,
                EventSeverity::Medium,
                "bad password",
                meta(&[("username", format!("student{i}").as_str())]),
            );
        }
        let raised = monitor.run_periodic_checks();
        let types: Vec<AlertType> = raised.iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::HighFailedLoginRate]);

        monitor.log_event(
            SecurityEventType::LoginSuccess,
            EventSeverity::Low,
            "ok",
            Metadata::new(),
        );
        let raised = monitor.run_periodic_checks();
        let types: Vec<AlertType> = raised.iter().map(|a| a.alert_type).collect();
        assert_eq!(
            types,
            vec![AlertType::HighEventVolume, AlertType::HighFailedLoginRate]
        );
    }

    #[test]
    fn test_alerts_capped() {
        let config = MonitorConfig {
            max_alerts: 3,
            ..MonitorConfig::ephemeral()
        };
        let (monitor, _) = monitor_with(config);
        for _ in 0..5 {
            monitor.record(
                SecurityEvent::new(SecurityEventType::LoginAttempt, EventSeverity::Low, "x")
                    .with_metadata(USER_AGENT_KEY, "wget/1.21"),
            );
        }
        assert_eq!(monitor.alerts().len(), 3);
    }

    #[test]
    fn test_start_monitoring_without_runtime() {
        let monitor = SecurityMonitor::in_memory();
        assert!(!monitor.start_monitoring());
        assert!(!monitor.is_monitoring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_runs_periodic_checks() {
        let config = MonitorConfig {
            hourly_event_threshold: 1,
            check_interval: Duration::from_secs(60),
            ..MonitorConfig::ephemeral()
        };
        let (monitor, _) = monitor_with(config);
        for _ in 0..2 {
            monitor.log_event(
                SecurityEventType::SessionCreated,
                EventSeverity::Low,
                "s",
                Metadata::new(),
            );
        }

        assert!(monitor.start_monitoring());
        assert!(!monitor.start_monitoring());
        assert!(monitor.is_monitoring());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(monitor.alerts().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(monitor.alerts().len(), 1);
        assert_eq!(monitor.alerts()[0].alert_type, AlertType::HighEventVolume);

        assert!(monitor.stop_monitoring());
        assert!(!monitor.is_monitoring());
        assert!(!monitor.stop_monitoring());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(monitor.alerts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_stops_task() {
        let config = MonitorConfig {
            check_interval: Duration::from_secs(10),
            ..MonitorConfig::ephemeral()
        };
        let monitor = SecurityMonitor::new(config, Arc::new(MemoryStorage::new()));
        assert!(monitor.start_monitoring());
        let weak = Arc::downgrade(&monitor.inner);

        drop(monitor);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(weak.upgrade().is_none());
    }
}
