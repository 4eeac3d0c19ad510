use std::time::Duration;

pub const DEFAULT_EVENTS_KEY: &str = "security_events";
pub const DEFAULT_ALERTS_KEY: &str = "security_alerts";

#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    /// Retained events; the oldest are evicted first.
    pub max_events: usize,
    pub max_alerts: usize,
    pub burst_threshold: usize,
    pub burst_window: Duration,
    pub failed_login_threshold: usize,
    pub failed_login_window: Duration,
    pub check_interval: Duration,
    pub hourly_event_threshold: usize,
    pub hourly_failed_login_threshold: usize,
    pub hourly_suspicious_threshold: usize,
    pub persist: bool,
    pub events_key: String,
    pub alerts_key: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_events: 1000,
            max_alerts: 100,
            burst_threshold: 5,
            burst_window: Duration::from_secs(60),
            failed_login_threshold: 5,
            failed_login_window: Duration::from_secs(15 * 60),
            check_interval: Duration::from_secs(5 * 60),
            hourly_event_threshold: 100,
            hourly_failed_login_threshold: 10,
            hourly_suspicious_threshold: 3,
            persist: true,
            events_key: DEFAULT_EVENTS_KEY.to_string(),
            alerts_key: DEFAULT_ALERTS_KEY.to_string(),
        }
    }
}

impl MonitorConfig {
    /// In-memory only; nothing is read from or written to storage.
    pub fn ephemeral() -> Self {
        Self {
            persist: false,
            ..Default::default()
        }
    }
}
