//! Typed settings assembled from any [`ConfigProvider`].
//!
//! Recognised keys (all optional):
//!
//! | key | default |
//! |---|---|
//! | `api.base_url` | `http://localhost:8000` |
//! | `api.token` | none |
//! | `api.timeout_secs` | `30` |
//! | `monitor.max_events` | `1000` |
//! | `monitor.max_alerts` | `100` |
//! | `monitor.burst_threshold` | `5` |
//! | `monitor.burst_window_secs` | `60` |
//! | `monitor.failed_login_threshold` | `5` |
//! | `monitor.failed_login_window_secs` | `900` |
//! | `monitor.check_interval_secs` | `300` |
//! | `monitor.hourly_event_threshold` | `100` |
//! | `monitor.hourly_failed_login_threshold` | `10` |
//! | `monitor.hourly_suspicious_threshold` | `3` |
//! | `monitor.persist` | `true` |

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::validator::ConfigValidator;
use super::ConfigResult;
use crate::security::MonitorConfig;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "GRADEGATE_";

/// Connection settings for the grading backend.
#[derive(Clone, Debug)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub api: ApiSettings,
    pub monitor: MonitorConfig,
}

impl Settings {
    /// Read every known key from `provider`, filling defaults for absent
    /// ones, then validate the result.
    pub async fn load<P: ConfigProvider + ?Sized>(provider: &P) -> ConfigResult<Self> {
        let defaults = MonitorConfig::default();

        let api = ApiSettings {
            base_url: provider
                .get_raw("api.base_url")
                .await?
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            token: provider
                .get_raw("api.token")
                .await?
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            timeout: Duration::from_secs(
                provider
                    .get_or("api.timeout_secs", DEFAULT_TIMEOUT_SECS)
                    .await?,
            ),
        };

        let secs = |d: Duration| d.as_secs();
        let monitor = MonitorConfig {
            max_events: provider
                .get_or("monitor.max_events", defaults.max_events)
                .await?,
            max_alerts: provider
                .get_or("monitor.max_alerts", defaults.max_alerts)
                .await?,
            burst_threshold: provider
                .get_or("monitor.burst_threshold", defaults.burst_threshold)
                .await?,
            burst_window: Duration::from_secs(
                provider
                    .get_or("monitor.burst_window_secs", secs(defaults.burst_window))
                    .await?,
            ),
            failed_login_threshold: provider
                .get_or(
                    "monitor.failed_login_threshold",
                    defaults.failed_login_threshold,
                )
                .await?,
            failed_login_window: Duration::from_secs(
                provider
                    .get_or(
                        "monitor.failed_login_window_secs",
                        secs(defaults.failed_login_window),
                    )
                    .await?,
            ),
            check_interval: Duration::from_secs(
                provider
                    .get_or("monitor.check_interval_secs", secs(defaults.check_interval))
                    .await?,
            ),
            hourly_event_threshold: provider
                .get_or(
                    "monitor.hourly_event_threshold",
                    defaults.hourly_event_threshold,
                )
                .await?,
            hourly_failed_login_threshold: provider
                .get_or(
                    "monitor.hourly_failed_login_threshold",
                    defaults.hourly_failed_login_threshold,
                )
                .await?,
            hourly_suspicious_threshold: provider
                .get_or(
                    "monitor.hourly_suspicious_threshold",
                    defaults.hourly_suspicious_threshold,
                )
                .await?,
            persist: provider.get_or("monitor.persist", defaults.persist).await?,
            ..defaults
        };

        let settings = Self { api, monitor };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let positive = |v: &serde_json::Value| match v.as_u64() {
            Some(n) if n > 0 => Ok(()),
            _ => Err("must be greater than zero".to_string()),
        };

        let mut validator = ConfigValidator::new()
            .require("api.base_url")
            .expect_pattern("api.base_url", r"^https?://[^\s/]+")?;
        for key in [
            "api.timeout_secs",
            "monitor.max_events",
            "monitor.max_alerts",
            "monitor.burst_threshold",
            "monitor.burst_window_secs",
            "monitor.failed_login_threshold",
            "monitor.failed_login_window_secs",
            "monitor.check_interval_secs",
        ] {
            validator = validator.custom(key, positive);
        }

        validator.validate(&self.to_value())
    }

    fn to_value(&self) -> serde_json::Value {
        let m = &self.monitor;
        json!({
            "api": {
                "base_url": self.api.base_url,
                "timeout_secs": self.api.timeout.as_secs(),
            },
            "monitor": {
                "max_events": m.max_events,
                "max_alerts": m.max_alerts,
                "burst_threshold": m.burst_threshold,
                "burst_window_secs": m.burst_window.as_secs(),
                "failed_login_threshold": m.failed_login_threshold,
                "failed_login_window_secs": m.failed_login_window.as_secs(),
                "check_interval_secs": m.check_interval.as_secs(),
            }
        })
    }
}
