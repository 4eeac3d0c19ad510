use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub type Metadata = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    LoginAttempt,
    LoginSuccess,
    LoginFailure,
    Logout,
    TwoFactorSuccess,
    TwoFactorFailure,
    SessionCreated,
    SessionExpired,
    PasswordChange,
    PasswordResetRequest,
    PermissionDenied,
    RateLimitExceeded,
    InvalidToken,
    SuspiciousActivity,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginAttempt => "login_attempt",
            Self::LoginSuccess => "login_success",
            Self::LoginFailure => "login_failure",
            Self::Logout => "logout",
            Self::TwoFactorSuccess => "two_factor_success",
            Self::TwoFactorFailure => "two_factor_failure",
            Self::SessionCreated => "session_created",
            Self::SessionExpired => "session_expired",
            Self::PasswordChange => "password_change",
            Self::PasswordResetRequest => "password_reset_request",
            Self::PermissionDenied => "permission_denied",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidToken => "invalid_token",
            Self::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    pub details: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl SecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        severity: EventSeverity,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            severity,
            timestamp: Utc::now(),
            details: details.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BurstActivity,
    RepeatedLoginFailure,
    UnusualUserAgent,
    HighEventVolume,
    HighFailedLoginRate,
    HighSuspiciousActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityAlert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: EventSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged: bool,
    /// What the alert is about: an event type for bursts, a masked
    /// identity for login failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_events: Vec<Uuid>,
}

impl SecurityAlert {
    pub fn new(alert_type: AlertType, severity: EventSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_type,
            severity,
            message: message.into(),
            timestamp: Utc::now(),
            acknowledged: false,
            subject: None,
            related_events: Vec::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn related(mut self, events: impl IntoIterator<Item = Uuid>) -> Self {
        self.related_events.extend(events);
        self
    }
}

/// Aggregates over the retained window, computed by a full scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    pub total_events: usize,
    pub events_by_type: BTreeMap<SecurityEventType, usize>,
    pub events_by_severity: BTreeMap<EventSeverity, usize>,
    pub events_last_hour: usize,
    pub failed_logins: usize,
    pub failed_logins_last_hour: usize,
    pub suspicious_activities: usize,
    pub suspicious_last_hour: usize,
    pub total_alerts: usize,
    pub unacknowledged_alerts: usize,
}
