//! Pure detection rules over a window of events.

use std::collections::VecDeque;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use super::types::{AlertType, SecurityAlert, SecurityEvent, SecurityEventType};

/// Metadata keys that carry a user identity. Values are masked on record.
pub const IDENTITY_KEYS: [&str; 3] = ["email", "username", "identity"];
pub const USER_AGENT_KEY: &str = "user_agent";
pub const BURST_TYPE_KEY: &str = "burst_type";

static UNUSUAL_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(bot|crawler|spider|scraper|curl|wget|python|headless|phantom|selenium|postman)",
    )
    .expect("valid user agent regex")
});

/// `jane.doe@school.edu` becomes `ja***@school.edu`; identities without a
/// domain keep only their first two characters.
pub fn mask_identity(identity: &str) -> String {
    let identity = identity.trim();
    let (local, domain) = match identity.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (identity, None),
    };
    let prefix: String = local.chars().take(2).collect();
    match domain {
        Some(domain) => format!("{prefix}***@{}", domain.to_lowercase()),
        None => format!("{prefix}***"),
    }
}

/// The first non-browser marker found in `user_agent`, lowercased.
pub fn is_unusual_user_agent(user_agent: &str) -> Option<String> {
    UNUSUAL_AGENT
        .find(user_agent)
        .map(|m| m.as_str().to_ascii_lowercase())
}

pub fn identity_of(event: &SecurityEvent) -> Option<&str> {
    IDENTITY_KEYS.iter().find_map(|key| event.metadata_str(key))
}

/// Start of a trailing window ending at `now`.
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn within(event_time: DateTime<Utc>, start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    event_time >= start && event_time <= now
}

/// Events of `event_type` in the trailing window, if there are more than
/// `threshold` and no burst for that type was flagged inside the window.
pub fn detect_burst(
    events: &VecDeque<SecurityEvent>,
    event_type: SecurityEventType,
    now: DateTime<Utc>,
    window: Duration,
    threshold: usize,
) -> Option<Vec<&SecurityEvent>> {
    if event_type == SecurityEventType::SuspiciousActivity {
        return None;
    }
    let start = window_start(now, window);

    let already_flagged = events.iter().any(|e| {
        e.event_type == SecurityEventType::SuspiciousActivity
            && within(e.timestamp, start, now)
            && e.metadata_str(BURST_TYPE_KEY) == Some(event_type.as_str())
    });
    if already_flagged {
        return None;
    }

    let matching: Vec<&SecurityEvent> = events
        .iter()
        .filter(|e| e.event_type == event_type && within(e.timestamp, start, now))
        .collect();
    (matching.len() > threshold).then_some(matching)
}

/// Login failures for a masked identity in the trailing window, if they
/// exceed `threshold` and the identity has not been alerted on inside it.
pub fn detect_failed_logins<'a>(
    events: &'a VecDeque<SecurityEvent>,
    alerts: &VecDeque<SecurityAlert>,
    identity: &str,
    now: DateTime<Utc>,
    window: Duration,
    threshold: usize,
) -> Option<Vec<&'a SecurityEvent>> {
    let start = window_start(now, window);

    let already_alerted = alerts.iter().any(|a| {
        a.alert_type == AlertType::RepeatedLoginFailure
            && a.subject.as_deref() == Some(identity)
            && within(a.timestamp, start, now)
    });
    if already_alerted {
        return None;
    }

    let failures: Vec<&SecurityEvent> = events
        .iter()
        .filter(|e| {
            e.event_type == SecurityEventType::LoginFailure
                && within(e.timestamp, start, now)
                && identity_of(e) == Some(identity)
        })
        .collect();
    (failures.len() > threshold).then_some(failures)
}
