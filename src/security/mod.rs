//! Client-side security event log with derived alerts.
//!
//! [`SecurityMonitor`] keeps a capped, time-ordered window of events and
//! alerts, persists both to [`Storage`](crate::storage::Storage) after every
//! change, and raises alerts for bursts, repeated login failures,
//! non-browser user agents and slow-building hourly volumes.

mod config;
pub mod detect;
mod monitor;
mod types;

pub use config::MonitorConfig;
pub use detect::{is_unusual_user_agent, mask_identity};
pub use monitor::SecurityMonitor;
pub use types::{
    AlertType, EventSeverity, Metadata, SecurityAlert, SecurityEvent, SecurityEventType,
    SecurityMetrics,
};
