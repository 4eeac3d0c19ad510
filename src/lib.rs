//! # gradegate
//!
//! Token budget gate and client-side security monitor for AI-assisted
//! grading.
//!
//! - [`TokenLimitService`] holds the caller's usage snapshot and decides
//!   whether an AI operation (analyze, grade, feedback, plagiarism) may run.
//! - [`SecurityMonitor`] keeps a bounded, persisted log of security events
//!   and raises alerts for bursts, repeated login failures and non-browser
//!   user agents.
//! - [`view`] is a pure reducer for filtered, sorted lists.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gradegate::{ApiClient, OperationOutcome, TokenLimitService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gradegate::Error> {
//!     let client = ApiClient::builder()
//!         .base_url("https://grading.example.edu")
//!         .token("session-token")
//!         .build()?;
//!     let tokens = TokenLimitService::connect(Arc::new(client)).await;
//!
//!     match tokens
//!         .run_operation("grade", &serde_json::json!({ "submissionId": 42 }))
//!         .await?
//!     {
//!         OperationOutcome::Completed(result) => println!("{result}"),
//!         OperationOutcome::Blocked(check) => {
//!             println!("need {} tokens, {} left", check.tokens_needed, check.remaining_tokens)
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Security Monitor
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gradegate::security::{EventSeverity, Metadata, MonitorConfig, SecurityEventType};
//! use gradegate::storage::FileStorage;
//! use gradegate::SecurityMonitor;
//!
//! # fn example() -> Result<(), gradegate::Error> {
//! let storage = Arc::new(FileStorage::default_location()?);
//! let monitor = SecurityMonitor::new(MonitorConfig::default(), storage);
//!
//! let mut metadata = Metadata::new();
//! metadata.insert("email".into(), "jane.doe@school.edu".into());
//! monitor.log_event(
//!     SecurityEventType::LoginFailure,
//!     EventSeverity::Medium,
//!     "Invalid password",
//!     metadata,
//! );
//! println!("{:?}", monitor.get_metrics());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod budget;
pub mod client;
pub mod config;
pub mod prelude;
pub mod security;
pub mod storage;
pub mod usage;
pub mod view;

pub use budget::{
    AiOperation, BudgetCheckResult, OperationCostTable, OperationCostTableBuilder, Severity,
    TokenWarning, check_token_limit, has_enough_tokens,
};
pub use client::{ApiClient, ApiClientBuilder};
pub use config::{ApiSettings, ConfigBuilder, ConfigError, Settings};
pub use security::{
    AlertType, EventSeverity, MonitorConfig, SecurityAlert, SecurityEvent, SecurityEventType,
    SecurityMetrics, SecurityMonitor,
};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError, StorageExt};
pub use usage::{
    OperationOutcome, OperationRunner, TokenLimitService, TokenLimitState, UsageSnapshot,
    UsageSource,
};
pub use view::{AssignmentFilter, AssignmentSummary, ListAction, ListState};

/// Error type for gradegate operations.
///
/// Budget shortfalls are not errors; they are reported through
/// [`BudgetCheckResult`] and [`OperationOutcome::Blocked`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Backend returned a non-2xx response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable missing or invalid.
    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    /// Request parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No token cost is known for this operation.
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authentication or authorization failures (401, 403)
    Authorization,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Network or server errors that may succeed on retry
    Transient,
    /// Internal errors (IO, JSON, storage)
    Internal,
    /// Quota or payment limits reported by the backend
    ResourceLimit,
}

impl Error {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            status,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api {
                status: 401 | 403, ..
            } => ErrorCategory::Authorization,

            Error::Config(_)
            | Error::Env(_)
            | Error::InvalidRequest(_)
            | Error::UnknownOperation(_) => ErrorCategory::Configuration,

            Error::Network(_) => ErrorCategory::Transient,
            Error::Api {
                status: 408 | 429 | 500..=599,
                ..
            } => ErrorCategory::Transient,

            Error::Api { status: 402, .. } => ErrorCategory::ResourceLimit,

            Error::Io(_) | Error::Json(_) | Error::Storage(_) | Error::Api { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_resource_limit(&self) -> bool {
        self.category() == ErrorCategory::ResourceLimit
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Api { status: 401, .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Env(e),
            config::ConfigError::Provider { message } => Error::Config(message),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

impl From<storage::StorageError> for Error {
    fn from(err: storage::StorageError) -> Self {
        match err {
            storage::StorageError::Io(e) => Error::Io(e),
            storage::StorageError::Serialization(e) => Error::Json(e),
            other => Error::Storage(other.to_string()),
        }
    }
}

/// Result type alias for gradegate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(Error::api(401, "expired").is_authorization_error());
        assert!(Error::api(401, "expired").is_unauthorized());
        assert!(Error::api(403, "forbidden").is_authorization_error());
        assert!(Error::api(503, "down").is_retryable());
        assert!(Error::api(429, "slow down").is_retryable());
        assert!(Error::api(402, "quota").is_resource_limit());
        assert_eq!(Error::api(404, "missing").category(), ErrorCategory::Internal);
        assert!(Error::UnknownOperation("x".into()).is_configuration_error());
        assert!(Error::Config("bad".into()).is_configuration_error());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(Error::api(500, "boom").status_code(), Some(500));
        assert_eq!(Error::Config("x".into()).status_code(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::api(402, "Subscription required").to_string(),
            "API error (HTTP 402): Subscription required"
        );
        assert_eq!(
            Error::UnknownOperation("translate".into()).to_string(),
            "Unknown operation: translate"
        );
    }

    #[test]
    fn test_from_config_error() {
        let err: Error = config::ConfigError::InvalidValue {
            key: "api.timeout_secs".into(),
            message: "must be greater than zero".into(),
        }
        .into();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("api.timeout_secs"));
    }

    #[test]
    fn test_from_storage_error() {
        let err: Error = storage::StorageError::QuotaExceeded {
            used: 10,
            limit: 5,
        }
        .into();
        assert!(matches!(err, Error::Storage(_)));

        let err: Error = storage::StorageError::Io(std::io::Error::other("disk")).into();
        assert!(matches!(err, Error::Io(_)));
    }
}
