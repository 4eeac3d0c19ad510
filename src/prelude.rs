//! Prelude module for convenient imports.
//!
//! ```rust
//! use gradegate::prelude::*;
//! ```

pub use crate::Error;
pub use crate::Result;

// Token budget
pub use crate::budget::{AiOperation, BudgetCheckResult, OperationCostTable, Severity, TokenWarning};
pub use crate::usage::{OperationOutcome, TokenLimitService, TokenLimitState, UsageSnapshot};

// Backend
pub use crate::client::ApiClient;

// Security
pub use crate::security::{
    EventSeverity, Metadata, MonitorConfig, SecurityAlert, SecurityEvent, SecurityEventType,
    SecurityMonitor,
};

// Storage
pub use crate::storage::{FileStorage, MemoryStorage, Storage, StorageExt};

// Configuration
pub use crate::config::{ConfigBuilder, ConfigProvider, ConfigProviderExt, Settings};

// Lists
pub use crate::view::{Keyed, ListAction, ListFilter, ListState};
