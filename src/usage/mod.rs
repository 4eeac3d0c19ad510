//! Usage snapshots and the token-limit service that gates AI operations.

mod service;
mod source;
mod types;

pub use service::{OperationOutcome, TokenLimitService, TokenLimitState};
pub use source::{OperationRunner, UsageSource};
pub use types::{UsageResponse, UsageSnapshot};
