//! Token budget evaluation for AI operations.
//!
//! Everything here is pure: a check compares a remaining-token figure with
//! an operation's estimated cost and never touches the snapshot it came from.

mod check;
pub mod costs;
mod severity;

pub use check::{BudgetCheckResult, INSUFFICIENT_TOKENS, check_token_limit, has_enough_tokens};
pub use costs::{AiOperation, OperationCostTable, OperationCostTableBuilder, default_cost_table};
pub use severity::{Severity, TokenWarning};
