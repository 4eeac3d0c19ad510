use serde::{Deserialize, Serialize};

use super::severity::Severity;

/// Message carried by every failed check. Richer wording belongs to the UI.
pub const INSUFFICIENT_TOKENS: &str = "Insufficient tokens";

/// Outcome of comparing a remaining-token figure with an operation's cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCheckResult {
    pub has_enough_tokens: bool,
    pub remaining_tokens: u64,
    pub tokens_needed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BudgetCheckResult {
    pub fn severity(&self) -> Severity {
        Severity::classify(self.remaining_tokens, self.tokens_needed)
    }

    /// Tokens missing for the operation to run; zero when affordable.
    pub fn shortfall(&self) -> u64 {
        self.tokens_needed.saturating_sub(self.remaining_tokens)
    }
}

pub fn check_token_limit(remaining_tokens: u64, tokens_needed: u64) -> BudgetCheckResult {
    let has_enough_tokens = remaining_tokens >= tokens_needed;
    BudgetCheckResult {
        has_enough_tokens,
        remaining_tokens,
        tokens_needed,
        error: (!has_enough_tokens).then(|| INSUFFICIENT_TOKENS.to_string()),
    }
}

#[inline]
pub fn has_enough_tokens(remaining_tokens: u64, tokens_needed: u64) -> bool {
    check_token_limit(remaining_tokens, tokens_needed).has_enough_tokens
}
