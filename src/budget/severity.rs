use std::fmt;

use serde::{Deserialize, Serialize};

/// How close a caller is to exhausting their quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Nominal,
    Low,
    Critical,
}

impl Severity {
    /// Critical takes precedence over low, low over nominal.
    pub fn classify(remaining_tokens: u64, tokens_needed: u64) -> Self {
        if remaining_tokens == 0 {
            Self::Critical
        } else if remaining_tokens < tokens_needed.saturating_mul(2) {
            Self::Low
        } else {
            Self::Nominal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Low => "low",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a warning banner should show for a pending operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenWarning {
    pub severity: Severity,
    pub remaining_tokens: u64,
    pub tokens_needed: u64,
    pub blocked: bool,
}

impl TokenWarning {
    /// `None` when nothing should be shown: nominal severity with enough
    /// tokens for the operation.
    pub fn evaluate(remaining_tokens: u64, tokens_needed: u64) -> Option<Self> {
        let severity = Severity::classify(remaining_tokens, tokens_needed);
        let blocked = remaining_tokens < tokens_needed;
        if severity == Severity::Nominal && !blocked {
            return None;
        }
        Some(Self {
            severity,
            remaining_tokens,
            tokens_needed,
            blocked,
        })
    }

    pub fn message(&self) -> String {
        match (self.severity, self.blocked) {
            (_, true) => format!(
                "Insufficient tokens: {} needed, {} remaining",
                self.tokens_needed, self.remaining_tokens
            ),
            (Severity::Critical, false) => "Token quota exhausted".to_string(),
            _ => format!("Running low on tokens: {} remaining", self.remaining_tokens),
        }
    }
}
