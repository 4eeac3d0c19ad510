use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time read of the caller's quota. Not kept in sync with the
/// server; only a refresh replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    pub total_tokens: u64,
    pub used_tokens: u64,
    pub remaining_tokens: u64,
    pub percent_used: f64,
    pub fetched_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn new(total_tokens: u64, used_tokens: u64) -> Self {
        Self::at(total_tokens, used_tokens, Utc::now())
    }

    pub fn at(total_tokens: u64, used_tokens: u64, fetched_at: DateTime<Utc>) -> Self {
        Self {
            total_tokens,
            used_tokens,
            remaining_tokens: total_tokens.saturating_sub(used_tokens),
            percent_used: percent_used(total_tokens, used_tokens),
            fetched_at,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_tokens == 0
    }
}

/// Whole-percent usage in `[0, 100]`. A zero allotment counts as fully used.
fn percent_used(total: u64, used: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((used as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0)
}

/// Body of the subscription usage endpoint.
///
/// `remaining` and `percentUsed` are accepted but recomputed from `total`
/// and `used`, so a stale or inconsistent server value never leaks through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    #[serde(alias = "totalTokens")]
    pub total: u64,
    #[serde(alias = "usedTokens")]
    pub used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
}

impl UsageResponse {
    pub fn into_snapshot(self) -> UsageSnapshot {
        if let Some(remaining) = self.remaining {
            let derived = self.total.saturating_sub(self.used);
            if u64::try_from(remaining).ok() != Some(derived) {
                tracing::debug!(
                    reported = remaining,
                    derived,
                    "Server remaining tokens disagree with total minus used"
                );
            }
        }
        UsageSnapshot::new(self.total, self.used)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_derivation() {
        let snapshot = UsageSnapshot::new(30_000, 25_000);
        assert_eq!(snapshot.remaining_tokens, 5000);
        assert_eq!(snapshot.percent_used, 83.0);
        assert!(!snapshot.is_exhausted());
    }

    #[test]
    fn test_overused_clamps() {
        let snapshot = UsageSnapshot::new(1000, 1500);
        assert_eq!(snapshot.remaining_tokens, 0);
        assert_eq!(snapshot.percent_used, 100.0);
        assert!(snapshot.is_exhausted());
    }

    #[test]
    fn test_zero_total() {
        let snapshot = UsageSnapshot::new(0, 0);
        assert_eq!(snapshot.remaining_tokens, 0);
        assert_eq!(snapshot.percent_used, 100.0);
    }

    #[test]
    fn test_unused() {
        let snapshot = UsageSnapshot::new(50_000, 0);
        assert_eq!(snapshot.remaining_tokens, 50_000);
        assert_eq!(snapshot.percent_used, 0.0);
    }

    #[test]
    fn test_response_recomputes_derived_fields() {
        let response: UsageResponse = serde_json::from_str(
            r#"{"total": 30000, "used": 25000, "remaining": 9999, "percentUsed": 12.5}"#,
        )
        .unwrap();
        let snapshot = response.into_snapshot();
        assert_eq!(snapshot.remaining_tokens, 5000);
        assert_eq!(snapshot.percent_used, 83.0);
    }

    #[test]
    fn test_response_minimal_and_aliases() {
        let response: UsageResponse =
            serde_json::from_str(r#"{"totalTokens": 100, "usedTokens": 40}"#).unwrap();
        assert_eq!(response.remaining, None);
        assert_eq!(response.into_snapshot().remaining_tokens, 60);
    }

    #[test]
    fn test_response_negative_remaining_accepted() {
        let response: UsageResponse =
            serde_json::from_str(r#"{"total": 100, "used": 140, "remaining": -40}"#).unwrap();
        assert_eq!(response.into_snapshot().remaining_tokens, 0);
    }
}
