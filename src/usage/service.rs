//! Token-limit state shared by everything that triggers AI operations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{OperationRunner, UsageSnapshot, UsageSource};
use crate::Result;
use crate::budget::{self, BudgetCheckResult, OperationCostTable, TokenWarning};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenLimitState {
    pub snapshot: Option<UsageSnapshot>,
    pub loading: bool,
    pub error: Option<String>,
}

impl TokenLimitState {
    /// Remaining tokens, or zero while no snapshot has been loaded.
    pub fn remaining_tokens(&self) -> u64 {
        self.snapshot.as_ref().map_or(0, |s| s.remaining_tokens)
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Not enough tokens; the backend was not called.
    Blocked(BudgetCheckResult),
    Completed(Value),
}

impl OperationOutcome {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Blocked(_) => None,
        }
    }
}

/// Bookkeeping for overlapping refreshes.
#[derive(Debug, Default)]
struct RefreshGate {
    in_flight: usize,
    issued: u64,
    applied: u64,
}

/// Holds the current usage snapshot and decides whether operations may run.
///
/// Clones share state. Fetch failures never surface as `Err`; they land in
/// [`TokenLimitState::error`] and the previous snapshot stays in place.
#[derive(Clone)]
pub struct TokenLimitService {
    source: Arc<dyn UsageSource>,
    runner: Arc<dyn OperationRunner>,
    costs: Arc<OperationCostTable>,
    state: Arc<watch::Sender<TokenLimitState>>,
    gate: Arc<Mutex<RefreshGate>>,
}

impl TokenLimitService {
    pub fn new<B>(backend: Arc<B>) -> Self
    where
        B: UsageSource + OperationRunner + 'static,
    {
        Self::from_parts(backend.clone(), backend)
    }

    pub fn from_parts(source: Arc<dyn UsageSource>, runner: Arc<dyn OperationRunner>) -> Self {
        Self {
            source,
            runner,
            costs: Arc::new(OperationCostTable::default()),
            state: Arc::new(watch::Sender::new(TokenLimitState::default())),
            gate: Arc::new(Mutex::new(RefreshGate::default())),
        }
    }

    /// Construct and load the first snapshot.
    pub async fn connect<B>(backend: Arc<B>) -> Self
    where
        B: UsageSource + OperationRunner + 'static,
    {
        let service = Self::new(backend);
        service.refresh_token_data().await;
        service
    }

    pub fn with_costs(mut self, costs: OperationCostTable) -> Self {
        self.costs = Arc::new(costs);
        self
    }

    pub fn costs(&self) -> &OperationCostTable {
        &self.costs
    }

    pub fn state(&self) -> TokenLimitState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<UsageSnapshot> {
        self.state.borrow().snapshot.clone()
    }

    pub fn remaining_tokens(&self) -> u64 {
        self.state.borrow().remaining_tokens()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn subscribe(&self) -> watch::Receiver<TokenLimitState> {
        self.state.subscribe()
    }

    /// Fetch a fresh snapshot.
    ///
    /// Refreshes may overlap. `loading` stays set until the last one
    /// settles, and a result never replaces one from a later-started
    /// refresh.
    pub async fn refresh_token_data(&self) -> TokenLimitState {
        let generation = {
            let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
            gate.in_flight += 1;
            gate.issued += 1;
            self.state.send_modify(|state| state.loading = true);
            gate.issued
        };

        let result = self.source.fetch_usage().await;

        let mut gate = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        gate.in_flight = gate.in_flight.saturating_sub(1);
        let current = generation >= gate.applied;
        if current {
            gate.applied = generation;
        }
        let loading = gate.in_flight > 0;

        match result {
            Ok(snapshot) if current => {
                tracing::debug!(
                    total = snapshot.total_tokens,
                    used = snapshot.used_tokens,
                    remaining = snapshot.remaining_tokens,
                    "Token usage refreshed"
                );
                self.state.send_modify(|state| {
                    state.snapshot = Some(snapshot);
                    state.error = None;
                    state.loading = loading;
                });
            }
            Err(e) if current => {
                tracing::warn!(error = %e, "Failed to fetch token usage");
                self.state.send_modify(|state| {
                    state.error = Some(format!("Failed to fetch token usage: {e}"));
                    state.loading = loading;
                });
            }
            _ => {
                tracing::debug!(generation, "Discarding superseded token usage result");
                self.state.send_modify(|state| state.loading = loading);
            }
        }
        drop(gate);

        self.state()
    }

    pub fn check_token_limit(&self, tokens_needed: u64) -> BudgetCheckResult {
        budget::check_token_limit(self.remaining_tokens(), tokens_needed)
    }

    pub fn has_enough_tokens(&self, tokens_needed: u64) -> bool {
        budget::has_enough_tokens(self.remaining_tokens(), tokens_needed)
    }

    /// Whether an action costing `tokens_needed` should be enabled.
    /// Always false while a refresh is in flight.
    pub fn can_run(&self, tokens_needed: u64) -> bool {
        let state = self.state.borrow();
        !state.loading && budget::has_enough_tokens(state.remaining_tokens(), tokens_needed)
    }

    pub fn check_operation(&self, operation: &str) -> Result<BudgetCheckResult> {
        let cost = self.costs.require(operation)?;
        Ok(self.check_token_limit(cost))
    }

    pub fn warning(&self, tokens_needed: u64) -> Option<TokenWarning> {
        TokenWarning::evaluate(self.remaining_tokens(), tokens_needed)
    }

    /// Run `operation` if the budget allows it, then refresh the snapshot.
    pub async fn run_operation(&self, operation: &str, payload: &Value) -> Result<OperationOutcome> {
        let check = self.check_operation(operation)?;
        if !check.has_enough_tokens {
            tracing::info!(
                operation,
                remaining = check.remaining_tokens,
                needed = check.tokens_needed,
                "Operation blocked by token budget"
            );
            return Ok(OperationOutcome::Blocked(check));
        }

        let response = self.runner.run_operation(operation, payload).await?;
        self.refresh_token_data().await;
        Ok(OperationOutcome::Completed(response))
    }

    /// Refresh on a fixed interval until `cancel` fires. The first refresh
    /// happens immediately.
    ///
    /// Returns `None` for a zero interval or outside a tokio runtime.
    pub fn spawn_poller(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if interval.is_zero() {
            tracing::warn!("Token usage poller needs a non-zero interval");
            return None;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime; token usage poller not started");
            return None;
        };

        let service = self.clone();
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Token usage poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        service.refresh_token_data().await;
                    }
                }
            }
        }))
    }
}

impl std::fmt::Debug for TokenLimitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenLimitService")
            .field("state", &*self.state.borrow())
            .field("operations", &self.costs.len())
            .finish()
    }
}
