use async_trait::async_trait;
use serde_json::Value;

use super::UsageSnapshot;
use crate::Result;
use crate::client::ApiClient;

/// Where usage snapshots come from.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn fetch_usage(&self) -> Result<UsageSnapshot>;
}

/// Executes an AI operation on the backend.
#[async_trait]
pub trait OperationRunner: Send + Sync {
    async fn run_operation(&self, operation: &str, payload: &Value) -> Result<Value>;
}

#[async_trait]
impl UsageSource for ApiClient {
    async fn fetch_usage(&self) -> Result<UsageSnapshot> {
        ApiClient::fetch_usage(self).await
    }
}

#[async_trait]
impl OperationRunner for ApiClient {
    async fn run_operation(&self, operation: &str, payload: &Value) -> Result<Value> {
        ApiClient::run_operation(self, operation, payload).await
    }
}
