//! Configuration provider trait and typed accessors.

use std::str::FromStr;

use serde::de::DeserializeOwned;

use super::{ConfigError, ConfigResult};

/// A source of string-valued configuration keyed by dotted paths
/// (`api.base_url`, `monitor.max_events`).
#[async_trait::async_trait]
pub trait ConfigProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>>;

    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()>;

    async fn delete(&self, key: &str) -> ConfigResult<bool>;

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>>;
}

/// Typed access layered over [`ConfigProvider::get_raw`].
pub trait ConfigProviderExt: ConfigProvider {
    /// Decode a JSON-encoded value.
    fn get_json<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        Self: Sync,
    {
        async move {
            let Some(raw) = self.get_raw(key).await? else {
                return Ok(None);
            };
            serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
    }

    /// Parse a plain value with [`FromStr`]. Environment variables hold
    /// bare strings (`30`, `true`, `https://...`), not JSON.
    fn get_parsed<T>(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = ConfigResult<Option<T>>> + Send
    where
        Self: Sync,
        T: FromStr + Send,
        T::Err: std::fmt::Display,
    {
        async move {
            let Some(raw) = self.get_raw(key).await? else {
                return Ok(None);
            };
            raw.trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        }
    }

    /// Like [`get_parsed`](Self::get_parsed), falling back to `default`
    /// when the key is absent.
    fn get_or<T>(
        &self,
        key: &str,
        default: T,
    ) -> impl std::future::Future<Output = ConfigResult<T>> + Send
    where
        Self: Sync,
        T: FromStr + Send,
        T::Err: std::fmt::Display,
    {
        async move { Ok(self.get_parsed(key).await?.unwrap_or(default)) }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}
