//! Priority chain of configuration providers; earlier providers win.

use std::collections::BTreeSet;

use super::ConfigResult;
use super::provider::ConfigProvider;

/// Reads from each provider in turn and returns the first hit.
#[derive(Default)]
pub struct CompositeConfigProvider {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider; it ranks below everything already added.
    pub fn add_provider(&mut self, provider: Box<dyn ConfigProvider>) {
        self.providers.push(provider);
    }

    /// Builder form of [`add_provider`](Self::add_provider).
    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Number of providers in the chain.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Provider names in priority order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for CompositeConfigProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        for provider in &self.providers {
            if let Some(value) = provider.get_raw(key).await? {
                tracing::trace!(key, provider = provider.name(), "config key resolved");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Writes go to the first provider that accepts them; read-only
    /// providers such as the environment are skipped.
    async fn set_raw(&self, key: &str, value: &str) -> ConfigResult<()> {
        let mut last_err = None;
        for provider in &self.providers {
            match provider.set_raw(key, value).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn delete(&self, key: &str) -> ConfigResult<bool> {
        let mut deleted = false;
        for provider in &self.providers {
            if let Ok(true) = provider.delete(key).await {
                deleted = true;
            }
        }
        Ok(deleted)
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let mut all = BTreeSet::new();
        for provider in &self.providers {
            all.extend(provider.list_keys(prefix).await?);
        }
        Ok(all.into_iter().collect())
    }
}

impl std::fmt::Debug for CompositeConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeConfigProvider")
            .field("provider_names", &self.provider_names())
            .finish()
    }
}
