//! Read-only configuration from environment variables.
//!
//! `api.base_url` under prefix `GRADEGATE_` reads `GRADEGATE_API_BASE_URL`.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        let name = key.to_uppercase().replace('.', "_");
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name,
        }
    }

    fn key_from_env(&self, env_name: &str) -> Option<String> {
        let stripped = match &self.prefix {
            Some(prefix) => env_name.strip_prefix(prefix.as_str())?,
            None => env_name,
        };
        Some(stripped.to_lowercase().replacen('_', ".", 1))
    }

    fn read_only() -> ConfigError {
        ConfigError::Provider {
            message: "Environment variables are read-only at runtime".into(),
        }
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    async fn set_raw(&self, _key: &str, _value: &str) -> ConfigResult<()> {
        Err(Self::read_only())
    }

    async fn delete(&self, _key: &str) -> ConfigResult<bool> {
        Err(Self::read_only())
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let env_prefix = self.env_key(prefix);
        Ok(std::env::vars()
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .filter_map(|(k, _)| self.key_from_env(&k))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_conversion() {
        let provider = EnvConfigProvider::new();
        assert_eq!(provider.env_key("api.base_url"), "API_BASE_URL");

        let provider = EnvConfigProvider::prefixed("GRADEGATE_");
        assert_eq!(
            provider.env_key("monitor.max_events"),
            "GRADEGATE_MONITOR_MAX_EVENTS"
        );
    }

    #[test]
    fn test_key_from_env_keeps_section() {
        let provider = EnvConfigProvider::prefixed("GRADEGATE_");
        assert_eq!(
            provider.key_from_env("GRADEGATE_MONITOR_MAX_EVENTS"),
            Some("monitor.max_events".to_string())
        );
        assert_eq!(provider.key_from_env("OTHER_VAR"), None);
    }

    #[tokio::test]
    async fn test_env_provider_get() {
        let provider = EnvConfigProvider::prefixed("GRADEGATE_TEST_ENV_");

        // SAFETY: Test-only environment setup with a unique prefix
        unsafe { std::env::set_var("GRADEGATE_TEST_ENV_API_TOKEN", "tok-123") };
        let value = provider.get_raw("api.token").await.unwrap();
        assert_eq!(value, Some("tok-123".to_string()));
        unsafe { std::env::remove_var("GRADEGATE_TEST_ENV_API_TOKEN") };
    }

    #[tokio::test]
    async fn test_env_provider_read_only() {
        let provider = EnvConfigProvider::new();
        assert!(provider.set_raw("key", "value").await.is_err());
        assert!(provider.delete("key").await.is_err());
    }

    #[tokio::test]
    async fn test_env_provider_not_found() {
        let provider = EnvConfigProvider::prefixed("GRADEGATE_NONEXISTENT_");
        assert_eq!(provider.get_raw("api.token").await.unwrap(), None);
    }
}
