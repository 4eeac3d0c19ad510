//! Layered configuration for the gate and the security monitor.
//!
//! Providers are consulted in registration order; the first one holding a
//! key wins.
//!
//! ```rust,no_run
//! use gradegate::config::{ConfigBuilder, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ConfigBuilder::new()
//!     .env_with_prefix("GRADEGATE_")
//!     .file("gradegate.json")
//!     .build();
//! let settings = Settings::load(&provider).await?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod file;
pub mod memory;
pub mod provider;
pub mod settings;
pub mod validator;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};
pub use settings::{ApiSettings, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, ENV_PREFIX, Settings};
pub use validator::ConfigValidator;

use thiserror::Error;

/// Errors raised while reading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "Validation failed: {}", msgs.join("; "))
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Fluent assembly of a [`CompositeConfigProvider`].
#[derive(Default)]
pub struct ConfigBuilder {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variables under the default `GRADEGATE_` prefix.
    pub fn env(self) -> Self {
        self.env_with_prefix(ENV_PREFIX)
    }

    pub fn env_with_prefix(mut self, prefix: &str) -> Self {
        self.providers
            .push(Box::new(EnvConfigProvider::prefixed(prefix)));
        self
    }

    pub fn file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.providers.push(Box::new(FileConfigProvider::new(
            path.as_ref().to_path_buf(),
        )));
        self
    }

    pub fn memory(mut self, provider: MemoryConfigProvider) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        self.providers
            .into_iter()
            .fold(CompositeConfigProvider::new(), |composite, p| {
                composite.provider(p)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound {
            key: "api.base_url".to_string(),
        };
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn test_validation_errors_joined() {
        let err = ConfigError::ValidationErrors(ValidationErrors(vec![
            ConfigError::NotFound { key: "a".into() },
            ConfigError::NotFound { key: "b".into() },
        ]));
        assert_eq!(
            err.to_string(),
            "Validation failed: Key not found: a; Key not found: b"
        );
    }

    #[test]
    fn test_builder_order() {
        let composite = ConfigBuilder::new()
            .memory(MemoryConfigProvider::named("overrides"))
            .env()
            .build();
        assert_eq!(composite.provider_names(), vec!["overrides", "env"]);
    }
}
