//! Rule-based validation of a JSON view of the settings.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde_json::Value;

use super::{ConfigError, ConfigResult, ValidationErrors};

pub type ValidationFn = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Collects every violation instead of stopping at the first one.
#[derive(Default)]
pub struct ConfigValidator {
    required_keys: Vec<String>,
    range_rules: BTreeMap<String, RangeInclusive<u64>>,
    pattern_rules: BTreeMap<String, regex::Regex>,
    custom_rules: Vec<(String, ValidationFn)>,
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, key: impl Into<String>) -> Self {
        self.required_keys.push(key.into());
        self
    }

    pub fn expect_range(mut self, key: impl Into<String>, range: RangeInclusive<u64>) -> Self {
        self.range_rules.insert(key.into(), range);
        self
    }

    pub fn expect_pattern(mut self, key: impl Into<String>, pattern: &str) -> ConfigResult<Self> {
        let key = key.into();
        let regex = regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidValue {
            key: key.clone(),
            message: format!("Invalid regex pattern: {}", e),
        })?;
        self.pattern_rules.insert(key, regex);
        Ok(self)
    }

    pub fn custom<F>(mut self, key: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom_rules.push((key.into(), Box::new(validator)));
        self
    }

    pub fn validate(&self, config: &Value) -> ConfigResult<()> {
        let errors = self.collect_errors(config);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }

    pub fn collect_errors(&self, config: &Value) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let invalid = |key: &str, message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        for key in &self.required_keys {
            if get_nested(config, key).is_none_or(Value::is_null) {
                errors.push(ConfigError::NotFound { key: key.clone() });
            }
        }

        for (key, range) in &self.range_rules {
            if let Some(value) = get_nested(config, key) {
                match value.as_u64() {
                    Some(n) if range.contains(&n) => {}
                    Some(n) => errors.push(invalid(
                        key,
                        format!("value {} not in range {}..={}", n, range.start(), range.end()),
                    )),
                    None => errors.push(invalid(key, "expected an unsigned integer".into())),
                }
            }
        }

        for (key, pattern) in &self.pattern_rules {
            if let Some(s) = get_nested(config, key).and_then(Value::as_str)
                && !pattern.is_match(s)
            {
                errors.push(invalid(key, format!("'{}' does not match {}", s, pattern)));
            }
        }

        for (key, rule) in &self.custom_rules {
            if let Some(value) = get_nested(config, key)
                && let Err(message) = rule(value)
            {
                errors.push(invalid(key, message));
            }
        }

        errors
    }
}

fn get_nested<'a>(config: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.').try_fold(config, |current, part| current.get(part))
}
