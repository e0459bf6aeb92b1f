//! Shared LLM settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "mistralai/Mistral-Small-3.2-24B-Instruct-2506";
pub const DEFAULT_URL: &str = "http://localhost:54321";
pub const DEFAULT_API_KEY: &str = "EMPTY";
pub const DEFAULT_MAX_TOKENS: usize = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Invalid or missing configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {name}={value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection and sampling settings for the completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: normalize_base_url(DEFAULT_URL),
            api_key: DEFAULT_API_KEY.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LlmSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset
    /// variables and failing on values that do not parse or are out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model = lookup("DEFAULT_LLM").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let url = lookup("DEFAULT_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        let api_key = lookup("DEFAULT_API_KEY").unwrap_or_else(|| DEFAULT_API_KEY.to_string());

        let max_tokens: usize = parse_var(&lookup, "MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let temperature: f32 = parse_var(&lookup, "TEMPERATURE", DEFAULT_TEMPERATURE)?;
        let timeout_secs: u64 = parse_var(&lookup, "TIMEOUT", DEFAULT_TIMEOUT_SECS)?;

        if url.trim().is_empty() {
            return Err(ConfigError::Missing("DEFAULT_URL"));
        }
        if api_key.trim().is_empty() {
            return Err(ConfigError::Missing("DEFAULT_API_KEY"));
        }

        let settings = Self {
            model,
            base_url: normalize_base_url(&url),
            api_key,
            max_tokens,
            temperature,
            timeout: Duration::from_secs(timeout_secs),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_TOKENS",
                value: self.max_tokens.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid {
                name: "TEMPERATURE",
                value: self.temperature.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: "TIMEOUT",
                value: "0".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Build a client for these settings.
    pub fn client(&self) -> llm::Client {
        llm::Client::new(self.base_url.clone(), self.api_key.clone())
            .with_model(self.model.clone())
            .with_timeout(self.timeout)
    }
}

/// Trim trailing slashes and make sure the URL ends in `/v1`.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

/// Parse an optional variable, using `default` when it is unset or blank.
pub fn parse_var<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    value: value.clone(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = LlmSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, LlmSettings::default());
        assert_eq!(settings.base_url, "http://localhost:54321/v1");
        assert_eq!(settings.api_key, "EMPTY");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let settings = LlmSettings::from_lookup(lookup(&[
            ("DEFAULT_LLM", "llama3"),
            ("DEFAULT_URL", "http://gpu:8000/v1"),
            ("MAX_TOKENS", "256"),
            ("TEMPERATURE", "1.5"),
            ("TIMEOUT", "5"),
        ]))
        .unwrap();
        assert_eq!(settings.model, "llama3");
        assert_eq!(settings.base_url, "http://gpu:8000/v1");
        assert_eq!(settings.max_tokens, 256);
        assert_eq!(settings.temperature, 1.5);
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://host:1"), "http://host:1/v1");
        assert_eq!(normalize_base_url("http://host:1/"), "http://host:1/v1");
        assert_eq!(normalize_base_url("http://host:1/v1"), "http://host:1/v1");
        assert_eq!(normalize_base_url("http://host:1/v1/"), "http://host:1/v1");
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = LlmSettings::from_lookup(lookup(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_TOKENS", .. }));

        let err = LlmSettings::from_lookup(lookup(&[("MAX_TOKENS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_TOKENS", .. }));

        let err = LlmSettings::from_lookup(lookup(&[("TEMPERATURE", "2.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TEMPERATURE", .. }));

        let err = LlmSettings::from_lookup(lookup(&[("TIMEOUT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TIMEOUT", .. }));

        let err = LlmSettings::from_lookup(lookup(&[("DEFAULT_API_KEY", " ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DEFAULT_API_KEY"));
    }

    #[test]
    fn test_blank_value_uses_default() {
        let settings = LlmSettings::from_lookup(lookup(&[("MAX_TOKENS", "")])).unwrap();
        assert_eq!(settings.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
