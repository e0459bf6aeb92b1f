//! Game configuration.

use crate::validate::DEFAULT_MAX_INPUT_LENGTH;
use crew::settings::{parse_var, ConfigError, LlmSettings};
use std::env;

/// Settings for one game session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub llm: LlmSettings,
    /// Longest player input kept after sanitizing, in characters.
    pub max_input_length: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = LlmSettings::from_lookup(&lookup)?;
        let max_input_length = parse_var(&lookup, "MAX_INPUT_LENGTH", DEFAULT_MAX_INPUT_LENGTH)?;
        if max_input_length == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_INPUT_LENGTH",
                value: "0".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            llm,
            max_input_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GameConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.max_input_length, 500);
    }

    #[test]
    fn test_max_input_length() {
        let config = GameConfig::from_lookup(|name| {
            (name == "MAX_INPUT_LENGTH").then(|| "120".to_string())
        })
        .unwrap();
        assert_eq!(config.max_input_length, 120);

        let err = GameConfig::from_lookup(|name| {
            (name == "MAX_INPUT_LENGTH").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_INPUT_LENGTH", .. }));
    }

    #[test]
    fn test_llm_errors_propagate() {
        let err = GameConfig::from_lookup(|name| {
            (name == "TEMPERATURE").then(|| "hot".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TEMPERATURE", .. }));
    }
}
