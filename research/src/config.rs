//! Research run configuration.

use crew::settings::parse_var;
use crew::{ConfigError, LlmSettings};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "Latest AI trends in 2025";
pub const DEFAULT_QUERIES: usize = 5;
pub const DEFAULT_WORD_RANGE: (u32, u32) = (700, 900);
pub const DEFAULT_LANGUAGE: &str = "English";
pub const DEFAULT_REPORT_TYPE: &str = "blog";
pub const DEFAULT_MAX_EXECUTION_SECS: u64 = 600;

/// Preset keys and the topics they expand to.
pub const PRESETS: &[(&str, &str)] = &[
    ("ai", "Latest AI trends in 2025"),
    ("blockchain", "Blockchain technology advances in 2025"),
    ("climate", "Sustainable climate technology innovation"),
    ("health", "Digital healthcare technology trends"),
    ("fintech", "Latest developments in the fintech industry"),
    ("architecture", "Modern architecture technology innovation"),
    ("education", "Digital transformation of education technology"),
    ("energy", "Renewable energy technology advances"),
    ("space", "Space technology and exploration trends"),
    ("food", "Food tech industry innovation"),
];

/// Expand a preset key (any case); anything else is returned as given.
pub fn preset_topic(name: &str) -> String {
    let key = name.to_lowercase();
    PRESETS
        .iter()
        .find(|(preset, _)| *preset == key)
        .map(|(_, topic)| topic.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Parse `"min,max"`. Returns `None` unless there are exactly two positive
/// integers with `min <= max`.
pub fn parse_word_range(value: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let [min, max] = parts.as_slice() else {
        return None;
    };
    let min: u32 = min.parse().ok()?;
    let max: u32 = max.parse().ok()?;
    (min > 0 && min <= max).then_some((min, max))
}

/// How the writer agent is briefed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum QualityMode {
    #[default]
    #[value(name = "standard")]
    Standard,
    /// Stricter, language-native writing with a fixed section layout
    #[value(name = "language_optimized", alias = "korean_optimized")]
    LanguageOptimized,
}

impl QualityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMode::Standard => "standard",
            QualityMode::LanguageOptimized => "language_optimized",
        }
    }
}

impl fmt::Display for QualityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to research and how the report should look.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub topic: String,
    pub search_queries: usize,
    pub word_range: (u32, u32),
    pub language: String,
    pub report_type: String,
    pub quality: QualityMode,
}

impl ResearchConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            search_queries: DEFAULT_QUERIES,
            word_range: DEFAULT_WORD_RANGE,
            language: DEFAULT_LANGUAGE.to_string(),
            report_type: DEFAULT_REPORT_TYPE.to_string(),
            quality: QualityMode::default(),
        }
    }

    pub fn with_search_queries(mut self, count: usize) -> Self {
        self.search_queries = count.max(1);
        self
    }

    pub fn with_word_range(mut self, range: (u32, u32)) -> Self {
        self.word_range = range;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_report_type(mut self, report_type: impl Into<String>) -> Self {
        self.report_type = report_type.into();
        self
    }

    pub fn with_quality(mut self, quality: QualityMode) -> Self {
        self.quality = quality;
        self
    }

    /// The topic reduced to something usable in a file name: spaces become
    /// underscores, other non-word characters are dropped, at most 50 chars.
    pub fn safe_topic(&self) -> String {
        self.topic
            .replace(' ', "_")
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_' || *c == '-')
            .take(50)
            .collect()
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC)
    }
}

/// Model settings plus the wall-clock limit for one research run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchSettings {
    pub llm: LlmSettings,
    pub max_execution_time: Duration,
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            llm: LlmSettings::default(),
            max_execution_time: Duration::from_secs(DEFAULT_MAX_EXECUTION_SECS),
        }
    }
}

impl ResearchSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let llm = LlmSettings::from_lookup(&lookup)?;
        let secs: u64 = parse_var(&lookup, "MAX_EXECUTION_TIME", DEFAULT_MAX_EXECUTION_SECS)?;
        if secs == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_EXECUTION_TIME",
                value: secs.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            llm,
            max_execution_time: Duration::from_secs(secs),
        })
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
    fn test_presets() {
        assert_eq!(preset_topic("ai"), "Latest AI trends in 2025");
        assert_eq!(preset_topic("SPACE"), "Space technology and exploration trends");
        assert_eq!(preset_topic("Rust compilers"), "Rust compilers");
        assert_eq!(PRESETS.len(), 10);
    }

    #[test]
    fn test_safe_topic() {
        let config = ResearchConfig::new("AI: trends & risks (2025)!");
        assert_eq!(config.safe_topic(), "AI_trends__risks_2025");

        let long = ResearchConfig::new("x".repeat(80));
        assert_eq!(long.safe_topic().chars().count(), 50);

        let hangul = ResearchConfig::new("최신 AI 트렌드");
        assert_eq!(hangul.safe_topic(), "최신_AI_트렌드");
    }

    #[test]
    fn test_word_range() {
        assert_eq!(parse_word_range("700,900"), Some((700, 900)));
        assert_eq!(parse_word_range(" 500 , 600 "), Some((500, 600)));
        assert_eq!(parse_word_range("900"), None);
        assert_eq!(parse_word_range("1,2,3"), None);
        assert_eq!(parse_word_range("a,b"), None);
        assert_eq!(parse_word_range("900,700"), None);
        assert_eq!(parse_word_range("0,10"), None);
    }

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::default();
        assert_eq!(config.search_queries, 5);
        assert_eq!(config.word_range, (700, 900));
        assert_eq!(config.quality, QualityMode::Standard);
        assert_eq!(ResearchConfig::new("t").with_search_queries(0).search_queries, 1);
    }

    #[test]
    fn test_quality_mode_values() {
        use clap::ValueEnum;
        assert_eq!(
            QualityMode::from_str("language_optimized", false),
            Ok(QualityMode::LanguageOptimized)
        );
        assert_eq!(
            QualityMode::from_str("korean_optimized", false),
            Ok(QualityMode::LanguageOptimized)
        );
        assert_eq!(QualityMode::Standard.to_string(), "standard");
    }

    #[test]
    fn test_settings_from_lookup() {
        let settings = ResearchSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.max_execution_time, Duration::from_secs(600));

        let settings =
            ResearchSettings::from_lookup(lookup(&[("MAX_EXECUTION_TIME", "120")])).unwrap();
        assert_eq!(settings.max_execution_time, Duration::from_secs(120));

        let err = ResearchSettings::from_lookup(lookup(&[("MAX_EXECUTION_TIME", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_EXECUTION_TIME", .. }));

        let err = ResearchSettings::from_lookup(lookup(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_TOKENS", .. }));
    }
}
