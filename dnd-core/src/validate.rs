//! Player input sanitizing.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

pub const DEFAULT_MAX_INPUT_LENGTH: usize = 500;

/// Longest free-form action accepted, in whitespace-separated tokens.
pub const MAX_ACTION_WORDS: usize = 20;

pub const COMMANDS: &[&str] = &[
    "help",
    "quit",
    "save",
    "load",
    "status",
    "inventory",
    "investigate",
    "accept",
    "decline",
    "attack",
    "flee",
];

/// Removed from player input, in order.
const DANGEROUS_PATTERNS: &[&str] = &[
    r"(?is)<script.*?</script>",
    r"(?i)javascript:",
    r"(?i)eval\s*\(",
    r"<.*?>",
];

static DANGEROUS_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    DANGEROUS_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Cleans and checks raw player input.
#[derive(Debug, Clone, Copy)]
pub struct InputValidator {
    max_length: usize,
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INPUT_LENGTH)
    }
}

impl InputValidator {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Truncate to the maximum length, strip markup and script fragments,
    /// and trim. Blank input gives an empty string.
    pub fn sanitize(&self, input: &str) -> String {
        if input.trim().is_empty() {
            return String::new();
        }

        let mut text = if input.chars().count() > self.max_length {
            warn!(max_length = self.max_length, "input truncated");
            input.chars().take(self.max_length).collect()
        } else {
            input.to_string()
        };

        for pattern in DANGEROUS_REGEXES.iter() {
            text = pattern.replace_all(&text, "").into_owned();
        }

        text.trim().to_string()
    }

    /// Accept known commands and any action of at most twenty words.
    pub fn validate_command(&self, input: &str) -> bool {
        let lowered = input.trim().to_lowercase();
        COMMANDS.contains(&lowered.as_str()) || input.split_whitespace().count() <= MAX_ACTION_WORDS
    }
}
