//! Error types for research runs.

use crew::{ConfigError, CrewError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from configuring, running or saving a research report.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crew(#[from] CrewError),

    /// The crew finished but produced nothing to save
    #[error("The crew produced an empty report")]
    EmptyReport,

    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResearchError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ResearchError::Crew(e) if e.is_connectivity())
    }
}

/// Errors from a search provider.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Http(String),

    #[error("unexpected search response: {0}")]
    Parse(String),
}

impl SearchError {
    /// Whether the failure looks like a name resolution problem.
    pub fn is_dns(&self) -> bool {
        match self {
            SearchError::Http(message) => {
                let message = message.to_lowercase();
                message.contains("dns error") || message.contains("name or service not known")
            }
            SearchError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return SearchError::Parse(e.to_string());
        }
        // reqwest keeps the resolver failure in the source chain
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            source = inner.source();
        }
        SearchError::Http(message)
    }
}
