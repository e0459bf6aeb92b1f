//! Error types for crew execution.

use std::time::Duration;

/// Errors from running agents and crews.
#[derive(Debug, thiserror::Error)]
pub enum CrewError {
    /// The completion endpoint failed
    #[error("LLM error: {0}")]
    Llm(#[from] llm::Error),

    /// The agent kept calling tools without producing an answer
    #[error("Agent '{agent}' exceeded {max} tool iterations")]
    MaxIterations { agent: String, max: usize },

    /// The crew definition is inconsistent
    #[error("Invalid crew: {0}")]
    Invalid(String),

    /// The whole kickoff ran past its time limit
    #[error("Crew execution exceeded {0:?}")]
    TimeLimit(Duration),
}

impl CrewError {
    /// Whether the underlying failure is a connectivity problem.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, CrewError::Llm(e) if e.is_connectivity())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CrewError::Llm(llm::Error::Cancelled))
    }
}
