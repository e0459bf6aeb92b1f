//! Web research crew.
//!
//! Three agents run in sequence: a planner writes `SEARCH_QUERY_n` lines, a
//! researcher runs them through the [`WebSearch`] tool and summarizes the
//! findings, and a writer turns the summary into a markdown report.
//!
//! ```ignore
//! use research::{ResearchConfig, ResearchCrew, ResearchSettings, WebSearch, DuckDuckGo};
//! use std::sync::Arc;
//!
//! let settings = ResearchSettings::from_env()?;
//! let search = Arc::new(WebSearch::new(Arc::new(DuckDuckGo::new(settings.llm.timeout)?)));
//! let crew = ResearchCrew::new(ResearchConfig::new("Rust in embedded"), Arc::new(settings.llm.client()), search)
//!     .with_time_limit(settings.max_execution_time);
//! let outcome = crew.run(&Default::default()).await?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod search;

pub use config::{preset_topic, QualityMode, ResearchConfig, ResearchSettings, PRESETS};
pub use error::{ResearchError, SearchError};
pub use pipeline::{parse_search_queries, ResearchCrew, ResearchOutcome};
pub use report::save_report;
pub use search::{DuckDuckGo, SearchHistory, SearchHit, SearchProvider, WebSearch};
