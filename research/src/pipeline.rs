//! The planner, researcher and writer crew.

use crate::config::ResearchConfig;
use crate::error::ResearchError;
use crate::prompts;
use crate::search::WebSearch;
use crew::{CancellationToken, ChatBackend, Crew, Process};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{info, warn};

static QUERY_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"SEARCH_QUERY_\d+\s*:\s*"([^"\n]+)""#).ok());

/// Pull the quoted queries out of `SEARCH_QUERY_n: "..."` lines, in order,
/// without duplicates.
pub fn parse_search_queries(plan: &str) -> Vec<String> {
    let Some(re) = QUERY_LINE.as_ref() else {
        return Vec::new();
    };
    let mut queries: Vec<String> = Vec::new();
    for captures in re.captures_iter(plan) {
        let query = captures[1].trim();
        if !query.is_empty() && !queries.iter().any(|q| q == query) {
            queries.push(query.to_string());
        }
    }
    queries
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchOutcome {
    pub report: String,
    pub planned_queries: Vec<String>,
    pub searches: usize,
}

/// One research run over a [`ResearchConfig`].
pub struct ResearchCrew {
    config: ResearchConfig,
    backend: Arc<dyn ChatBackend>,
    search: Arc<WebSearch>,
    time_limit: Duration,
}

impl ResearchCrew {
    pub fn new(
        config: ResearchConfig,
        backend: Arc<dyn ChatBackend>,
        search: Arc<WebSearch>,
    ) -> Self {
        Self {
            config,
            backend,
            search,
            time_limit: Duration::from_secs(crate::config::DEFAULT_MAX_EXECUTION_SECS),
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Assemble the three agents and their chained tasks.
    pub fn build(&self) -> Crew {
        let mut crew = Crew::new(self.backend.clone())
            .with_toolbox(self.search.clone())
            .with_process(Process::Sequential)
            .with_time_limit(self.time_limit);

        let planner = crew.add_agent(prompts::planner(&self.config));
        let researcher = crew.add_agent(prompts::researcher(&self.config));
        let writer = crew.add_agent(prompts::writer(&self.config));

        let plan = prompts::planning_task(&self.config, planner);
        let research = prompts::research_task(&self.config, researcher, 0);
        let write = prompts::writing_task(&self.config, writer, 1);
        crew.set_tasks(vec![plan, research, write]);
        crew
    }

    /// Run the crew from a clean search history.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<ResearchOutcome, ResearchError> {
        info!(
            topic = %self.config.topic,
            mode = %self.config.quality,
            "starting research"
        );
        self.search.history().clear();

        let output = self.build().kickoff(cancel).await?;

        let planned_queries = output
            .tasks_output
            .first()
            .map(|plan| parse_search_queries(&plan.raw))
            .unwrap_or_default();
        if planned_queries.len() < self.config.search_queries {
            warn!(
                planned = planned_queries.len(),
                wanted = self.config.search_queries,
                "planner returned fewer queries than requested"
            );
        }

        let report = output.raw().trim().to_string();
        if report.is_empty() {
            return Err(ResearchError::EmptyReport);
        }

        let searches = self.search.history().searches_performed();
        info!(searches, words = report.split_whitespace().count(), "research finished");
        Ok(ResearchOutcome {
            report,
            planned_queries,
            searches,
        })
    }
}
