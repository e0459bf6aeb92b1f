//! The `web_search` tool.
//!
//! Queries go through a [`SearchProvider`]. Each run keeps a
//! [`SearchHistory`] keyed by the SHA-256 of the normalized query, so an
//! agent that repeats itself gets the cached text back instead of a second
//! request.

use crate::error::SearchError;
use async_trait::async_trait;
use crew::Toolbox;
use dnd_macros::Tool;
use llm::ToolResult;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

pub const MIN_QUERY_CHARS: usize = 3;
pub const MAX_RESULTS: usize = 5;
pub const MAX_BODY_CHARS: usize = 150;

const DUCKDUCKGO_URL: &str = "https://api.duckduckgo.com/";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub href: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            href: href.into(),
        }
    }
}

/// A web search backend.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// DuckDuckGo's Instant Answer API.
pub struct DuckDuckGo {
    client: reqwest::Client,
    endpoint: String,
}

impl DuckDuckGo {
    pub fn new(timeout: Duration) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("research/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: DUCKDUCKGO_URL.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    results: Vec<Topic>,
    #[serde(default)]
    related_topics: Vec<Topic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Topic {
    Entry {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<Topic>,
    },
}

impl Topic {
    fn collect_into(self, hits: &mut Vec<SearchHit>) {
        match self {
            Topic::Entry { text, first_url } => {
                let title = match text.split_once(" - ") {
                    Some((title, _)) => title.to_string(),
                    None => text.clone(),
                };
                hits.push(SearchHit::new(title, text, first_url));
            }
            Topic::Group { topics } => {
                for topic in topics {
                    topic.collect_into(hits);
                }
            }
        }
    }
}

impl InstantAnswer {
    fn into_hits(self) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !self.abstract_url.is_empty() && !self.abstract_text.is_empty() {
            hits.push(SearchHit::new(self.heading, self.abstract_text, self.abstract_url));
        }
        for topic in self.results.into_iter().chain(self.related_topics) {
            topic.collect_into(&mut hits);
        }
        hits
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGo {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let answer: InstantAnswer = self
            .client
            .get(self.endpoint.as_str())
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut hits = answer.into_hits();
        hits.truncate(max_results);
        Ok(hits)
    }
}

/// Hash of the trimmed, lowercased query.
pub fn query_hash(query: &str) -> String {
    let normalized = query.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// What the history knows about a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    New,
    Cached(String),
    /// Searched before, but the search produced nothing worth caching
    Searched,
}

#[derive(Debug, Default)]
struct HistoryInner {
    searched: HashSet<String>,
    cache: HashMap<String, String>,
}

/// Queries already issued during a run, with their formatted results.
#[derive(Debug, Default)]
pub struct SearchHistory {
    inner: Mutex<HistoryInner>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look the hash up and mark it as searched.
    pub fn check(&self, hash: &str) -> Seen {
        let mut inner = self.lock();
        if !inner.searched.insert(hash.to_string()) {
            return match inner.cache.get(hash) {
                Some(text) => Seen::Cached(text.clone()),
                None => Seen::Searched,
            };
        }
        Seen::New
    }

    pub fn store(&self, hash: &str, text: &str) {
        self.lock().cache.insert(hash.to_string(), text.to_string());
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.searched.clear();
        inner.cache.clear();
    }

    pub fn searches_performed(&self) -> usize {
        self.lock().searched.len()
    }

    pub fn cached_results(&self) -> usize {
        self.lock().cache.len()
    }
}

/// Render hits as a numbered markdown list, skipping hits without a URL and
/// repeated URLs. Returns `None` when nothing is left.
pub fn format_results(query: &str, hits: &[SearchHit]) -> Option<String> {
    let mut seen = HashSet::new();
    let unique: Vec<&SearchHit> = hits
        .iter()
        .filter(|hit| !hit.href.is_empty() && seen.insert(hit.href.as_str()))
        .collect();

    if unique.is_empty() {
        return None;
    }

    let mut out = format!("Search results for '{query}':\n\n");
    for (i, hit) in unique.iter().enumerate() {
        let title = if hit.title.is_empty() { "Untitled" } else { hit.title.as_str() };
        let body = if hit.body.is_empty() {
            "No description".to_string()
        } else if hit.body.chars().count() > MAX_BODY_CHARS {
            let cut: String = hit.body.chars().take(MAX_BODY_CHARS).collect();
            format!("{cut}...")
        } else {
            hit.body.clone()
        };
        out.push_str(&format!("{}. **{title}**\n   {body}\n   {}\n\n", i + 1, hit.href));
    }
    Some(out)
}

/// Runs searches for the research agent and remembers what it asked.
pub struct WebSearch {
    provider: Arc<dyn SearchProvider>,
    history: Arc<SearchHistory>,
    max_results: usize,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            history: Arc::new(SearchHistory::new()),
            max_results: MAX_RESULTS,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn history(&self) -> &Arc<SearchHistory> {
        &self.history
    }

    /// Search and return text for the model. Never fails; problems are
    /// described in the returned text.
    pub async fn search(&self, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            return "Invalid search query.".to_string();
        }
        if query.chars().count() < MIN_QUERY_CHARS {
            return format!(
                "Search query too short. Use at least {MIN_QUERY_CHARS} characters."
            );
        }

        let hash = query_hash(query);
        match self.history.check(&hash) {
            Seen::Cached(text) => return format!("(cached) {text}"),
            Seen::Searched => {
                return format!("Already searched: '{query}'. Try a different search term.")
            }
            Seen::New => {}
        }

        info!(query, "web search");
        let hits = match self.provider.search(query, self.max_results).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(query, error = %e, "web search failed");
                let mut message = format!("Search error: {e}");
                if e.is_dns() {
                    message.push_str("\nCheck your internet connection and try again.");
                }
                return message;
            }
        };

        if hits.is_empty() {
            warn!(query, "no search results");
            return format!("No search results found for '{query}'.");
        }

        match format_results(query, &hits) {
            Some(text) => {
                self.history.store(&hash, &text);
                info!(query, results = hits.len(), "web search finished");
                text
            }
            None => format!("No usable search results for '{query}'."),
        }
    }
}

/// Search the web and get titles, snippets and links for the top results
#[derive(Tool, Deserialize, Debug)]
#[tool(name = "web_search")]
pub struct WebSearchInput {
    /// What to search for, at least 3 characters
    pub query: String,
}

#[async_trait]
impl Toolbox for WebSearch {
    fn definitions(&self) -> Vec<llm::Tool> {
        vec![WebSearchInput::as_tool()]
    }

    async fn call(&self, name: &str, input: Value) -> ToolResult {
        if name != WebSearchInput::tool_name() {
            return ToolResult::error(json!({ "error": format!("Unknown tool: {name}") }).to_string());
        }
        match serde_json::from_value::<WebSearchInput>(input) {
            Ok(input) => ToolResult::success(self.search(&input.query).await),
            Err(e) => {
                error!(tool = name, error = %e, "invalid tool input");
                ToolResult::error(json!({ "error": format!("Invalid input: {e}") }).to_string())
            }
        }
    }
}
