//! Agent personas and task briefs for the research crew.

use crate::config::{QualityMode, ResearchConfig};
use crate::search::WebSearchInput;
use crew::{Agent, Task};

pub const PLANNER_ROLE: &str = "Research Planner";
pub const RESEARCHER_ROLE: &str = "Research Analyst";
pub const WRITER_ROLE: &str = "Content Writer";
pub const NATIVE_WRITER_ROLE: &str = "Native Language Writer";

/// Designs the web searches.
pub fn planner(config: &ResearchConfig) -> Agent {
    Agent::new(
        PLANNER_ROLE,
        format!("Plan an effective web search strategy for {}", config.topic),
        "A strategist who breaks any subject down into its key questions and designs \
         search queries that surface the most recent information.",
    )
    .with_max_tokens(1024)
    .with_temperature(0.6)
}

/// Runs the searches and summarizes what they found.
pub fn researcher(config: &ResearchConfig) -> Agent {
    Agent::new(
        RESEARCHER_ROLE,
        format!(
            "Collect and analyze comprehensive, in-depth information about {}",
            config.topic
        ),
        "An experienced researcher who gathers live information with web searches, \
         weighs sources critically and draws out trustworthy insights.",
    )
    .with_tools([WebSearchInput::tool_name()])
    .with_max_tokens(2000)
    .with_temperature(0.7)
}

pub fn writer(config: &ResearchConfig) -> Agent {
    match config.quality {
        QualityMode::Standard => Agent::new(
            WRITER_ROLE,
            format!(
                "Write an engaging and informative {} about {}",
                config.report_type, config.topic
            ),
            format!(
                "A professional writer who explains complex material clearly and \
                 engagingly in {}, turning the latest findings into practical content \
                 readers can follow.",
                config.language
            ),
        )
        .with_max_tokens(2000)
        .with_temperature(0.8),
        QualityMode::LanguageOptimized => Agent::new(
            NATIVE_WRITER_ROLE,
            format!(
                "Write a natural, accurate {} {} about {}",
                config.language, config.report_type, config.topic
            ),
            format!(
                "A native {0} writer who expresses technical material in natural, easy \
                 {0}. Never mixes in words from other languages and always backs claims \
                 with accurate information.",
                config.language
            ),
        )
        .with_max_tokens(2000)
        .with_temperature(0.7),
    }
}

/// `SEARCH_QUERY_1: "..."` lines, one per planned query.
fn query_format(count: usize, placeholder: &str) -> String {
    (1..=count)
        .map(|n| format!("SEARCH_QUERY_{n}: \"{placeholder} {n}\""))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn planning_task(config: &ResearchConfig, agent: usize) -> Task {
    let count = config.search_queries;
    Task::new(
        format!(
            "We need comprehensive research on \"{topic}\".\n\n\
             Analyze the topic from the angles below and write {count} specific, \
             effective English web search queries:\n\n\
             1. Latest trends and developments\n\
             2. Expert analysis and research studies\n\
             3. Case studies and real applications\n\
             4. Future outlook and forecasts\n\
             5. Industry impact and implementation\n\n\
             **Format requirements:**\n\
             - Every query must use different keywords\n\
             - Output exactly this format:\n\
             {format}\n\n\
             Each query must be searchable on its own and aimed at recent information.",
            topic = config.topic,
            format = query_format(count, "search query"),
        ),
        format!(
            "Exactly {count} English search queries in this format:\n{}\n\
             Distinct queries tailored to: {}",
            query_format(count, "query"),
            config.topic
        ),
        agent,
    )
}

pub fn research_task(config: &ResearchConfig, agent: usize, plan: usize) -> Task {
    let count = config.search_queries;
    Task::new(
        format!(
            "Use the search queries planned in the previous step to research \"{topic}\" \
             on the web.\n\n\
             **Steps:**\n\
             1. Find the lines starting with \"SEARCH_QUERY_1:\", \"SEARCH_QUERY_2:\" and so on.\n\
             2. Take only the quoted text from each line.\n\
             3. Search for **every** query, one at a time, with the web_search tool.\n\
             4. Report progress as \"Searching: X/{count} - [query]\".\n\
             5. If a search fails or returns nothing relevant, write an alternative \
             query on the same subject and search again.\n\n\
             **Report requirements:**\n\
             When all searches are done, write a summary report **in {language}** covering:\n\
             - Major trends and developments\n\
             - Key statistics and data\n\
             - Concrete cases and practical applications\n\
             - Expert opinion and analysis\n\
             - Future outlook\n\n\
             **Important**: even when search results are in another language, the \
             report must be written in {language} only.",
            topic = config.topic,
            language = config.language,
        ),
        format!(
            "A detailed 400-500 word research summary on \"{}\" with key insights, \
             recent statistics and real examples, written in {} and based on every \
             planned search.",
            config.topic, config.language
        ),
        agent,
    )
    .with_context(vec![plan])
}

pub fn writing_task(config: &ResearchConfig, agent: usize, research: usize) -> Task {
    let (min, max) = config.word_range;
    let task = match config.quality {
        QualityMode::Standard => Task::new(
            format!(
                "Using the research summary, write a {kind} about \"{topic}\" \
                 **entirely in {language}**.\n\n\
                 **Requirements:**\n\
                 - Length: {min}-{max} words\n\
                 - An engaging title and subheadings in {language}\n\
                 - Clear, readable {language}\n\
                 - Realistic content that reflects the latest findings\n\
                 - A structure that holds the reader's interest\n\
                 - Real cases or concrete examples\n\n\
                 Audience: interested general readers and practitioners.",
                kind = config.report_type,
                topic = config.topic,
                language = config.language,
            ),
            format!(
                "A reader-friendly, informative {min}-{max} word {}, written entirely in \
                 {}, reflecting the web search results.",
                config.report_type, config.language
            ),
            agent,
        ),
        QualityMode::LanguageOptimized => Task::new(
            format!(
                "Using the collected research, write a natural {language} {kind} about \
                 \"{topic}\".\n\n\
                 **Absolute rules:**\n\
                 1. Do not use words, sentences or phrases from any other language\n\
                 2. Write everything in natural {language}\n\
                 3. Translate technical terms into {language}\n\n\
                 **Structure:**\n\
                 1. An interesting title\n\
                 2. An engaging introduction\n\
                 3. Main body in 5-6 sections:\n\
                 \x20  - Current state and developments\n\
                 \x20  - Key technologies and innovations\n\
                 \x20  - Real applications and examples\n\
                 \x20  - Major companies and market changes\n\
                 \x20  - Future outlook\n\
                 \x20  - Conclusions and implications\n\
                 4. A closing summary\n\n\
                 **Standards:**\n\
                 - {min}-{max} words in total\n\
                 - Concrete data and cases\n\
                 - Professional but accessible style\n\
                 - A subheading for every section",
                kind = config.report_type,
                topic = config.topic,
                language = config.language,
            ),
            format!(
                "A high-quality {} {} about {} ({min}-{max} words)",
                config.language, config.report_type, config.topic
            ),
            agent,
        ),
    };
    task.with_context(vec![research])
}
