//! Research a topic on the web and write it up as a markdown report.
//!
//! ```bash
//! cargo run -p research -- --topic space
//! cargo run -p research -- -t "Rust in embedded systems" -w 500,700 -m language_optimized -l Korean
//! cargo run -p research -- --list-presets
//! ```

use clap::Parser;
use crew::{logging, CancellationToken};
use research::config::{self, parse_word_range, DEFAULT_WORD_RANGE};
use research::{
    preset_topic, save_report, DuckDuckGo, QualityMode, ResearchConfig, ResearchCrew,
    ResearchSettings, WebSearch, PRESETS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "research",
    about = "Research any topic on the web and generate a report",
    version
)]
struct Args {
    /// Research topic, or a preset key (see --list-presets)
    #[arg(short, long, default_value = config::DEFAULT_TOPIC)]
    topic: String,

    /// Number of search queries to plan
    #[arg(short, long, default_value_t = config::DEFAULT_QUERIES)]
    queries: usize,

    /// Target word range, e.g. 700,900
    #[arg(short, long, default_value = "700,900")]
    words: String,

    /// Report type (blog, report, analysis, ...)
    #[arg(short = 'r', long = "type", default_value = config::DEFAULT_REPORT_TYPE)]
    report_type: String,

    /// Output language
    #[arg(short, long, default_value = config::DEFAULT_LANGUAGE)]
    language: String,

    /// Writer briefing
    #[arg(short = 'm', long, value_enum, default_value_t = QualityMode::Standard)]
    quality: QualityMode,

    /// Print the preset topics and exit
    #[arg(long)]
    list_presets: bool,

    /// Directory for the finished report
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn print_presets() {
    println!("Available preset topics:");
    for (key, topic) in PRESETS {
        println!("  {key}: {topic}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    if args.list_presets {
        print_presets();
        return Ok(());
    }

    if let Err(e) = logging::init(&args.log_dir, "research_crew") {
        eprintln!("Warning: could not open log directory {}: {e}", args.log_dir.display());
    }

    let settings = match ResearchSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return Err(e.into());
        }
    };

    let word_range = parse_word_range(&args.words).unwrap_or_else(|| {
        println!(
            "Invalid word range {:?}. Using the default {},{}.",
            args.words, DEFAULT_WORD_RANGE.0, DEFAULT_WORD_RANGE.1
        );
        DEFAULT_WORD_RANGE
    });

    let config = ResearchConfig::new(preset_topic(&args.topic))
        .with_search_queries(args.queries)
        .with_word_range(word_range)
        .with_language(args.language)
        .with_report_type(args.report_type)
        .with_quality(args.quality);

    println!("Topic:       {}", config.topic);
    println!("Report type: {}", config.report_type);
    println!("Queries:     {}", config.search_queries);
    println!("Words:       {}-{}", config.word_range.0, config.word_range.1);
    println!("Quality:     {}", config.quality);
    println!("{}", "=".repeat(60));

    let provider = DuckDuckGo::new(settings.llm.timeout)?;
    let search = Arc::new(WebSearch::new(Arc::new(provider)));
    let crew = ResearchCrew::new(config.clone(), Arc::new(settings.llm.client()), search)
        .with_time_limit(settings.max_execution_time);

    let cancel = CancellationToken::new();
    let run = crew.run(&cancel);
    tokio::pin!(run);

    let result = tokio::select! {
        result = &mut run => result,
        _ = signal::ctrl_c() => {
            println!("\nCancelling...");
            cancel.cancel();
            run.await
        }
    };

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "research failed");
            eprintln!("\nResearch failed: {e}");
            if e.is_connectivity() {
                eprintln!("Check DEFAULT_URL, DEFAULT_API_KEY and that the LLM server is running.");
            }
            eprintln!("See the log files in {} for details.", args.log_dir.display());
            return Err(e.into());
        }
    };

    let path = save_report(&args.output_dir, &config, &outcome.report).await?;
    info!(topic = %config.topic, searches = outcome.searches, "research complete");

    println!("\nThe '{}' report was generated: {}", config.topic, path.display());
    println!(
        "Planned queries: {}, searches run: {}",
        outcome.planned_queries.len(),
        outcome.searches
    );
    Ok(())
}
