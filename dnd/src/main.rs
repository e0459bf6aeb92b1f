//! Text role-playing game with an LLM game master.
//!
//! Talks to any OpenAI-compatible server configured through `DEFAULT_URL`,
//! `DEFAULT_API_KEY` and `DEFAULT_LLM` (a `.env` file is read first).
//!
//! ```bash
//! cargo run -p dnd
//! cargo run -p dnd -- --offline --saves-dir /tmp/saves
//! cargo run -p dnd -- setup --players 3 --level 5 --setting steampunk
//! cargo run -p dnd -- encounter --kind puzzle --level 7
//! ```

mod repl;

use clap::{Parser, Subcommand};
use crew::{logging, CancellationToken};
use dnd_core::setup::{CHARACTER_CLASSES, DEFAULT_ENCOUNTER_LEVEL};
use dnd_core::{
    CampaignLength, EncounterKind, EngineError, Fallback, FantasySetting, GameConfig, GameEngine,
    GameStateStore, SessionPlanner, SessionSetup, SetupError,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "dnd",
    about = "Play a text role-playing game with an LLM game master",
    version
)]
struct Args {
    /// Never contact the model server; use canned responses
    #[arg(long)]
    offline: bool,

    /// Report connection failures instead of switching to offline mode
    #[arg(long, conflicts_with = "offline")]
    strict: bool,

    /// Directory for save files
    #[arg(long, default_value = "saves")]
    saves_dir: PathBuf,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Skip the welcome banner
    #[arg(long)]
    no_banner: bool,

    /// Without a command, start a game
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare characters, a campaign and a first-session guide
    Setup {
        /// Number of players (1-6)
        #[arg(short, long, default_value_t = 1)]
        players: u8,

        /// Starting level (1-20)
        #[arg(short, long, default_value_t = 1)]
        level: u8,

        /// Fantasy setting (see `dnd settings`)
        #[arg(short, long, default_value = "medieval")]
        setting: FantasySetting,

        /// Campaign length: short, medium or long
        #[arg(long, default_value = "short")]
        length: CampaignLength,

        /// Skip writing character sheets
        #[arg(long)]
        no_characters: bool,

        /// Directory for the session notes
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write a single encounter
    Encounter {
        /// combat, social, exploration, puzzle or mixed
        #[arg(short, long, default_value = "combat")]
        kind: EncounterKind,

        /// Party level (1-20)
        #[arg(short, long, default_value_t = DEFAULT_ENCOUNTER_LEVEL)]
        level: u8,
    },

    /// List the character classes
    Classes,

    /// List the fantasy settings
    Settings,
}

const BANNER: &str = r"
    +---------------------------------------+
    |        D&D Crew game engine           |
    |                                       |
    |   A fantasy role-playing game with    |
    |        an AI game master              |
    +---------------------------------------+";

fn show_welcome(config: &GameConfig) {
    println!("{BANNER}");
    println!();
    println!("Features:");
    println!("  * Real-time play with an AI game master");
    println!("  * Automatic dice rolls and ability checks");
    println!("  * Save and load games");
    println!("  * Detailed character status");
    println!("  * Model: {}", config.llm.model);
}

fn print_classes() {
    println!("Character classes:");
    for class in CHARACTER_CLASSES {
        println!();
        println!("  {}", class.name);
        println!("    Primary ability: {}", class.primary_ability);
        println!("    Feature: {}", class.feature);
        println!("    Weapons: {}", class.weapons.join(", "));
    }
}

fn print_settings() {
    println!("Fantasy settings:");
    for setting in FantasySetting::ALL {
        println!();
        println!("  {} ({})", setting.title(), setting.key());
        println!("    {}", setting.description());
    }
}

/// Drive `run` to completion, cancelling it on Ctrl-C.
async fn until_ctrl_c<F: Future>(cancel: &CancellationToken, run: F) -> F::Output {
    tokio::pin!(run);
    tokio::select! {
        output = &mut run => output,
        _ = tokio::signal::ctrl_c() => {
            println!("\nCancelling...");
            cancel.cancel();
            run.await
        }
    }
}

fn report_setup_error(e: &SetupError, log_dir: &std::path::Path) {
    error!(error = %e, "session preparation failed");
    eprintln!("\nFailed: {e}");
    if e.is_connectivity() {
        print_troubleshooting();
    }
    eprintln!("See the log files in {} for details.", log_dir.display());
}

async fn run_command(
    command: Command,
    config: &GameConfig,
    log_dir: &std::path::Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let planner = SessionPlanner::new(Arc::new(config.llm.client()));
    let cancel = CancellationToken::new();

    match command {
        Command::Setup {
            players,
            level,
            setting,
            length,
            no_characters,
            output_dir,
        } => {
            let setup = SessionSetup::new(players, level)?
                .with_setting(setting)
                .with_length(length)
                .with_characters(!no_characters);

            println!("Players:  {}", setup.players);
            println!("Setting:  {}", setup.setting);
            println!("Level:    {}", setup.level);
            println!("Length:   {}", setup.length);
            println!("{}", "=".repeat(60));

            let prep = match until_ctrl_c(&cancel, planner.prepare(&setup, &cancel)).await {
                Ok(prep) => prep,
                Err(e) => {
                    report_setup_error(&e, log_dir);
                    return Err(e.into());
                }
            };

            for (player, sheet) in prep.characters.iter().enumerate() {
                println!("\n## Player {}\n\n{sheet}", player + 1);
            }
            println!("\n## Campaign\n\n{}", prep.campaign);
            println!("\n## Session guide\n\n{}", prep.session_guide);

            let path = prep.save(&output_dir).await?;
            info!(path = %path.display(), "session prepared");
            println!("\nSession notes saved to {}", path.display());
        }
        Command::Encounter { kind, level } => {
            let encounter =
                match until_ctrl_c(&cancel, planner.quick_encounter(kind, level, &cancel)).await {
                    Ok(encounter) => encounter,
                    Err(e) => {
                        report_setup_error(&e, log_dir);
                        return Err(e.into());
                    }
                };
            println!("\n{kind} encounter for a level {level} party");
            println!("{}", "=".repeat(60));
            println!("{encounter}");
        }
        Command::Classes => print_classes(),
        Command::Settings => print_settings(),
    }
    Ok(())
}

fn print_troubleshooting() {
    eprintln!();
    eprintln!("Troubleshooting:");
    eprintln!("  1. Check that the LLM server is running and reachable");
    eprintln!("  2. Check DEFAULT_URL, DEFAULT_API_KEY and DEFAULT_LLM in .env");
    eprintln!("  3. Try --offline to play without a server");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let mut args = Args::parse();

    match args.command {
        Some(Command::Classes) => {
            print_classes();
            return Ok(());
        }
        Some(Command::Settings) => {
            print_settings();
            return Ok(());
        }
        _ => {}
    }

    if let Err(e) = logging::init(&args.log_dir, "dnd_game") {
        eprintln!("Warning: could not open log directory {}: {e}", args.log_dir.display());
    }

    let config = match GameConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            print_troubleshooting();
            return Err(e.into());
        }
    };
    info!(model = %config.llm.model, url = %config.llm.base_url, "configuration loaded");

    if let Some(command) = args.command.take() {
        return run_command(command, &config, &args.log_dir).await;
    }

    if !args.no_banner {
        show_welcome(&config);
    }

    let store = Arc::new(GameStateStore::new(&args.saves_dir)?);
    let fallback = if args.strict {
        Fallback::Fail
    } else {
        Fallback::Offline
    };
    let mut engine = GameEngine::new(config, store)
        .with_fallback(fallback)
        .with_offline(args.offline);

    if !args.offline {
        println!("\nChecking the LLM server connection...");
    }
    let opening = match engine.start_game(&CancellationToken::new()).await {
        Ok(opening) => opening,
        Err(e) => {
            error!(error = %e, "failed to start the game");
            eprintln!("Could not start the game: {e}");
            if matches!(e, EngineError::Authentication(_)) {
                eprintln!("The server rejected the API key.");
            }
            print_troubleshooting();
            return Err(e.into());
        }
    };

    if engine.is_offline() {
        println!("\nThe LLM server is unreachable. Playing in offline mode.");
    }
    println!("\n{opening}");
    println!("\n{}", "=".repeat(60));
    println!("The game has started!");
    println!("Type 'help' for commands, 'quit' to leave.");
    println!("{}", "=".repeat(60));

    repl::run(&mut engine).await?;
    info!("game ended");
    Ok(())
}
