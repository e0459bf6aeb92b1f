//! The interactive `>` prompt.
//!
//! Reserved words are handled here; everything else is a player action sent
//! to the game master. Ctrl-C while the game master is thinking abandons
//! that turn; Ctrl-C at the prompt or end of input quits.

use crew::CancellationToken;
use dnd_core::{EngineError, GameEngine};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

/// One line of player input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Status,
    Saves,
    Save(Option<String>),
    Load(Option<String>),
    Action(String),
}

impl Command {
    /// Parse a trimmed line. Returns `None` for blank input.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line, None),
        };

        let command = match (head.to_lowercase().as_str(), rest) {
            ("quit", None) => Command::Quit,
            ("help", None) => Command::Help,
            ("status", None) => Command::Status,
            ("saves", None) => Command::Saves,
            ("save", name) => Command::Save(name.map(str::to_string)),
            ("load", name) => Command::Load(name.map(str::to_string)),
            _ => Command::Action(line.to_string()),
        };
        Some(command)
    }
}

fn prompt() {
    print!("\n> ");
    io::stdout().flush().ok();
}

/// Read commands until `quit`, end of input, or Ctrl-C.
pub async fn run(engine: &mut GameEngine) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                println!("\n\nLeaving the game.");
                return Ok(());
            }
        };

        let Some(line) = line else {
            println!("\n\nInput closed. Leaving the game.");
            return Ok(());
        };

        let Some(command) = Command::parse(&line) else {
            println!("What do you do?");
            continue;
        };

        match command {
            Command::Quit => {
                println!("Thanks for playing. It was a fine adventure!");
                return Ok(());
            }
            Command::Help => println!("{}", engine.help()),
            Command::Status => println!("{}", engine.status()),
            Command::Saves => println!("{}", engine.list_saves().await),
            Command::Save(name) => println!("{}", engine.save_game(name.as_deref()).await),
            Command::Load(Some(name)) => println!("{}", engine.load_game(&name).await),
            Command::Load(None) => {
                println!("Give a file name, e.g. load save_20240101_120000.json");
                println!("{}", engine.list_saves().await);
            }
            Command::Action(action) => play_turn(engine, &action).await,
        }
    }
}

async fn play_turn(engine: &mut GameEngine, action: &str) {
    println!("The game master is thinking... (Ctrl-C to cancel)");

    let cancel = CancellationToken::new();
    let turn = engine.process_input(action, &cancel);
    tokio::pin!(turn);

    let result = tokio::select! {
        result = &mut turn => result,
        _ = signal::ctrl_c() => {
            cancel.cancel();
            turn.await
        }
    };

    match result {
        Ok(answer) => println!("\n{answer}"),
        Err(EngineError::Cancelled) => println!("\nTurn cancelled."),
        Err(e) => {
            println!("\n{e}");
            println!("Please try again in a moment.");
        }
    }
}
