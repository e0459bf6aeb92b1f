//! The game engine: validated player input in, game master narration out.

use crate::character::{Ability, Character};
use crate::config::GameConfig;
use crate::offline;
use crate::prompts;
use crate::state::{GameStateStore, StoreError};
use crate::tools::GameToolbox;
use crate::validate::InputValidator;
use crew::{Backoff, CancellationToken, ChatBackend, Crew, CrewError, Task};
use llm::{Message, Request};
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

pub const DEFAULT_CHARACTER: &str = "Adventurer";

/// STR, DEX, CON, INT, WIS, CHA of the starting character.
pub const DEFAULT_ABILITIES: [i32; 6] = [14, 12, 13, 10, 11, 9];

/// Errors surfaced to the player.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Cannot reach the LLM server: {0}")]
    Connection(String),

    #[error("The LLM server did not answer in time: {0}")]
    Timeout(String),

    #[error("API key authentication failed: {0}")]
    Authentication(String),

    #[error("The game has not started. Call start_game first.")]
    NotStarted,

    #[error("Request cancelled")]
    Cancelled,

    #[error("Game processing failed: {0}")]
    Crew(CrewError),
}

impl EngineError {
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            EngineError::Connection(_) | EngineError::Timeout(_) | EngineError::Authentication(_)
        )
    }
}

impl From<llm::Error> for EngineError {
    fn from(e: llm::Error) -> Self {
        match e {
            llm::Error::Connection(msg) => EngineError::Connection(msg),
            llm::Error::Timeout(after) => EngineError::Timeout(format!("{after:?}")),
            llm::Error::Authentication { message, .. } => EngineError::Authentication(message),
            llm::Error::Cancelled => EngineError::Cancelled,
            other => EngineError::Crew(CrewError::Llm(other)),
        }
    }
}

impl From<CrewError> for EngineError {
    fn from(e: CrewError) -> Self {
        match e {
            CrewError::Llm(e) => e.into(),
            other => EngineError::Crew(other),
        }
    }
}

/// What to do when the model server is unreachable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fallback {
    /// Switch to canned offline responses.
    #[default]
    Offline,
    /// Report the error to the player.
    Fail,
}

/// Runs one game session.
pub struct GameEngine {
    config: GameConfig,
    store: Arc<GameStateStore>,
    backend: Arc<dyn ChatBackend>,
    toolbox: Arc<GameToolbox>,
    validator: InputValidator,
    fallback: Fallback,
    backoff: Backoff,
    running: bool,
    offline: bool,
}

impl GameEngine {
    /// Create an engine talking to the server described by `config`.
    pub fn new(config: GameConfig, store: Arc<GameStateStore>) -> Self {
        let backend: Arc<dyn ChatBackend> = Arc::new(config.llm.client());
        Self {
            validator: InputValidator::new(config.max_input_length),
            toolbox: Arc::new(GameToolbox::new(store.clone())),
            config,
            store,
            backend,
            fallback: Fallback::default(),
            backoff: Backoff::default(),
            running: false,
            offline: false,
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Skip the model server entirely.
    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn store(&self) -> &Arc<GameStateStore> {
        &self.store
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Send a tiny completion to check that the server answers, retrying
    /// connection failures and timeouts with backoff.
    pub async fn test_connection(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        info!(model = %self.backend.model(), "testing LLM connection");
        let request = Request::new(vec![Message::user("Connection test")])
            .with_max_tokens(50)
            .with_temperature(0.1);

        let result = self
            .backoff
            .retry(
                |_| self.backend.complete(request.clone(), cancel),
                |e: &llm::Error| matches!(e, llm::Error::Connection(_) | llm::Error::Timeout(_)),
            )
            .await;

        match result {
            Ok(_) => {
                info!("LLM connection ok");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "LLM connection test failed");
                Err(e.into())
            }
        }
    }

    /// Check the connection, create the starting character and set the
    /// opening scene. Returns the scenario text.
    pub async fn start_game(&mut self, cancel: &CancellationToken) -> Result<String, EngineError> {
        info!("starting game");

        if !self.offline {
            if let Err(e) = self.test_connection(cancel).await {
                match self.fallback {
                    Fallback::Offline if !matches!(e, EngineError::Cancelled) => {
                        warn!(error = %e, "switching to offline mode");
                        self.offline = true;
                    }
                    _ => return Err(e),
                }
            }
        }

        self.store.add_character(
            Character::new(DEFAULT_CHARACTER).with_abilities(DEFAULT_ABILITIES),
        );
        self.store.set_scene(prompts::OPENING_SCENE);
        self.store.update_context(prompts::OPENING_SCENARIO);
        self.running = true;

        Ok(prompts::OPENING_SCENARIO.to_string())
    }

    /// Handle one player action.
    pub async fn process_input(
        &mut self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        if !self.running {
            return Err(EngineError::NotStarted);
        }

        let action = self.validator.sanitize(input);
        if action.is_empty() {
            return Ok("Invalid input.".to_string());
        }
        if !self.validator.validate_command(&action) {
            return Ok("That input is too long. Keep it short.".to_string());
        }

        info!(action = %action, "player input");

        if self.offline {
            return Ok(offline::respond(&action, &self.store.snapshot()));
        }

        match self.run_game_master(&action, cancel).await {
            Ok(answer) => {
                info!("game master answered");
                Ok(answer)
            }
            Err(e) if e.is_connectivity() && self.fallback == Fallback::Offline => {
                warn!(error = %e, "lost the LLM server, switching to offline mode");
                self.offline = true;
                Ok(offline::respond(&action, &self.store.snapshot()))
            }
            Err(e) => {
                error!(error = %e, "failed to process input");
                Err(e)
            }
        }
    }

    async fn run_game_master(
        &self,
        action: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let llm = &self.config.llm;
        let mut crew = Crew::new(self.backend.clone()).with_toolbox(self.toolbox.clone());
        let game_master = crew.add_agent(prompts::game_master(llm.max_tokens, llm.temperature));
        crew.add_agent(prompts::rules_advisor(llm.max_tokens));
        crew.set_tasks(vec![Task::new(
            prompts::player_action_task(action),
            prompts::PLAYER_ACTION_OUTPUT,
            game_master,
        )]);

        let output = crew.kickoff(cancel).await?;
        Ok(output.raw().to_string())
    }

    /// Character sheets for everyone in the party.
    pub fn status(&self) -> String {
        let state = self.store.snapshot();
        if state.active_characters.is_empty() {
            return "No active characters.".to_string();
        }

        state
            .active_characters
            .iter()
            .map(character_sheet)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub async fn save_game(&self, name: Option<&str>) -> String {
        match self.store.save_named(name).await {
            Some(file) => format!("Game saved: {file}"),
            None => "Failed to save the game.".to_string(),
        }
    }

    /// Load a save and resume play.
    pub async fn load_game(&mut self, name: &str) -> String {
        match self.store.try_load(name).await {
            Ok(path) => {
                info!(path = %path.display(), "game loaded");
                self.running = true;
                format!("Loaded game: {name}\n\n{}", self.store.context())
            }
            Err(StoreError::NotFound(path)) => {
                warn!(path = %path.display(), "save file not found");
                format!("Save file not found: {name}")
            }
            Err(e) => {
                error!(error = %e, "failed to load game");
                format!("Could not load {name}: {e}")
            }
        }
    }

    pub async fn list_saves(&self) -> String {
        let saves = self.store.list_saves().await;
        if saves.is_empty() {
            return "No saved games.".to_string();
        }

        let mut out = String::from("**Saved games:**\n");
        for save in &saves {
            let _ = writeln!(out, "  - {save}");
        }
        out.push_str("\nUsage: load <name>");
        out
    }

    pub fn help(&self) -> String {
        prompts::help_text(
            self.config.max_input_length,
            &self.config.llm.model,
            &self.config.llm.base_url,
        )
    }
}

fn character_sheet(c: &Character) -> String {
    let mut sheet = format!(
        "**{}** (level {})\n- HP: {}/{}\n- AC: {}",
        c.name, c.level, c.hp, c.max_hp, c.ac
    );
    for ability in Ability::all() {
        let _ = write!(
            sheet,
            "\n- {}: {} ({:+})",
            ability,
            c.score(ability),
            c.modifier(ability)
        );
    }
    let _ = write!(sheet, "\n- Inventory: {}", c.inventory.join(", "));
    sheet
}
