//! Tools the game agents can call.
//!
//! The set is closed: [`GameTool`] names every tool, each input struct
//! derives its JSON schema, and [`GameToolbox`] dispatches calls against
//! the shared [`GameStateStore`]. Failures come back to the model as
//! `{"error": "..."}` payloads.

use crate::dice::{self, Advantage, DiceError, DiceSpec};
use crate::state::GameStateStore;
use async_trait::async_trait;
use crew::Toolbox;
use dnd_macros::Tool;
use llm::ToolResult;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Errors from executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] serde_json::Error),

    #[error(transparent)]
    Dice(#[from] DiceError),
}

fn default_sides() -> u32 {
    20
}

fn default_count() -> u32 {
    1
}

fn default_difficulty() -> i32 {
    10
}

/// Roll dice. Pass sides/count/modifier, or a notation like "2d6+3"
#[derive(Tool, Deserialize, Debug)]
#[tool(name = "roll_dice")]
pub struct RollDiceInput {
    /// Number of sides on each die
    #[tool(min = 2, max = 100, default = 20)]
    #[serde(default = "default_sides")]
    pub sides: u32,
    /// Number of dice to roll
    #[tool(min = 1, max = 10, default = 1)]
    #[serde(default = "default_count")]
    pub count: u32,
    /// Flat modifier added to the sum
    #[tool(min = -20, max = 20, default = 0)]
    #[serde(default)]
    pub modifier: i32,
    /// Dice notation such as "2d6+3"; overrides the other fields
    pub notation: Option<String>,
}

/// Make a d20 ability check against a difficulty class
#[derive(Tool, Deserialize, Debug)]
#[tool(name = "ability_check")]
pub struct AbilityCheckInput {
    /// The ability score being tested
    #[tool(min = 1, max = 30)]
    pub ability_score: i32,
    /// Difficulty class to beat
    #[tool(min = 5, max = 30, default = 10)]
    #[serde(default = "default_difficulty")]
    pub difficulty: i32,
    /// Roll two d20s and keep the higher
    #[tool(default = false)]
    #[serde(default)]
    pub advantage: bool,
    /// Roll two d20s and keep the lower
    #[tool(default = false)]
    #[serde(default)]
    pub disadvantage: bool,
}

/// Get the current game situation, scene and characters
#[derive(Tool, Deserialize, Debug)]
#[tool(name = "get_game_context")]
pub struct GetGameContextInput {}

/// Replace the current game situation with a new description
#[derive(Tool, Deserialize, Debug)]
#[tool(name = "update_game_context")]
pub struct UpdateGameContextInput {
    /// The new game context
    pub new_context: String,
}

/// Every tool available to the game agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameTool {
    RollDice,
    AbilityCheck,
    GetGameContext,
    UpdateGameContext,
}

impl GameTool {
    pub fn all() -> [GameTool; 4] {
        [
            GameTool::RollDice,
            GameTool::AbilityCheck,
            GameTool::GetGameContext,
            GameTool::UpdateGameContext,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameTool::RollDice => RollDiceInput::tool_name(),
            GameTool::AbilityCheck => AbilityCheckInput::tool_name(),
            GameTool::GetGameContext => GetGameContextInput::tool_name(),
            GameTool::UpdateGameContext => UpdateGameContextInput::tool_name(),
        }
    }

    pub fn from_name(name: &str) -> Option<GameTool> {
        GameTool::all().into_iter().find(|tool| tool.name() == name)
    }

    pub fn definition(&self) -> llm::Tool {
        match self {
            GameTool::RollDice => RollDiceInput::as_tool(),
            GameTool::AbilityCheck => AbilityCheckInput::as_tool(),
            GameTool::GetGameContext => GetGameContextInput::as_tool(),
            GameTool::UpdateGameContext => UpdateGameContextInput::as_tool(),
        }
    }
}

/// Dispatches [`GameTool`] calls against the game state.
pub struct GameToolbox {
    store: Arc<GameStateStore>,
}

impl GameToolbox {
    pub fn new(store: Arc<GameStateStore>) -> Self {
        Self { store }
    }

    /// Run a tool and return its JSON (or text) output.
    pub fn execute(&self, tool: GameTool, input: Value) -> Result<String, ToolError> {
        match tool {
            GameTool::RollDice => {
                let input: RollDiceInput = serde_json::from_value(input)?;
                let spec = match &input.notation {
                    Some(notation) if !notation.trim().is_empty() => DiceSpec::parse(notation)?,
                    _ => DiceSpec::new(input.count, input.sides, input.modifier)?,
                };
                let roll = spec.roll();
                info!(roll = %roll.description, "dice rolled");
                Ok(serde_json::to_string(&roll)?)
            }
            GameTool::AbilityCheck => {
                let input: AbilityCheckInput = serde_json::from_value(input)?;
                let check = dice::ability_check(
                    input.ability_score,
                    input.difficulty,
                    Advantage::from_flags(input.advantage, input.disadvantage),
                )?;
                info!(check = %check.description, "ability check");
                Ok(serde_json::to_string(&check)?)
            }
            GameTool::GetGameContext => {
                let state = self.store.snapshot();
                Ok(json!({
                    "current_context": state.game_context,
                    "characters": state.active_characters,
                    "scene": state.current_scene,
                    "last_updated": state.last_updated,
                })
                .to_string())
            }
            GameTool::UpdateGameContext => {
                let input: UpdateGameContextInput = serde_json::from_value(input)?;
                self.store.update_context(&input.new_context);
                let preview: String = input.new_context.chars().take(100).collect();
                Ok(format!("Game context updated: {preview}"))
            }
        }
    }
}

/// Tool inputs arrive as `null` when the model sends no arguments.
fn normalize_input(input: Value) -> Value {
    match input {
        Value::Null => json!({}),
        other => other,
    }
}

#[async_trait]
impl Toolbox for GameToolbox {
    fn definitions(&self) -> Vec<llm::Tool> {
        GameTool::all().iter().map(GameTool::definition).collect()
    }

    async fn call(&self, name: &str, input: Value) -> ToolResult {
        let result = GameTool::from_name(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
            .and_then(|tool| self.execute(tool, normalize_input(input)));

        match result {
            Ok(output) => ToolResult::success(output),
            Err(e) => {
                error!(tool = name, error = %e, "tool call failed");
                ToolResult::error(json!({ "error": e.to_string() }).to_string())
            }
        }
    }
}
