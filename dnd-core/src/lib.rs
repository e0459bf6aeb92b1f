//! Text role-playing game run by an LLM game master.
//!
//! This crate provides:
//! - Characters, dice rolls and d20 ability checks
//! - A lock-protected game state store with JSON save/load
//! - Player input sanitizing
//! - The game tools the agents call, and the engine driving them
//! - Session preparation and quick encounters written by a crew
//!
//! # Quick Start
//!
//! ```ignore
//! use dnd_core::{GameConfig, GameEngine, GameStateStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GameConfig::from_env()?;
//!     let store = Arc::new(GameStateStore::new("saves")?);
//!     let mut engine = GameEngine::new(config, store);
//!     let cancel = Default::default();
//!
//!     println!("{}", engine.start_game(&cancel).await?);
//!     println!("{}", engine.process_input("I look around the tavern", &cancel).await?);
//!
//!     println!("{}", engine.save_game(Some("my_campaign")).await);
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod config;
pub mod dice;
pub mod engine;
pub mod offline;
pub mod prompts;
pub mod setup;
pub mod state;
pub mod tools;
pub mod validate;

// Re-export for convenience
pub use dnd_macros::Tool;

// Primary public API
pub use character::{Ability, Character};
pub use config::GameConfig;
pub use dice::{ability_check, ability_modifier, roll_dice, Advantage, DiceError, DiceSpec};
pub use engine::{EngineError, Fallback, GameEngine};
pub use setup::{
    CampaignLength, EncounterKind, FantasySetting, SessionPlanner, SessionPrep, SessionSetup,
    SetupError,
};
pub use state::{GameState, GameStateStore, StoreError};
pub use tools::{GameTool, GameToolbox, ToolError};
pub use validate::InputValidator;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// Look up a character sheet by name
    #[derive(Tool, Deserialize)]
    #[tool(name = "lookup_character")]
    struct LookupCharacter {
        /// Character name, any case
        name: String,
        /// Include the inventory in the answer
        with_inventory: Option<bool>,
    }

    #[test]
    fn test_tool_derive() {
        assert_eq!(LookupCharacter::tool_name(), "lookup_character");
        assert_eq!(
            LookupCharacter::tool_description(),
            "Look up a character sheet by name"
        );
    }

    #[test]
    fn test_tool_schema() {
        let schema = LookupCharacter::input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["properties"]["with_inventory"]["type"], "boolean");

        // name should be required, with_inventory should not be (it's Option)
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "name"));
        assert!(!required.iter().any(|v| v == "with_inventory"));
    }

    #[test]
    fn test_tool_as_tool() {
        let tool = LookupCharacter::as_tool();
        assert_eq!(tool.name, "lookup_character");
        assert!(!tool.description.is_empty());
    }
}
