//! Agent personas and prompt templates.

use crate::tools::GameTool;
use crew::Agent;

pub const GAME_MASTER_ROLE: &str = "Game Master";
pub const RULES_ADVISOR_ROLE: &str = "Rules Advisor";

pub const OPENING_SCENARIO: &str = "\
**The Adventure Begins**

You are in the Golden Dragon, the inn of the small village of Greenhill.
The innkeeper walks over and says:

\"Adventurer, folks have been hearing strange noises from the cave near the village.
Look into it and I'll pay you 50 gold.\"

**Current status:**
- HP: 10/10
- Equipment: Basic sword, Leather armor, Healing potion x2
- Location: Greenhill village inn

What do you do?";

pub const OPENING_SCENE: &str = "Greenhill village inn";

/// The narrator who reacts to every player action.
pub fn game_master(max_tokens: usize, temperature: f32) -> Agent {
    Agent::new(
        GAME_MASTER_ROLE,
        "React immediately to the player's input and run a fun game",
        "You are a seasoned D&D game master. You respond to player actions right away \
         and create exciting situations. You roll dice when needed and keep the game \
         context up to date.",
    )
    .with_tools(tool_names(&[
        GameTool::RollDice,
        GameTool::GetGameContext,
        GameTool::UpdateGameContext,
    ]))
    .with_max_tokens(max_tokens)
    .with_temperature(temperature)
}

/// A rules expert consulted for complicated situations.
pub fn rules_advisor(max_tokens: usize) -> Agent {
    Agent::new(
        RULES_ADVISOR_ROLE,
        "Give D&D rules advice in complicated situations",
        "An expert in the D&D 5th edition rules who only steps in to interpret rules \
         and advise on rulings when a situation is complicated.",
    )
    .with_tools(tool_names(&[GameTool::AbilityCheck, GameTool::RollDice]))
    .with_max_tokens((max_tokens / 2).max(1))
    .with_temperature(0.3)
}

fn tool_names(tools: &[GameTool]) -> Vec<&'static str> {
    tools.iter().map(GameTool::name).collect()
}

/// Task description for one player action.
pub fn player_action_task(action: &str) -> String {
    format!(
        "Player action: \"{action}\"\n\n\
         Work out the current game situation and react to the player's action right away.\n\
         Roll dice if needed and describe the new situation based on the result.\n\
         Don't forget to update the game context.\n\n\
         Response format:\n\
         - Describe the outcome of the action\n\
         - Dice results if any\n\
         - Present the new situation or choices\n\n\
         Respond naturally and make it fun."
    )
}

pub const PLAYER_ACTION_OUTPUT: &str =
    "An immediate reaction to the player's action and the new situation";

/// In-game help text.
pub fn help_text(max_input_length: usize, model: &str, base_url: &str) -> String {
    format!(
        "\
**Commands:**
- help - show this help
- quit - leave the game
- save [name] - save the game
- load <name> - load a saved game
- saves - list saved games
- status - show character status

**In-game actions:**
- investigate - look around
- inventory - check your belongings
- accept / decline - accept or decline the quest
- attack - start a fight
- flee - run from a fight
- say: <text> - talk to an NPC
- cast: <spell> - cast a spell
- use: <item> - use an item

**System:**
- Max input length: {max_input_length} characters
- Model: {model}
- API server: {base_url}

Type any action you like. The game master will react."
    )
}
