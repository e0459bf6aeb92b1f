//! Canned game master used when no model server is reachable.

use crate::state::GameState;

const RESPONSES: &[(&str, &str)] = &[
    (
        "investigate",
        "You decide to investigate the cave. Strange sounds echo from the darkness...",
    ),
    (
        "accept",
        "You accept the quest! You set off toward the cave entrance.",
    ),
    (
        "decline",
        "The innkeeper looks disappointed and says they will find another adventurer.",
    ),
];

/// Answer `input` from the keyword table, or with a generic reply.
///
/// `inventory` and `status` read the first active character from `state`.
pub fn respond(input: &str, state: &GameState) -> String {
    let lowered = input.to_lowercase();

    if lowered.contains("inventory") {
        return match state.active_characters.first() {
            Some(c) => format!("GM: You are carrying: {}", c.inventory.join(", ")),
            None => "GM: You are carrying nothing.".to_string(),
        };
    }
    if lowered.contains("status") {
        return match state.active_characters.first() {
            Some(c) if c.is_alive() => format!("GM: HP {}/{}, condition: good", c.hp, c.max_hp),
            Some(c) => format!("GM: HP {}/{}, condition: unconscious", c.hp, c.max_hp),
            None => "GM: There is nobody in the party.".to_string(),
        };
    }

    RESPONSES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, response)| format!("GM: {response}"))
        .unwrap_or_else(|| format!("GM: You consider '{input}'... (offline mode)"))
}
