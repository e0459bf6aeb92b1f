//! Player characters.

use crate::dice::ability_modifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl FromStr for Ability {
    type Err = String;

    /// Accepts full names and three-letter abbreviations, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "str" | "strength" => Ok(Ability::Strength),
            "dex" | "dexterity" => Ok(Ability::Dexterity),
            "con" | "constitution" => Ok(Ability::Constitution),
            "int" | "intelligence" => Ok(Ability::Intelligence),
            "wis" | "wisdom" => Ok(Ability::Wisdom),
            "cha" | "charisma" => Ok(Ability::Charisma),
            other => Err(format!("Unknown ability: {other}")),
        }
    }
}

fn default_level() -> u32 {
    1
}

fn default_ten() -> i32 {
    10
}

fn default_inventory() -> Vec<String> {
    vec![
        "Basic sword".to_string(),
        "Leather armor".to_string(),
        "Healing potion x2".to_string(),
    ]
}

/// A player character. Scores are conventionally 1-30; `hp` stays within
/// `0..=max_hp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default = "default_ten")]
    pub hp: i32,
    #[serde(default = "default_ten")]
    pub max_hp: i32,
    #[serde(default = "default_ten")]
    pub ac: i32,
    #[serde(default = "default_ten")]
    pub strength: i32,
    #[serde(default = "default_ten")]
    pub dexterity: i32,
    #[serde(default = "default_ten")]
    pub constitution: i32,
    #[serde(default = "default_ten")]
    pub intelligence: i32,
    #[serde(default = "default_ten")]
    pub wisdom: i32,
    #[serde(default = "default_ten")]
    pub charisma: i32,
    #[serde(default = "default_inventory")]
    pub inventory: Vec<String>,
}

impl Character {
    /// A level 1 character with all defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: default_level(),
            hp: 10,
            max_hp: 10,
            ac: 10,
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
            inventory: default_inventory(),
        }
    }

    /// Set all six scores in STR, DEX, CON, INT, WIS, CHA order.
    pub fn with_abilities(mut self, scores: [i32; 6]) -> Self {
        for (ability, score) in Ability::all().into_iter().zip(scores) {
            *self.score_mut(ability) = score;
        }
        self
    }

    pub fn with_hp(mut self, hp: i32, max_hp: i32) -> Self {
        self.hp = hp;
        self.max_hp = max_hp;
        self.clamp_hp();
        self
    }

    /// Pull `max_hp` up to 0 and `hp` into `0..=max_hp`. Deserialized
    /// characters are not checked, so loaders call this.
    pub fn clamp_hp(&mut self) {
        self.max_hp = self.max_hp.max(0);
        self.hp = self.hp.clamp(0, self.max_hp);
    }

    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    fn score_mut(&mut self, ability: Ability) -> &mut i32 {
        match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        }
    }

    /// Modifier for an arbitrary score, `floor((score - 10) / 2)`.
    pub fn ability_modifier(score: i32) -> i32 {
        ability_modifier(score)
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        ability_modifier(self.score(ability))
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Restore hit points, never past `max_hp`. Negative amounts do nothing.
    pub fn heal(&mut self, amount: i32) {
        self.hp = (self.hp + amount.max(0)).min(self.max_hp);
    }

    /// Lose hit points, never below zero. Negative amounts do nothing.
    pub fn take_damage(&mut self, amount: i32) {
        self.hp = (self.hp - amount.max(0)).max(0);
    }
}
