//! Dice rolling and ability checks.
//!
//! Supports plain rolls of one die group (`XdY+Z`), d20 ability checks with
//! advantage/disadvantage, and RNG-injectable variants for tests.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

pub const SIDES: RangeInclusive<u32> = 2..=100;
pub const COUNT: RangeInclusive<u32> = 1..=10;
pub const MODIFIER: RangeInclusive<i32> = -20..=20;
pub const SCORE: RangeInclusive<i32> = 1..=30;
pub const DIFFICULTY: RangeInclusive<i32> = 5..=30;

/// Error type for dice parsing and rolling.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// An unsigned decimal number with no sign or other characters.
fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn check<T>(name: &'static str, value: T, range: &RangeInclusive<T>) -> Result<(), DiceError>
where
    T: PartialOrd + Copy + Into<i64>,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DiceError::OutOfRange {
            name,
            value: value.into(),
            min: (*range.start()).into(),
            max: (*range.end()).into(),
        })
    }
}

/// Advantage state for d20 rolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Build from the two request flags; both set cancel out.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        let a = if advantage {
            Advantage::Advantage
        } else {
            Advantage::Normal
        };
        let d = if disadvantage {
            Advantage::Disadvantage
        } else {
            Advantage::Normal
        };
        a.combine(d)
    }

    /// Combine two advantage states (advantage + disadvantage = normal).
    pub fn combine(self, other: Advantage) -> Advantage {
        match (self, other) {
            (Advantage::Normal, x) | (x, Advantage::Normal) => x,
            (Advantage::Advantage, Advantage::Disadvantage) => Advantage::Normal,
            (Advantage::Disadvantage, Advantage::Advantage) => Advantage::Normal,
            (Advantage::Advantage, Advantage::Advantage) => Advantage::Advantage,
            (Advantage::Disadvantage, Advantage::Disadvantage) => Advantage::Disadvantage,
        }
    }
}

/// Modifier for an ability score: `floor((score - 10) / 2)`.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// A single die group with a flat modifier, e.g. `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceSpec {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl Default for DiceSpec {
    fn default() -> Self {
        Self {
            count: 1,
            sides: 20,
            modifier: 0,
        }
    }
}

impl DiceSpec {
    /// Create a spec, checking every bound.
    pub fn new(count: u32, sides: u32, modifier: i32) -> Result<Self, DiceError> {
        check("sides", sides, &SIDES)?;
        check("count", count, &COUNT)?;
        check("modifier", modifier, &MODIFIER)?;
        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Parse `XdY`, `dY`, `XdY+Z` or `XdY-Z`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let compact: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let invalid = || DiceError::InvalidNotation(notation.trim().to_string());

        let (count_str, rest) = compact.split_once('d').ok_or_else(invalid)?;
        let count = if count_str.is_empty() {
            1
        } else {
            digits(count_str).ok_or_else(invalid)?
        };

        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let magnitude = digits(&rest[pos + 1..])
                    .and_then(|v| i32::try_from(v).ok())
                    .ok_or_else(invalid)?;
                let modifier = if rest.as_bytes()[pos] == b'-' {
                    -magnitude
                } else {
                    magnitude
                };
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };
        let sides = digits(sides_str).ok_or_else(invalid)?;

        Self::new(count, sides, modifier)
    }

    pub fn roll(&self) -> DiceRoll {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG (useful for testing).
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> DiceRoll {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let sum: i32 = rolls.iter().map(|&r| r as i32).sum();
        let total = sum + self.modifier;

        DiceRoll {
            critical: rolls.iter().any(|&r| r == self.sides),
            fumble: self.sides == 20 && rolls.contains(&1),
            description: format!(
                "{}d{}+{} = {:?} + {} = {}",
                self.count, self.sides, self.modifier, rolls, self.modifier, total
            ),
            rolls,
            modifier: self.modifier,
            total,
        }
    }
}

impl FromStr for DiceSpec {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceSpec::parse(s)
    }
}

impl fmt::Display for DiceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            0 => write!(f, "{}d{}", self.count, self.sides),
            m if m > 0 => write!(f, "{}d{}+{}", self.count, self.sides, m),
            m => write!(f, "{}d{}{}", self.count, self.sides, m),
        }
    }
}

/// Result of a plain dice roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub description: String,
    /// Any die showed its maximum face.
    pub critical: bool,
    /// A d20 showed a 1.
    pub fumble: bool,
}

/// Roll `count` dice with `sides` faces and add `modifier`.
pub fn roll_dice(sides: u32, count: u32, modifier: i32) -> Result<DiceRoll, DiceError> {
    roll_dice_with_rng(sides, count, modifier, &mut rand::thread_rng())
}

pub fn roll_dice_with_rng<R: Rng>(
    sides: u32,
    count: u32,
    modifier: i32,
    rng: &mut R,
) -> Result<DiceRoll, DiceError> {
    Ok(DiceSpec::new(count, sides, modifier)?.roll_with_rng(rng))
}

/// Result of a d20 ability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// The d20 that counted.
    pub roll: u32,
    /// Both d20s when rolled with advantage or disadvantage.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
    pub difficulty: i32,
    pub success: bool,
    pub critical_success: bool,
    pub critical_failure: bool,
    pub description: String,
}

/// Roll a d20 check for `score` against `difficulty`.
pub fn ability_check(
    score: i32,
    difficulty: i32,
    advantage: Advantage,
) -> Result<CheckResult, DiceError> {
    ability_check_with_rng(score, difficulty, advantage, &mut rand::thread_rng())
}

pub fn ability_check_with_rng<R: Rng>(
    score: i32,
    difficulty: i32,
    advantage: Advantage,
    rng: &mut R,
) -> Result<CheckResult, DiceError> {
    check("ability_score", score, &SCORE)?;
    check("difficulty", difficulty, &DIFFICULTY)?;

    let (roll, rolls, roll_desc) = match advantage {
        Advantage::Normal => {
            let roll = rng.gen_range(1..=20u32);
            (roll, Vec::new(), format!("d20({roll})"))
        }
        Advantage::Advantage => {
            let (a, b) = (rng.gen_range(1..=20u32), rng.gen_range(1..=20u32));
            let roll = a.max(b);
            (roll, vec![a, b], format!("2d20 advantage({a}, {b}) -> {roll}"))
        }
        Advantage::Disadvantage => {
            let (a, b) = (rng.gen_range(1..=20u32), rng.gen_range(1..=20u32));
            let roll = a.min(b);
            (roll, vec![a, b], format!("2d20 disadvantage({a}, {b}) -> {roll}"))
        }
    };

    let modifier = ability_modifier(score);
    let total = roll as i32 + modifier;
    let success = total >= difficulty;

    Ok(CheckResult {
        roll,
        rolls,
        modifier,
        total,
        difficulty,
        success,
        critical_success: roll == 20,
        critical_failure: roll == 1,
        description: format!(
            "{roll_desc} + modifier({modifier}) = {total} vs DC{difficulty} - {}",
            if success { "success" } else { "failure" }
        ),
    })
}
