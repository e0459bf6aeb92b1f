//! Session preparation: characters, a campaign and a game master's guide
//! written by a crew before play, plus one-off encounters.

use chrono::NaiveDateTime;
use crew::{Agent, CancellationToken, ChatBackend, Crew, CrewError, Task};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const MAX_PLAYERS: u8 = 6;
pub const MAX_LEVEL: u8 = 20;
pub const DEFAULT_ENCOUNTER_LEVEL: u8 = 3;

/// Characters, campaign and guide stages together.
pub const DEFAULT_SETUP_SECS: u64 = 1100;

pub const DUNGEON_MASTER_ROLE: &str = "Dungeon Master";
pub const CHARACTER_CREATOR_ROLE: &str = "Character Creator";
pub const STORY_WEAVER_ROLE: &str = "Story Weaver";

#[derive(Debug, Error)]
#[error("unknown {kind} {value:?}, expected one of: {expected}")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: u8,
        min: u8,
        max: u8,
    },

    #[error(transparent)]
    Unknown(#[from] UnknownChoice),

    #[error("session preparation failed: {0}")]
    Crew(#[from] CrewError),

    #[error("the crew returned no {0}")]
    EmptyOutput(&'static str),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SetupError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SetupError::Crew(e) if e.is_connectivity())
    }
}

fn check_range(name: &'static str, value: u8, max: u8) -> Result<u8, SetupError> {
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(SetupError::OutOfRange {
            name,
            value,
            min: 1,
            max,
        })
    }
}

/// Match `value` against the keys of a choice list, ignoring case, `-` and `_`.
fn choose<T: Copy>(
    kind: &'static str,
    value: &str,
    all: &[T],
    key: impl Fn(T) -> &'static str,
) -> Result<T, UnknownChoice> {
    let wanted: String = value
        .trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    all.iter()
        .copied()
        .find(|choice| key(*choice) == wanted)
        .ok_or_else(|| UnknownChoice {
            kind,
            value: value.to_string(),
            expected: all.iter().map(|c| key(*c)).collect::<Vec<_>>().join(", "),
        })
}

/// One playable class as shown to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: &'static str,
    pub primary_ability: &'static str,
    pub feature: &'static str,
    pub weapons: &'static [&'static str],
}

pub const CHARACTER_CLASSES: &[ClassInfo] = &[
    ClassInfo {
        name: "Fighter",
        primary_ability: "Strength",
        feature: "Melee specialist with high hit points",
        weapons: &["Sword", "Axe", "Shield"],
    },
    ClassInfo {
        name: "Wizard",
        primary_ability: "Intelligence",
        feature: "Powerful magic, low hit points",
        weapons: &["Staff", "Wand", "Scroll"],
    },
    ClassInfo {
        name: "Rogue",
        primary_ability: "Dexterity",
        feature: "Stealth and disarming traps",
        weapons: &["Dagger", "Bow", "Crossbow"],
    },
    ClassInfo {
        name: "Cleric",
        primary_ability: "Wisdom",
        feature: "Healing and divine magic",
        weapons: &["Mace", "Holy symbol", "Shield"],
    },
    ClassInfo {
        name: "Bard",
        primary_ability: "Charisma",
        feature: "Versatile skills and buffs",
        weapons: &["Bow", "Sword", "Instrument"],
    },
    ClassInfo {
        name: "Ranger",
        primary_ability: "Dexterity",
        feature: "Nature magic and tracking",
        weapons: &["Bow", "Sword", "Spear"],
    },
];

fn class_summary() -> String {
    CHARACTER_CLASSES
        .iter()
        .map(|c| {
            format!(
                "- {} ({}): {}; weapons: {}",
                c.name,
                c.primary_ability,
                c.feature,
                c.weapons.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FantasySetting {
    #[default]
    Medieval,
    Dark,
    High,
    Urban,
    Steampunk,
    Pirate,
}

impl FantasySetting {
    pub const ALL: [FantasySetting; 6] = [
        FantasySetting::Medieval,
        FantasySetting::Dark,
        FantasySetting::High,
        FantasySetting::Urban,
        FantasySetting::Steampunk,
        FantasySetting::Pirate,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FantasySetting::Medieval => "medieval",
            FantasySetting::Dark => "dark",
            FantasySetting::High => "high",
            FantasySetting::Urban => "urban",
            FantasySetting::Steampunk => "steampunk",
            FantasySetting::Pirate => "pirate",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FantasySetting::Medieval => "Medieval fantasy",
            FantasySetting::Dark => "Dark fantasy",
            FantasySetting::High => "High fantasy",
            FantasySetting::Urban => "Urban fantasy",
            FantasySetting::Steampunk => "Steampunk",
            FantasySetting::Pirate => "Pirate fantasy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FantasySetting::Medieval => "A classic medieval European fantasy world of castles and knights",
            FantasySetting::Dark => "A dark and dangerous world full of dread and despair",
            FantasySetting::High => "A world where magic is strong and common, home to mythic beings",
            FantasySetting::Urban => "Magic and wonder hidden inside a modern city",
            FantasySetting::Steampunk => "Steam engines and magic in a Victorian atmosphere",
            FantasySetting::Pirate => "Adventures across seas and islands, pirates and sea monsters",
        }
    }
}

impl fmt::Display for FantasySetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for FantasySetting {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        choose("setting", s, &Self::ALL, Self::key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CampaignLength {
    #[default]
    Short,
    Medium,
    Long,
}

impl CampaignLength {
    pub const ALL: [CampaignLength; 3] = [
        CampaignLength::Short,
        CampaignLength::Medium,
        CampaignLength::Long,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CampaignLength::Short => "short",
            CampaignLength::Medium => "medium",
            CampaignLength::Long => "long",
        }
    }
}

impl fmt::Display for CampaignLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CampaignLength {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        choose("campaign length", s, &Self::ALL, Self::key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncounterKind {
    #[default]
    Combat,
    Social,
    Exploration,
    Puzzle,
    Mixed,
}

impl EncounterKind {
    pub const ALL: [EncounterKind; 5] = [
        EncounterKind::Combat,
        EncounterKind::Social,
        EncounterKind::Exploration,
        EncounterKind::Puzzle,
        EncounterKind::Mixed,
    ];

    pub fn key(self) -> &'static str {
        match self {
            EncounterKind::Combat => "combat",
            EncounterKind::Social => "social",
            EncounterKind::Exploration => "exploration",
            EncounterKind::Puzzle => "puzzle",
            EncounterKind::Mixed => "mixed",
        }
    }
}

impl fmt::Display for EncounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EncounterKind {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        choose("encounter type", s, &Self::ALL, Self::key)
    }
}

/// What the table asked for before the first session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    pub players: u8,
    pub level: u8,
    pub setting: FantasySetting,
    pub length: CampaignLength,
    /// Write one character sheet per player before the campaign.
    pub create_characters: bool,
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self {
            players: 1,
            level: 1,
            setting: FantasySetting::default(),
            length: CampaignLength::default(),
            create_characters: true,
        }
    }
}

impl SessionSetup {
    pub fn new(players: u8, level: u8) -> Result<Self, SetupError> {
        Ok(Self {
            players: check_range("players", players, MAX_PLAYERS)?,
            level: check_range("level", level, MAX_LEVEL)?,
            ..Self::default()
        })
    }

    pub fn with_setting(mut self, setting: FantasySetting) -> Self {
        self.setting = setting;
        self
    }

    pub fn with_length(mut self, length: CampaignLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_characters(mut self, create: bool) -> Self {
        self.create_characters = create;
        self
    }

    pub fn difficulty(&self) -> &'static str {
        match self.level {
            0..=3 => "beginner friendly",
            4..=10 => "intermediate",
            _ => "advanced",
        }
    }

    pub fn audience(&self) -> &'static str {
        if self.level <= 3 {
            "a new game master"
        } else {
            "an experienced game master"
        }
    }

    pub fn play_time(&self) -> &'static str {
        match self.length {
            CampaignLength::Short => "2-3 hours",
            CampaignLength::Medium | CampaignLength::Long => "3-4 hours",
        }
    }

    /// `dnd_session_<setting>_lv<level>_<YYYYMMDD_HHMMSS>.md`
    pub fn file_name(&self, at: NaiveDateTime) -> String {
        format!(
            "dnd_session_{}_lv{}_{}.md",
            self.setting.title().replace(' ', "_"),
            self.level,
            at.format("%Y%m%d_%H%M%S")
        )
    }
}

pub fn dungeon_master() -> Agent {
    Agent::new(
        DUNGEON_MASTER_ROLE,
        "Run an exciting, immersive D&D adventure that the players enjoy",
        "A veteran dungeon master with decades of experience, known for creative \
         storytelling and fair rulings. Respects the players' choices and adapts to \
         the unexpected.",
    )
    .with_max_tokens(3000)
    .with_temperature(0.8)
}

pub fn character_creator() -> Agent {
    Agent::new(
        CHARACTER_CREATOR_ROLE,
        "Create original, balanced D&D characters that fit what the players want",
        "An expert in D&D character creation who combines classes and races to bring \
         a player's concept to life, weighing game balance and role-play fun.",
    )
    .with_max_tokens(2500)
    .with_temperature(0.7)
}

pub fn story_weaver() -> Agent {
    Agent::new(
        STORY_WEAVER_ROLE,
        "Build a consistent, gripping narrative around the players' actions and choices",
        "A writer with a vivid imagination who folds even the players' most unexpected \
         moves naturally into an immersive story.",
    )
    .with_max_tokens(3000)
    .with_temperature(0.9)
}

pub fn character_task(player: u8, setup: &SessionSetup, agent: usize) -> Task {
    Task::new(
        format!(
            "Create a D&D character for player {player}.\n\n\
             Game setup:\n\
             - Setting: {}\n\
             - Starting level: {}\n\
             - Campaign length: {}\n\n\
             Include:\n\
             1. Race and class suited to the setting\n\
             2. Ability scores (Strength, Dexterity, Constitution, Intelligence, Wisdom, Charisma)\n\
             3. A short backstory\n\
             4. Personality traits and goals\n\
             5. Starting equipment and spells, if any\n\
             6. Special skills or features\n\n\
             Pick a fitting class from:\n{}\n\n\
             Give the player a concrete personality and motivation that is easy to role-play.",
            setup.setting,
            setup.level,
            setup.length,
            class_summary()
        ),
        format!(
            "A complete character sheet for player {player} \
             (race, class, abilities, background, equipment)"
        ),
        agent,
    )
}

pub fn campaign_task(setup: &SessionSetup, agent: usize, characters: Vec<usize>) -> Task {
    let with_characters = if characters.is_empty() {
        ""
    } else {
        "\n\nDesign the adventure around the characters in the context."
    };
    Task::new(
        format!(
            "Design a {} adventure in the \"{}\" setting for level {} characters.\n\n\
             Adventure elements:\n\
             1. Main quest and goal\n\
             2. Starting area and key locations\n\
             3. Major NPCs (enemies, allies, quest givers)\n\
             4. Expected fights and challenges\n\
             5. Rewards and loot\n\
             6. Side quest ideas\n\
             7. Story hooks and twists\n\n\
             Difficulty: {}{with_characters}\n\n\
             Balance it for {} player(s). Capture the mood: {}.",
            setup.length,
            setup.setting,
            setup.level,
            setup.difficulty(),
            setup.players,
            setup.setting.description()
        ),
        format!(
            "A {} {} adventure scenario (quests, locations, NPCs, fights, rewards)",
            setup.length, setup.setting
        ),
        agent,
    )
    .with_context(characters)
}

pub fn session_guide_task(setup: &SessionSetup, agent: usize, campaign: usize) -> Task {
    Task::new(
        format!(
            "Write a detailed game master's guide for the first session of the campaign \
             in the context.\n\n\
             Guide contents:\n\
             1. Session overview and goals\n\
             2. Opening scenario\n\
             3. Key scenes and the order of events\n\
             4. Sample NPC dialogue\n\
             5. Combat encounter details\n\
             6. Likely player choices and how to respond\n\
             7. Rules that will come up often\n\
             8. Tips for improvising\n\
             9. Wrapping up and hooks for the next session\n\n\
             Audience: {}\n\
             Expected play time: {}\n\n\
             Make it concrete enough to run at the table as written.",
            setup.audience(),
            setup.play_time()
        ),
        "A complete guide for the first session (scenario, dialogue, fights, rules)",
        agent,
    )
    .with_context(vec![campaign])
}

pub fn encounter_task(kind: EncounterKind, level: u8, agent: usize) -> Task {
    Task::new(
        format!(
            "Create a {kind} encounter for a level {level} party.\n\n\
             Include:\n\
             1. Setting and background\n\
             2. Goal and success conditions\n\
             3. Enemies or obstacles\n\
             4. Required rolls and DCs\n\
             5. Possible outcomes\n\
             6. Rewards and follow-up hooks\n\n\
             Keep it balanced and fun."
        ),
        format!("A {kind} encounter for a level {level} party (setup, rules, rewards)"),
        agent,
    )
}

/// Everything prepared for the first session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrep {
    pub setup: SessionSetup,
    pub characters: Vec<String>,
    pub campaign: String,
    pub session_guide: String,
}

impl SessionPrep {
    pub fn render(&self, at: NaiveDateTime) -> String {
        let setup = &self.setup;
        let mut text = format!(
            "# D&D session notes\n\n\
             - **Created:** {}\n\
             - **Players:** {}\n\
             - **Setting:** {}\n\
             - **Starting level:** {}\n\
             - **Campaign length:** {}\n\n\
             ---\n\n",
            at.format("%Y-%m-%d %H:%M:%S"),
            setup.players,
            setup.setting,
            setup.level,
            setup.length
        );
        if !self.characters.is_empty() {
            text.push_str("## Player characters\n\n");
            text.push_str(&self.characters.join("\n\n"));
            text.push_str("\n\n---\n\n");
        }
        text.push_str("## Campaign\n\n");
        text.push_str(&self.campaign);
        text.push_str("\n\n---\n\n## Session guide\n\n");
        text.push_str(&self.session_guide);
        text.push('\n');
        text
    }

    /// Write the notes into `dir`, creating it if needed.
    pub async fn save(&self, dir: &Path) -> Result<PathBuf, SetupError> {
        let now = chrono::Local::now().naive_local();
        let path = dir.join(self.setup.file_name(now));
        let write_error = |source: std::io::Error| SetupError::Write {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(write_error)?;
        tokio::fs::write(&path, self.render(now))
            .await
            .map_err(write_error)?;

        info!(path = %path.display(), "session notes saved");
        Ok(path)
    }
}

/// Runs the preparation and encounter crews.
pub struct SessionPlanner {
    backend: Arc<dyn ChatBackend>,
    time_limit: Duration,
}

impl SessionPlanner {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            time_limit: Duration::from_secs(DEFAULT_SETUP_SECS),
        }
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Character tasks first, then the campaign fed with every sheet, then
    /// the guide fed with the campaign.
    pub fn build(&self, setup: &SessionSetup) -> Crew {
        let mut crew = Crew::new(self.backend.clone()).with_time_limit(self.time_limit);

        let mut tasks = Vec::new();
        if setup.create_characters {
            let creator = crew.add_agent(character_creator());
            for player in 1..=setup.players {
                tasks.push(character_task(player, setup, creator));
            }
        }
        let characters: Vec<usize> = (0..tasks.len()).collect();

        let dm = crew.add_agent(dungeon_master());
        let weaver = crew.add_agent(story_weaver());
        tasks.push(campaign_task(setup, dm, characters));
        let campaign = tasks.len() - 1;
        tasks.push(session_guide_task(setup, weaver, campaign));

        crew.set_tasks(tasks);
        crew
    }

    pub async fn prepare(
        &self,
        setup: &SessionSetup,
        cancel: &CancellationToken,
    ) -> Result<SessionPrep, SetupError> {
        info!(
            players = setup.players,
            level = setup.level,
            setting = setup.setting.key(),
            "preparing session"
        );
        let mut outputs = self.build(setup).kickoff(cancel).await?.tasks_output;

        let session_guide = outputs.pop().map(|o| o.raw).unwrap_or_default();
        let campaign = outputs.pop().map(|o| o.raw).unwrap_or_default();
        if campaign.is_empty() {
            return Err(SetupError::EmptyOutput("campaign"));
        }
        if session_guide.is_empty() {
            return Err(SetupError::EmptyOutput("session guide"));
        }
        let characters = outputs.into_iter().map(|o| o.raw).collect();

        info!("session prepared");
        Ok(SessionPrep {
            setup: setup.clone(),
            characters,
            campaign,
            session_guide,
        })
    }

    /// A single encounter written by the dungeon master.
    pub async fn quick_encounter(
        &self,
        kind: EncounterKind,
        level: u8,
        cancel: &CancellationToken,
    ) -> Result<String, SetupError> {
        let level = check_range("level", level, MAX_LEVEL)?;
        info!(kind = kind.key(), level, "creating encounter");

        let mut crew = Crew::new(self.backend.clone()).with_time_limit(self.time_limit);
        let dm = crew.add_agent(dungeon_master());
        crew.set_tasks(vec![encounter_task(kind, level, dm)]);

        let encounter = crew.kickoff(cancel).await?.raw().to_string();
        if encounter.is_empty() {
            return Err(SetupError::EmptyOutput("encounter"));
        }
        Ok(encounter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_setup_ranges() {
        assert!(SessionSetup::new(6, 20).is_ok());
        assert!(matches!(
            SessionSetup::new(0, 1),
            Err(SetupError::OutOfRange { name: "players", .. })
        ));
        assert!(matches!(
            SessionSetup::new(7, 1),
            Err(SetupError::OutOfRange { name: "players", .. })
        ));
        assert!(matches!(
            SessionSetup::new(1, 21),
            Err(SetupError::OutOfRange { name: "level", max: 20, .. })
        ));
    }

    #[test]
    fn test_parse_choices() {
        assert_eq!("Steampunk".parse::<FantasySetting>().unwrap(), FantasySetting::Steampunk);
        assert_eq!(" PIRATE ".parse::<FantasySetting>().unwrap(), FantasySetting::Pirate);
        assert_eq!("long".parse::<CampaignLength>().unwrap(), CampaignLength::Long);
        assert_eq!("Social".parse::<EncounterKind>().unwrap(), EncounterKind::Social);

        let err = "space".parse::<FantasySetting>().unwrap_err();
        assert_eq!(err.kind, "setting");
        assert!(err.to_string().contains("medieval, dark, high"));
    }

    #[test]
    fn test_level_bands() {
        let low = SessionSetup::new(1, 3).unwrap();
        let mid = SessionSetup::new(1, 10).unwrap();
        let high = SessionSetup::new(1, 11).unwrap().with_length(CampaignLength::Long);

        assert_eq!(low.difficulty(), "beginner friendly");
        assert_eq!(mid.difficulty(), "intermediate");
        assert_eq!(high.difficulty(), "advanced");
        assert_eq!(low.audience(), "a new game master");
        assert_eq!(mid.audience(), "an experienced game master");
        assert_eq!(low.play_time(), "2-3 hours");
        assert_eq!(high.play_time(), "3-4 hours");
    }

    #[test]
    fn test_file_name() {
        let setup = SessionSetup::new(2, 5)
            .unwrap()
            .with_setting(FantasySetting::Dark);
        assert_eq!(setup.file_name(at()), "dnd_session_Dark_fantasy_lv5_20250601_093000.md");
    }

    #[test]
    fn test_character_task_lists_classes() {
        let task = character_task(2, &SessionSetup::default(), 0);
        assert!(task.description.starts_with("Create a D&D character for player 2."));
        for class in CHARACTER_CLASSES {
            assert!(task.description.contains(class.name));
        }
    }

    #[test]
    fn test_render_without_characters() {
        let prep = SessionPrep {
            setup: SessionSetup::default().with_characters(false),
            characters: Vec::new(),
            campaign: "The lost mine".to_string(),
            session_guide: "Start at the inn".to_string(),
        };
        let text = prep.render(at());
        assert!(text.starts_with("# D&D session notes\n\n- **Created:** 2025-06-01 09:30:00\n"));
        assert!(text.contains("- **Setting:** Medieval fantasy\n"));
        assert!(!text.contains("## Player characters"));
        assert!(text.contains("## Campaign\n\nThe lost mine"));
        assert!(text.ends_with("## Session guide\n\nStart at the inn\n"));
    }
}
