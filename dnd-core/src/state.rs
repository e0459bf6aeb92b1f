//! Game state and its thread-safe store.
//!
//! One [`GameStateStore`] owns the [`GameState`] behind a mutex and is
//! shared as an `Arc` by the engine and the game tools. Saves are
//! pretty-printed JSON files in the store's saves directory.

use crate::character::Character;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, warn};

pub const DEFAULT_SAVES_DIR: &str = "saves";
pub const DEFAULT_SCENE: &str = "Starting point";

/// Errors from save/load operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid save file name: {0:?}")]
    InvalidName(String),

    #[error("Save file not found: {0}")]
    NotFound(PathBuf),
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn default_scene() -> String {
    DEFAULT_SCENE.to_string()
}

/// Everything that makes up a running game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default = "default_scene")]
    pub current_scene: String,
    #[serde(default)]
    pub active_characters: Vec<Character>,
    /// Entries formatted as `[HH:MM:SS] text`.
    #[serde(default)]
    pub session_log: Vec<String>,
    #[serde(default)]
    pub turn_order: Vec<String>,
    #[serde(default)]
    pub game_context: String,
    #[serde(default = "now")]
    pub created_at: NaiveDateTime,
    #[serde(default = "now")]
    pub last_updated: NaiveDateTime,
}

impl Default for GameState {
    fn default() -> Self {
        let created = now();
        Self {
            current_scene: default_scene(),
            active_characters: Vec::new(),
            session_log: Vec::new(),
            turn_order: Vec::new(),
            game_context: String::new(),
            created_at: created,
            last_updated: created,
        }
    }
}

impl GameState {
    /// Advance `last_updated`, never moving it backwards.
    fn touch(&mut self) {
        self.last_updated = self.last_updated.max(now());
    }
}

/// On-disk layout: the state's fields plus the save time.
#[derive(Serialize)]
struct SaveFile<'a> {
    #[serde(flatten)]
    state: &'a GameState,
    save_timestamp: NaiveDateTime,
}

/// Shared, lock-protected owner of the game state.
pub struct GameStateStore {
    state: Mutex<GameState>,
    saves_dir: PathBuf,
}

impl GameStateStore {
    /// Create a store with a fresh state, creating `saves_dir` if needed.
    pub fn new(saves_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let saves_dir = saves_dir.into();
        std::fs::create_dir_all(&saves_dir)?;
        Ok(Self {
            state: Mutex::new(GameState::default()),
            saves_dir,
        })
    }

    pub fn saves_dir(&self) -> &Path {
        &self.saves_dir
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the game context and append it to the session log.
    pub fn update_context(&self, text: &str) {
        let mut state = self.lock();
        state.game_context = text.to_string();
        state
            .session_log
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), text));
        state.touch();
        let preview: String = text.chars().take(100).collect();
        info!(context = %preview, "game context updated");
    }

    pub fn context(&self) -> String {
        self.lock().game_context.clone()
    }

    pub fn set_scene(&self, scene: &str) {
        let mut state = self.lock();
        state.current_scene = scene.to_string();
        state.touch();
    }

    pub fn add_character(&self, character: Character) {
        let mut state = self.lock();
        info!(name = %character.name, "character added");
        state.turn_order.push(character.name.clone());
        state.active_characters.push(character);
        state.touch();
    }

    /// Look up a character by name, ignoring case.
    pub fn character(&self, name: &str) -> Option<Character> {
        self.lock()
            .active_characters
            .iter()
            .find(|c| c.name.to_lowercase() == name.to_lowercase())
            .cloned()
    }

    /// Apply `f` to the named character under the lock. Returns whether the
    /// character exists.
    pub fn update_character<F>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce(&mut Character),
    {
        let mut state = self.lock();
        let found = state
            .active_characters
            .iter_mut()
            .find(|c| c.name.to_lowercase() == name.to_lowercase());
        match found {
            Some(character) => {
                f(character);
                state.touch();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> GameState {
        self.lock().clone()
    }

    /// Save to `filename`, or to a timestamped name when `None`.
    pub async fn save(&self, filename: Option<&str>) -> bool {
        self.save_named(filename).await.is_some()
    }

    /// Like [`save`](Self::save), returning the file name actually written.
    pub async fn save_named(&self, filename: Option<&str>) -> Option<String> {
        match self.try_save(filename).await {
            Ok(name) => Some(name),
            Err(e) => {
                error!(error = %e, "failed to save game");
                None
            }
        }
    }

    async fn try_save(&self, filename: Option<&str>) -> Result<String, StoreError> {
        let name = match filename {
            Some(name) => save_file_name(name)?,
            None => format!("save_{}.json", Local::now().format("%Y%m%d_%H%M%S")),
        };
        let path = self.saves_dir.join(&name);

        let content = {
            let state = self.lock();
            serde_json::to_string_pretty(&SaveFile {
                state: &state,
                save_timestamp: now(),
            })?
        };

        fs::write(&path, content).await?;
        info!(path = %path.display(), "game saved");
        Ok(name)
    }

    /// Replace the state with the contents of `filename`.
    pub async fn load(&self, filename: &str) -> bool {
        match self.try_load(filename).await {
            Ok(path) => {
                info!(path = %path.display(), "game loaded");
                true
            }
            Err(StoreError::NotFound(path)) => {
                warn!(path = %path.display(), "save file not found");
                false
            }
            Err(e) => {
                error!(error = %e, "failed to load game");
                false
            }
        }
    }

    /// Like [`load`](Self::load), but reports why loading failed.
    pub async fn try_load(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let path = self.saves_dir.join(save_file_name(filename)?);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        let mut loaded: GameState = serde_json::from_str(&content)?;
        for character in &mut loaded.active_characters {
            character.clamp_hp();
        }
        *self.lock() = loaded;
        Ok(path)
    }

    /// Names of the `.json` files in the saves directory, newest first.
    pub async fn list_saves(&self) -> Vec<String> {
        match self.try_list_saves().await {
            Ok(saves) => saves,
            Err(e) => {
                error!(error = %e, "failed to list saves");
                Vec::new()
            }
        }
    }

    async fn try_list_saves(&self) -> Result<Vec<String>, StoreError> {
        let mut saves = Vec::new();
        let mut entries = fs::read_dir(&self.saves_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(name) = path.file_name() {
                    saves.push(name.to_string_lossy().to_string());
                }
            }
        }

        saves.sort_by(|a, b| b.cmp(a));
        Ok(saves)
    }
}

/// Validate a user-supplied save name and add `.json` when it has no
/// extension. Names that could escape the saves directory are refused.
pub fn save_file_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }

    if Path::new(name).extension().is_some() {
        Ok(name.to_string())
    } else {
        Ok(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let saves = dir.path().join("nested").join("saves");
        let store = GameStateStore::new(&saves).unwrap();
        assert!(saves.is_dir());
        assert_eq!(store.snapshot().current_scene, DEFAULT_SCENE);
    }

    #[test]
    fn test_update_context_logs() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        let before = store.snapshot().last_updated;

        store.update_context("The inn is quiet.");

        let state = store.snapshot();
        assert_eq!(store.context(), "The inn is quiet.");
        assert_eq!(state.session_log.len(), 1);
        let entry = &state.session_log[0];
        assert!(entry.starts_with('['));
        assert_eq!(&entry[9..], "] The inn is quiet.");
        assert!(state.last_updated >= before);
    }

    #[test]
    fn test_character_lookup_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        store.add_character(Character::new("Adventurer"));

        assert!(store.character("adventurer").is_some());
        assert!(store.character("ADVENTURER").is_some());
        assert!(store.character("Goblin").is_none());
    }

    #[test]
    fn test_update_character() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        store.add_character(Character::new("Mira"));

        assert!(store.update_character("mira", |c| c.take_damage(4)));
        assert_eq!(store.character("Mira").unwrap().hp, 6);
        assert!(!store.update_character("nobody", |c| c.heal(1)));
    }

    #[test]
    fn test_save_file_name() {
        assert_eq!(save_file_name("quest").unwrap(), "quest.json");
        assert_eq!(save_file_name("quest.json").unwrap(), "quest.json");
        assert!(save_file_name("../etc/passwd").is_err());
        assert!(save_file_name("a/b.json").is_err());
        assert!(save_file_name("a\\b.json").is_err());
        assert!(save_file_name("   ").is_err());
    }

    #[tokio::test]
    async fn test_load_missing_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        assert!(!store.load("nope.json").await);
    }

    #[tokio::test]
    async fn test_load_corrupt_is_false() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        store.update_context("kept");

        assert!(!store.load("bad.json").await);
        assert_eq!(store.context(), "kept");
    }

    #[tokio::test]
    async fn test_save_refuses_escape() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        assert!(!store.save(Some("../outside.json")).await);
    }

    #[tokio::test]
    async fn test_save_file_has_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = GameStateStore::new(dir.path()).unwrap();
        let name = store.save_named(None).await.unwrap();
        assert!(name.starts_with("save_") && name.ends_with(".json"));

        let raw = std::fs::read_to_string(dir.path().join(&name)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("save_timestamp").is_some());
        assert_eq!(value["current_scene"], DEFAULT_SCENE);
    }
}
