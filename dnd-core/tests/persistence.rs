//! Save/load and concurrency tests for the game state store.

use dnd_core::{Character, GameStateStore, StoreError};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn store() -> (TempDir, GameStateStore) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = GameStateStore::new(temp_dir.path()).expect("Failed to create store");
    (temp_dir, store)
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let (_dir, store) = store();
    store.add_character(Character::new("Thorin").with_abilities([16, 10, 14, 8, 12, 10]));
    store.add_character(Character::new("Mira").with_hp(7, 12));
    store.update_context("The party rests at the Golden Dragon.");
    store.set_scene("Greenhill village inn");

    let before = store.snapshot();
    assert!(store.save(Some("round_trip.json")).await);

    // Diverge, then restore
    store.update_context("Something else entirely.");
    store.add_character(Character::new("Intruder"));

    assert!(store.load("round_trip.json").await);
    let after = store.snapshot();

    assert_eq!(after, before);
    assert_eq!(after.active_characters.len(), 2);
    assert_eq!(after.active_characters[1].hp, 7);
    assert_eq!(store.context(), "The party rests at the Golden Dragon.");
}

#[tokio::test]
async fn test_load_clamps_hit_points() {
    let (dir, store) = store();
    std::fs::write(
        dir.path().join("edited.json"),
        r#"{"active_characters": [
            {"name": "Bo", "hp": 50},
            {"name": "Cy", "hp": -7},
            {"name": "Di", "hp": 4, "max_hp": -3}
        ]}"#,
    )
    .unwrap();

    assert!(store.load("edited.json").await);

    let bo = store.character("Bo").unwrap();
    assert_eq!((bo.hp, bo.max_hp), (10, 10));
    let cy = store.character("Cy").unwrap();
    assert_eq!((cy.hp, cy.max_hp), (0, 10));
    let di = store.character("Di").unwrap();
    assert_eq!((di.hp, di.max_hp), (0, 0));
}

#[tokio::test]
async fn test_load_tells_missing_from_corrupt() {
    let (dir, store) = store();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    assert!(matches!(
        store.try_load("absent.json").await,
        Err(StoreError::NotFound(_))
    ));
    assert!(matches!(
        store.try_load("broken.json").await,
        Err(StoreError::Json(_))
    ));
    assert!(!store.load("broken.json").await);
}

#[tokio::test]
async fn test_save_name_gets_extension() {
    let (dir, store) = store();
    let name = store.save_named(Some("campaign")).await.unwrap();
    assert_eq!(name, "campaign.json");
    assert!(dir.path().join("campaign.json").exists());
    assert!(store.load("campaign").await);
}

#[tokio::test]
async fn test_list_saves_newest_first() {
    let (dir, store) = store();
    assert!(store.list_saves().await.is_empty());

    assert!(store.save(Some("save_20240101_120000.json")).await);
    assert!(store.save(Some("save_20250101_120000.json")).await);
    std::fs::write(dir.path().join("notes.txt"), "not a save").unwrap();

    assert_eq!(
        store.list_saves().await,
        vec!["save_20250101_120000.json", "save_20240101_120000.json"]
    );
}

#[tokio::test]
async fn test_load_ignores_unknown_fields_and_fills_defaults() {
    let (dir, store) = store();
    let raw = r#"{
        "current_scene": "Cave mouth",
        "active_characters": [{"name": "Bo", "hp": 4}],
        "game_context": "Dripping water.",
        "save_timestamp": "2024-05-01T10:00:00",
        "created_at": "2024-05-01T09:00:00",
        "last_updated": "2024-05-01T09:30:00",
        "future_field": true
    }"#;
    std::fs::write(dir.path().join("old.json"), raw).unwrap();

    assert!(store.load("old.json").await);
    let state = store.snapshot();
    assert_eq!(state.current_scene, "Cave mouth");
    assert_eq!(state.active_characters[0].max_hp, 10);
    assert!(state.session_log.is_empty());
    assert_eq!(store.context(), "Dripping water.");
}

#[tokio::test]
async fn test_character_without_name_fails_to_load() {
    let (dir, store) = store();
    std::fs::write(
        dir.path().join("broken.json"),
        r#"{"active_characters": [{"hp": 4}]}"#,
    )
    .unwrap();

    store.update_context("unchanged");
    assert!(!store.load("broken.json").await);
    assert_eq!(store.context(), "unchanged");
}

#[test]
fn test_concurrent_add_character() {
    let (_dir, store) = store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    store.add_character(Character::new(format!("hero-{t}-{i}")));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let state = store.snapshot();
    assert_eq!(state.active_characters.len(), 16 * 25);
    assert!(store.character("HERO-15-24").is_some());
}

#[test]
fn test_last_updated_never_goes_backwards() {
    let (_dir, store) = store();
    let mut previous = store.snapshot().last_updated;
    for i in 0..50 {
        store.update_context(&format!("step {i}"));
        let current = store.snapshot().last_updated;
        assert!(current >= previous);
        previous = current;
    }
    assert_eq!(store.snapshot().session_log.len(), 50);
}
