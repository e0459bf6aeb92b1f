//! Session preparation crews against a scripted model backend.

use crew::testing::ScriptedBackend;
use crew::{CancellationToken, CrewError};
use dnd_core::setup::{CHARACTER_CREATOR_ROLE, DUNGEON_MASTER_ROLE, STORY_WEAVER_ROLE};
use dnd_core::{
    CampaignLength, EncounterKind, FantasySetting, SessionPlanner, SessionSetup, SetupError,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_prepare_feeds_characters_into_campaign() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_text("Aria, elf ranger")
            .with_text("Borin, dwarf cleric")
            .with_text("The Sunken Keep")
            .with_text("Open at the harbour"),
    );
    let setup = SessionSetup::new(2, 4)
        .unwrap()
        .with_setting(FantasySetting::Pirate)
        .with_length(CampaignLength::Medium);
    let planner = SessionPlanner::new(backend.clone());

    let prep = planner.prepare(&setup, &CancellationToken::new()).await.unwrap();

    assert_eq!(prep.characters, vec!["Aria, elf ranger", "Borin, dwarf cleric"]);
    assert_eq!(prep.campaign, "The Sunken Keep");
    assert_eq!(prep.session_guide, "Open at the harbour");

    let requests = backend.requests();
    assert_eq!(requests.len(), 4);
    assert!(format!("{:?}", requests[0].system).contains(CHARACTER_CREATOR_ROLE));
    assert!(format!("{:?}", requests[2].system).contains(DUNGEON_MASTER_ROLE));
    assert!(format!("{:?}", requests[3].system).contains(STORY_WEAVER_ROLE));

    let campaign_prompt = format!("{:?}", requests[2].messages);
    assert!(campaign_prompt.contains("Aria, elf ranger"));
    assert!(campaign_prompt.contains("Borin, dwarf cleric"));
    assert!(campaign_prompt.contains("Balance it for 2 player(s)"));
    let guide_prompt = format!("{:?}", requests[3].messages);
    assert!(guide_prompt.contains("The Sunken Keep"));
    assert!(!guide_prompt.contains("Aria, elf ranger"));
    assert!(guide_prompt.contains("3-4 hours"));
}

#[tokio::test]
async fn test_prepare_without_characters() {
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_text("The Haunted Mill")
            .with_text("Start in the village"),
    );
    let setup = SessionSetup::default().with_characters(false);
    let planner = SessionPlanner::new(backend.clone());

    let prep = planner.prepare(&setup, &CancellationToken::new()).await.unwrap();

    assert!(prep.characters.is_empty());
    assert_eq!(prep.campaign, "The Haunted Mill");
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn test_empty_guide_is_an_error() {
    let backend = Arc::new(ScriptedBackend::new().with_text("Campaign").with_text("  "));
    let setup = SessionSetup::default().with_characters(false);

    let err = SessionPlanner::new(backend)
        .prepare(&setup, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::EmptyOutput("session guide")));
}

#[tokio::test]
async fn test_connection_failure_is_reported() {
    let backend = Arc::new(
        ScriptedBackend::new().with_error(llm::Error::Connection("refused".to_string())),
    );

    let err = SessionPlanner::new(backend)
        .prepare(&SessionSetup::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_time_limit() {
    struct Stalled;

    #[async_trait::async_trait]
    impl crew::ChatBackend for Stalled {
        async fn complete(
            &self,
            _request: llm::Request,
            _cancel: &CancellationToken,
        ) -> Result<llm::Response, llm::Error> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(llm::Error::Cancelled)
        }

        fn model(&self) -> &str {
            "stalled"
        }
    }

    let err = SessionPlanner::new(Arc::new(Stalled))
        .with_time_limit(Duration::from_millis(50))
        .quick_encounter(EncounterKind::Combat, 3, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::Crew(CrewError::TimeLimit(_))));
}

#[tokio::test]
async fn test_quick_encounter() {
    let backend = Arc::new(ScriptedBackend::new().with_text("  A riddle at the bridge.  "));
    let planner = SessionPlanner::new(backend.clone());

    let encounter = planner
        .quick_encounter(EncounterKind::Puzzle, 7, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(encounter, "A riddle at the bridge.");
    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let prompt = format!("{:?}", requests[0].messages);
    assert!(prompt.contains("Create a puzzle encounter for a level 7 party."));
    assert_eq!(requests[0].temperature, Some(0.8));
}

#[tokio::test]
async fn test_quick_encounter_level_checked() {
    let backend = Arc::new(ScriptedBackend::new());
    let err = SessionPlanner::new(backend.clone())
        .quick_encounter(EncounterKind::Combat, 0, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, SetupError::OutOfRange { name: "level", .. }));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_save_session_notes() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(
        ScriptedBackend::new()
            .with_text("Kael, human fighter")
            .with_text("Clockwork heist")
            .with_text("Begin at the airship dock"),
    );
    let setup = SessionSetup::new(1, 2)
        .unwrap()
        .with_setting(FantasySetting::Steampunk);

    let prep = SessionPlanner::new(backend)
        .prepare(&setup, &CancellationToken::new())
        .await
        .unwrap();
    let path = prep.save(&dir.path().join("notes")).await.unwrap();

    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("dnd_session_Steampunk_lv2_"));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("## Player characters\n\nKael, human fighter"));
    assert!(text.contains("## Campaign\n\nClockwork heist"));
    assert!(text.contains("## Session guide\n\nBegin at the airship dock"));
}
