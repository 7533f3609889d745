use courtkeeper_engine::models::{PlayerState, Sex};
use courtkeeper_engine::services::changelog::{self, ChangeAction};
use courtkeeper_engine::{Tournament, TournamentSettings};

async fn logged_tournament() -> Tournament {
    let tournament = Tournament::open("sqlite::memory:")
        .await
        .expect("in-memory database");
    tournament.enable_change_log().await.expect("enable log");
    tournament
        .register(&TournamentSettings {
            name: "Logged Open".to_string(),
            organizer: "Test Club".to_string(),
            date: "2026-08-01".to_string(),
            use_teams: false,
        })
        .await
        .expect("register");
    tournament
}

// ============================================================================
// Capture
// ============================================================================

#[tokio::test]
async fn test_disabled_by_default() {
    let tournament = Tournament::open("sqlite::memory:").await.unwrap();
    assert!(!tournament.change_log_enabled().await.unwrap());
    tournament
        .create_player("Lone", "Wolf", Sex::Male, None)
        .await
        .unwrap();
    assert!(tournament.change_log().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_every_row_change_is_captured_in_order() {
    let tournament = logged_tournament().await;
    let player = tournament
        .create_player("Kurt", "Keeper", Sex::Male, None)
        .await
        .unwrap();
    tournament.register_player(player.id).await.unwrap();

    let entries: Vec<_> = tournament
        .change_log()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.table_name == "player" && e.row_id == player.id)
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].action, ChangeAction::Insert);
    assert_eq!(entries[1].action, ChangeAction::Update);
    assert!(entries[0].seq < entries[1].seq);
    assert!(entries[1]
        .snapshot
        .as_deref()
        .unwrap()
        .contains("\"state\":\"idle\""));
}

// ============================================================================
// Compaction (the unit of partial sync)
// ============================================================================

#[tokio::test]
async fn test_insert_update_update_delete_compacts_to_nothing() {
    let tournament = logged_tournament().await;
    let player = tournament
        .create_player("Flora", "Fleeting", Sex::Female, None)
        .await
        .unwrap();
    tournament.register_player(player.id).await.unwrap();
    tournament.unregister_player(player.id).await.unwrap();
    tournament.delete_player(player.id).await.unwrap();

    let compacted = tournament.compacted_change_log().await.unwrap();
    assert!(
        !compacted
            .iter()
            .any(|e| e.table_name == "player" && e.row_id == player.id),
        "a row born and destroyed inside the log leaves no trace"
    );
}

#[tokio::test]
async fn test_insert_then_update_compacts_to_one_insert_with_latest_values() {
    let tournament = logged_tournament().await;
    let player = tournament
        .create_player("Paula", "Persist", Sex::Female, None)
        .await
        .unwrap();
    tournament.register_player(player.id).await.unwrap();

    let compacted: Vec<_> = tournament
        .compacted_change_log()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.table_name == "player" && e.row_id == player.id)
        .collect();

    assert_eq!(compacted.len(), 1);
    assert_eq!(compacted[0].action, ChangeAction::Insert);
    assert!(
        compacted[0]
            .snapshot
            .as_deref()
            .unwrap()
            .contains("\"state\":\"idle\""),
        "the surviving insert carries the newest values"
    );
}

#[tokio::test]
async fn test_multiple_updates_keep_only_the_last() {
    let tournament = logged_tournament().await;
    // the tournament name is updated twice on the same config row
    tournament.set_config("TnmtName", "First Rename").await.unwrap();
    tournament.set_config("TnmtName", "Final Name").await.unwrap();

    let raw: Vec<_> = tournament
        .change_log()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| {
            e.table_name == "config"
                && e.snapshot.as_deref().is_some_and(|s| s.contains("TnmtName"))
        })
        .collect();
    assert!(raw.len() >= 3, "insert plus two updates were captured");

    let compacted: Vec<_> = changelog::compact(&tournament.change_log().await.unwrap())
        .into_iter()
        .filter(|e| {
            e.table_name == "config"
                && e.snapshot.as_deref().is_some_and(|s| s.contains("TnmtName"))
        })
        .collect();
    assert_eq!(compacted.len(), 1);
    assert!(compacted[0]
        .snapshot
        .as_deref()
        .unwrap()
        .contains("Final Name"));
}

// ============================================================================
// Replay
// ============================================================================

#[tokio::test]
async fn test_replayed_log_reproduces_the_database() {
    let source = logged_tournament().await;

    let anna = source
        .create_player("Anna", "Aufschlag", Sex::Female, None)
        .await
        .unwrap();
    let bernd = source
        .create_player("Bernd", "Block", Sex::Male, None)
        .await
        .unwrap();
    source.register_player(anna.id).await.unwrap();
    source.register_player(bernd.id).await.unwrap();

    let category = source.create_category("Mixed Fun").await.unwrap();
    source
        .add_player_to_category(category.id, anna.id)
        .await
        .unwrap();

    // replay the compacted log onto a fresh, empty schema
    let compacted = source.compacted_change_log().await.unwrap();
    let target = Tournament::open("sqlite::memory:").await.unwrap();
    {
        let mut conn = target.pool().acquire().await.unwrap();
        changelog::replay(&mut conn, &compacted).await.unwrap();
    }

    async fn dump_players(t: &Tournament) -> Vec<(i64, String, String, PlayerState, i64)> {
        t.players()
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.first_name, p.last_name, p.state, p.seq_num))
            .collect::<Vec<_>>()
    }
    assert_eq!(dump_players(&source).await, dump_players(&target).await);

    let source_categories: Vec<_> = source
        .categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.id, c.name, c.state))
        .collect();
    let target_categories: Vec<_> = target
        .categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.id, c.name, c.state))
        .collect();
    assert_eq!(source_categories, target_categories);

    assert_eq!(
        source.get_config("TnmtName").await.unwrap(),
        target.get_config("TnmtName").await.unwrap()
    );
}
