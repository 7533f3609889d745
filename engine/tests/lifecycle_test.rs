mod common;

use common::{
    find_match, frozen_singles_category, make_players, matches_in_round, open_tournament,
    play_match,
};
use courtkeeper_engine::models::{CategoryState, MatchState, MatchSystem, PlayerState};
use courtkeeper_engine::score::MatchScore;
use courtkeeper_engine::Error;

// ============================================================================
// Scenario: three-player round robin, one iteration
// ============================================================================

#[tokio::test]
async fn test_three_player_round_robin_end_to_end() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "MS", MatchSystem::RoundRobin, 3).await;
    let (x, y, z) = (pairs[0], pairs[1], pairs[2]);

    // no seeding needed: round robin starts straight from Frozen
    tournament.start_first_round(category.id).await.expect("start");
    assert_eq!(
        tournament.category(category.id).await.unwrap().state,
        CategoryState::Playing
    );
    assert_eq!(tournament.total_rounds(category.id).await.unwrap(), 3);

    // three rounds with one match each; X beats everyone, Y beats Z
    for round in 1..=3 {
        let round_matches = matches_in_round(&tournament, category.id, round).await;
        assert_eq!(round_matches.len(), 1, "odd field plays one match per round");
        let ma = &round_matches[0];
        let contenders = [ma.pair1_id.unwrap(), ma.pair2_id.unwrap()];
        let winner = if contenders.contains(&x) { x } else { y };
        play_match(&tournament, ma, winner, &[(21, 15), (21, 12)]).await;
    }

    let category = tournament.category(category.id).await.unwrap();
    assert_eq!(category.state, CategoryState::Finalized);

    let standings = tournament.standings(category.id, 3).await.unwrap();
    assert_eq!(standings.len(), 3);

    let expectations = [(x, 1, (2, 0, 0)), (y, 2, (1, 0, 1)), (z, 3, (0, 0, 2))];
    for (pair, rank, (won, drawn, lost)) in expectations {
        let entry = standings.iter().find(|e| e.pair_id == pair).expect("entry");
        assert_eq!(entry.rank, Some(rank), "rank of pair {pair}");
        assert_eq!(
            (entry.matches_won, entry.matches_drawn, entry.matches_lost),
            (won, drawn, lost),
            "match stats of pair {pair}"
        );
    }

    // multiset of played pairings is all C(3,2) combinations once
    let all_matches = tournament.matches(category.id).await.unwrap();
    assert_eq!(all_matches.len(), 3);
    assert!(all_matches.iter().all(|m| m.state == MatchState::Finished));
}

// ============================================================================
// Scenario: four-player single elimination with third place
// ============================================================================

#[tokio::test]
async fn test_four_player_single_elim_end_to_end() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "Elim", MatchSystem::SingleElim, 4).await;
    let (a, b, c, d) = (pairs[0], pairs[1], pairs[2], pairs[3]);

    tournament
        .apply_seeding(category.id, &[a, b, c, d])
        .await
        .expect("seeding");
    tournament.start_first_round(category.id).await.expect("start");
    assert_eq!(tournament.total_rounds(category.id).await.unwrap(), 2);

    // round 1: semifinals 1v4 and 2v3
    let semi1 = find_match(&tournament, category.id, 1, a, d).await;
    let semi2 = find_match(&tournament, category.id, 1, b, c).await;
    assert_eq!(semi1.state, MatchState::Ready);
    assert_eq!(semi2.state, MatchState::Ready);

    // players on court are busy, the other semi stays callable
    tournament.call_match(semi1.id).await.expect("call semi 1");
    assert!(matches!(
        tournament.call_match(semi1.id).await,
        Err(Error::WrongState)
    ));
    tournament
        .record_match_score(
            semi1.id,
            &MatchScore::Games(vec![(21, 15), (21, 17)]),
            false,
        )
        .await
        .expect("A beats D");
    play_match(&tournament, &semi2, b, &[(21, 18), (21, 16)]).await;

    // the semifinal results resolved the final and the third-place match
    let final_match = find_match(&tournament, category.id, 2, a, b).await;
    let third_place = find_match(&tournament, category.id, 2, d, c).await;
    assert_eq!(final_match.winner_rank, Some(1));
    assert_eq!(final_match.loser_rank, Some(2));
    assert_eq!(third_place.winner_rank, Some(3));
    assert_eq!(third_place.loser_rank, Some(4));

    // the final carries the highest match number of the category
    let max_num = tournament
        .matches(category.id)
        .await
        .unwrap()
        .iter()
        .filter_map(|m| m.match_num)
        .max()
        .unwrap();
    assert_eq!(final_match.match_num, Some(max_num));

    play_match(&tournament, &final_match, a, &[(21, 12), (21, 14)]).await;
    play_match(&tournament, &third_place, d, &[(21, 19), (21, 11)]).await;

    let category_row = tournament.category(category.id).await.unwrap();
    assert_eq!(category_row.state, CategoryState::Finalized);

    // final placement: A, B, D, C
    let standings = tournament.standings(category.id, 2).await.unwrap();
    let rank_of = |pair: i64| {
        standings
            .iter()
            .find(|e| e.pair_id == pair)
            .and_then(|e| e.rank)
            .expect("ranked entry")
    };
    assert_eq!(rank_of(a), 1);
    assert_eq!(rank_of(b), 2);
    assert_eq!(rank_of(d), 3);
    assert_eq!(rank_of(c), 4);

    // players are all released again
    for player in tournament.players().await.unwrap() {
        assert_eq!(player.state, PlayerState::Idle);
    }
}

// ============================================================================
// Walkover
// ============================================================================

#[tokio::test]
async fn test_walkover_finishes_without_play() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "WO", MatchSystem::RoundRobin, 3).await;
    tournament.start_first_round(category.id).await.expect("start");

    let ma = &matches_in_round(&tournament, category.id, 1).await[0];
    let winner = ma.pair1_id.unwrap();
    tournament.walkover(ma.id, winner).await.expect("walkover");

    let standings = tournament.standings(category.id, 1).await.unwrap();
    let entry = standings.iter().find(|e| e.pair_id == winner).unwrap();
    assert_eq!(entry.matches_won, 1);
    assert_eq!(entry.games_won, 2, "walkover counts as straight games");
    assert_eq!(entry.points_won, 0, "but no points were played");
    let _ = pairs;
}

// ============================================================================
// Undo last round
// ============================================================================

#[tokio::test]
async fn test_undo_last_round_reopens_matches() {
    let tournament = open_tournament().await;
    let (category, _pairs) =
        frozen_singles_category(&tournament, "Undo", MatchSystem::RoundRobin, 4).await;
    tournament.start_first_round(category.id).await.expect("start");

    for ma in matches_in_round(&tournament, category.id, 1).await {
        let winner = ma.pair1_id.unwrap();
        play_match(&tournament, &ma, winner, &[(21, 10), (21, 10)]).await;
    }
    assert_eq!(tournament.round_status(category.id).await.unwrap().finished_rounds, 1);
    assert!(!tournament.standings(category.id, 1).await.unwrap().is_empty());

    tournament.undo_last_round(category.id).await.expect("undo");

    assert_eq!(tournament.round_status(category.id).await.unwrap().finished_rounds, 0);
    assert!(tournament.standings(category.id, 1).await.unwrap().is_empty());
    for ma in matches_in_round(&tournament, category.id, 1).await {
        assert_eq!(ma.state, MatchState::Ready, "reopened match is callable again");
        assert!(ma.score.is_none());
    }
}

// ============================================================================
// Error paths
// ============================================================================

#[tokio::test]
async fn test_round_robin_needs_three_pairs() {
    let tournament = open_tournament().await;
    let category = tournament.create_category("Tiny").await.unwrap();
    for player in make_players(&tournament, "Tiny", 2).await {
        tournament
            .add_player_to_category(category.id, player.id)
            .await
            .unwrap();
    }
    assert!(matches!(
        tournament.freeze_category(category.id).await,
        Err(Error::InvalidPlayerCount)
    ));
}

#[tokio::test]
async fn test_start_requires_frozen_category() {
    let tournament = open_tournament().await;
    let category = tournament.create_category("NotFrozen").await.unwrap();
    assert!(matches!(
        tournament.start_first_round(category.id).await,
        Err(Error::CategoryNotYetFrozen)
    ));
}

#[tokio::test]
async fn test_random_system_is_rejected_at_freeze() {
    let tournament = open_tournament().await;
    let category = tournament.create_category("Rand").await.unwrap();
    tournament
        .set_category_match_system(category.id, MatchSystem::Random)
        .await
        .unwrap();
    for player in make_players(&tournament, "Rand", 4).await {
        tournament
            .add_player_to_category(category.id, player.id)
            .await
            .unwrap();
    }
    assert!(matches!(
        tournament.freeze_category(category.id).await,
        Err(Error::InvalidMatchType)
    ));
}

#[tokio::test]
async fn test_round_robin_needs_no_seeding() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "NoSeed", MatchSystem::RoundRobin, 3).await;
    assert!(matches!(
        tournament.apply_seeding(category.id, &pairs).await,
        Err(Error::CategoryNeedsNoSeeding)
    ));
}

#[tokio::test]
async fn test_frozen_category_is_not_configurable() {
    let tournament = open_tournament().await;
    let (category, _) =
        frozen_singles_category(&tournament, "Fro", MatchSystem::RoundRobin, 3).await;
    let extra = make_players(&tournament, "Extra", 1).await;
    assert!(matches!(
        tournament.add_player_to_category(category.id, extra[0].id).await,
        Err(Error::CategoryNotConfigurable)
    ));
}

#[tokio::test]
async fn test_category_names_are_unique() {
    let tournament = open_tournament().await;
    tournament.create_category("Doppel").await.unwrap();
    assert!(matches!(
        tournament.create_category("Doppel").await,
        Err(Error::NameExists(_))
    ));
}

#[tokio::test]
async fn test_unfreeze_returns_to_config() {
    let tournament = open_tournament().await;
    let (category, _) =
        frozen_singles_category(&tournament, "Back", MatchSystem::RoundRobin, 3).await;
    tournament.unfreeze_category(category.id).await.expect("unfreeze");

    let row = tournament.category(category.id).await.unwrap();
    assert_eq!(row.state, CategoryState::Config);
    assert!(
        tournament.pairs(category.id).await.unwrap().is_empty(),
        "generated singles pairs are dropped again"
    );
}
