mod common;

use common::{frozen_singles_category, matches_in_round, open_tournament, sweep_round};
use courtkeeper_engine::models::{MatchSystem, RankingEntry};
use courtkeeper_engine::score::MatchScore;
use std::collections::HashSet;

/// The semantic payload of an entry, with storage artefacts (ids, sequence
/// numbers) stripped for comparison.
fn essence(entry: &RankingEntry) -> (i64, i64, [i64; 7], Option<i64>) {
    (
        entry.pair_id,
        entry.grp_num,
        [
            entry.matches_won,
            entry.matches_drawn,
            entry.matches_lost,
            entry.games_won,
            entry.games_lost,
            entry.points_won,
            entry.points_lost,
        ],
        entry.rank,
    )
}

// ============================================================================
// Invariants
// ============================================================================

#[tokio::test]
async fn test_every_pair_has_one_entry_and_ranks_are_a_permutation() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "Perm", MatchSystem::RoundRobin, 5).await;
    tournament.start_first_round(category.id).await.expect("start");

    for round in 1..=5 {
        sweep_round(&tournament, category.id, round).await;

        let standings = tournament.standings(category.id, round).await.unwrap();
        assert_eq!(standings.len(), pairs.len(), "round {round}: one entry per pair");

        let entry_pairs: HashSet<i64> = standings.iter().map(|e| e.pair_id).collect();
        assert_eq!(entry_pairs.len(), pairs.len(), "round {round}: no duplicate entries");

        let ranks: HashSet<i64> = standings.iter().filter_map(|e| e.rank).collect();
        assert_eq!(
            ranks,
            (1..=pairs.len() as i64).collect::<HashSet<i64>>(),
            "round {round}: ranks are a permutation of 1..k"
        );
    }
}

#[tokio::test]
async fn test_entries_accumulate_across_rounds() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "Accu", MatchSystem::RoundRobin, 4).await;
    tournament.start_first_round(category.id).await.expect("start");

    sweep_round(&tournament, category.id, 1).await;
    sweep_round(&tournament, category.id, 2).await;

    let standings = tournament.standings(category.id, 2).await.unwrap();
    let played: i64 = standings
        .iter()
        .map(|e| e.matches_won + e.matches_drawn + e.matches_lost)
        .sum();
    // two rounds of two matches, each counted for both participants
    assert_eq!(played, 8);
    let _ = pairs;
}

// ============================================================================
// Score edits
// ============================================================================

#[tokio::test]
async fn test_edit_and_edit_back_restores_the_standings_exactly() {
    let tournament = open_tournament().await;
    let (category, _pairs) =
        frozen_singles_category(&tournament, "Edit", MatchSystem::RoundRobin, 4).await;
    tournament.start_first_round(category.id).await.expect("start");

    sweep_round(&tournament, category.id, 1).await;
    sweep_round(&tournament, category.id, 2).await;

    let before: Vec<_> = tournament
        .standings(category.id, 2)
        .await
        .unwrap()
        .iter()
        .map(essence)
        .collect();

    // cosmetic edit in round 1 (same winner, different points), then undo it
    let edited = matches_in_round(&tournament, category.id, 1).await[0].clone();
    let original = MatchScore::parse(edited.score.as_deref().unwrap()).unwrap();
    let winner = edited.winner_pair_id().unwrap().unwrap();
    let cosmetic = if edited.pair1_id == Some(winner) {
        MatchScore::Games(vec![(21, 3), (21, 3)])
    } else {
        MatchScore::Games(vec![(3, 21), (3, 21)])
    };
    tournament
        .record_match_score(edited.id, &cosmetic, false)
        .await
        .expect("edit score");
    tournament
        .record_match_score(edited.id, &original, false)
        .await
        .expect("edit back");

    let after: Vec<_> = tournament
        .standings(category.id, 2)
        .await
        .unwrap()
        .iter()
        .map(essence)
        .collect();
    assert_eq!(before, after, "derived entries must be restored exactly");
}

#[tokio::test]
async fn test_flip_in_round_robin_reorders_later_rounds() {
    let tournament = open_tournament().await;
    let (category, _pairs) =
        frozen_singles_category(&tournament, "Flip", MatchSystem::RoundRobin, 4).await;
    tournament.start_first_round(category.id).await.expect("start");

    sweep_round(&tournament, category.id, 1).await;
    sweep_round(&tournament, category.id, 2).await;

    let target = matches_in_round(&tournament, category.id, 1).await[0].clone();
    let old_winner = target.winner_pair_id().unwrap().unwrap();
    let old_loser = target.loser_pair_id().unwrap().unwrap();

    // round robin matches have no successors, so flips are always allowed
    let flipped = if target.pair1_id == Some(old_winner) {
        MatchScore::Games(vec![(3, 21), (3, 21)])
    } else {
        MatchScore::Games(vec![(21, 3), (21, 3)])
    };
    tournament
        .record_match_score(target.id, &flipped, true)
        .await
        .expect("flip score");

    for round in 1..=2 {
        let standings = tournament.standings(category.id, round).await.unwrap();
        let winner_entry = standings.iter().find(|e| e.pair_id == old_winner).unwrap();
        let loser_entry = standings.iter().find(|e| e.pair_id == old_loser).unwrap();
        assert!(
            loser_entry.matches_won > 0,
            "round {round}: the new winner gained a win"
        );
        assert!(
            winner_entry.matches_lost > 0,
            "round {round}: the old winner carries a loss"
        );
    }
}
