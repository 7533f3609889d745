mod common;

use common::{find_match, frozen_singles_category, matches_in_round, open_tournament, play_match};
use courtkeeper_engine::models::{CategoryState, MatchSystem};
use std::collections::HashSet;

// ============================================================================
// Scenario: Swiss ladder with four players over three rounds
// ============================================================================

#[tokio::test]
async fn test_swiss_four_players_three_rounds_no_repeats() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "Swiss", MatchSystem::SwissLadder, 4).await;
    let (p1, p2, p3, p4) = (pairs[0], pairs[1], pairs[2], pairs[3]);

    tournament
        .apply_seeding(category.id, &[p1, p2, p3, p4])
        .await
        .expect("seeding");
    tournament.start_first_round(category.id).await.expect("start");
    assert_eq!(tournament.total_rounds(category.id).await.unwrap(), 3);

    // round 1 from the seeding: P1-P2 and P3-P4
    let r1_m1 = find_match(&tournament, category.id, 1, p1, p2).await;
    let r1_m2 = find_match(&tournament, category.id, 1, p3, p4).await;

    // P1 wins big, P3 wins small, so the standings order is P1, P3, P2, P4
    play_match(&tournament, &r1_m1, p1, &[(21, 5), (21, 5)]).await;
    play_match(&tournament, &r1_m2, p3, &[(21, 19), (21, 19)]).await;

    // round 2 pairs the leaders without repeating round 1
    let r2 = matches_in_round(&tournament, category.id, 2).await;
    assert_eq!(r2.len(), 2, "round 2 was generated after round 1 completed");
    let r2_m1 = find_match(&tournament, category.id, 2, p1, p3).await;
    let r2_m2 = find_match(&tournament, category.id, 2, p2, p4).await;

    play_match(&tournament, &r2_m1, p1, &[(21, 10), (21, 10)]).await;
    play_match(&tournament, &r2_m2, p2, &[(21, 12), (21, 12)]).await;

    // round 3 has only one combination left per pair
    let r3_m1 = find_match(&tournament, category.id, 3, p1, p4).await;
    let r3_m2 = find_match(&tournament, category.id, 3, p2, p3).await;
    play_match(&tournament, &r3_m1, p1, &[(21, 9), (21, 9)]).await;
    play_match(&tournament, &r3_m2, p2, &[(21, 16), (21, 16)]).await;

    // after three rounds every combination was played exactly once
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    for ma in tournament.matches(category.id).await.unwrap() {
        let (a, b) = (ma.pair1_id.unwrap(), ma.pair2_id.unwrap());
        assert!(seen.insert((a.min(b), a.max(b))), "repeated pairing");
    }
    assert_eq!(seen.len(), 6);

    let category_row = tournament.category(category.id).await.unwrap();
    assert_eq!(category_row.state, CategoryState::Finalized);

    // P1 swept the field
    let standings = tournament.standings(category.id, 3).await.unwrap();
    let winner = standings.iter().find(|e| e.rank == Some(1)).unwrap();
    assert_eq!(winner.pair_id, p1);
    assert_eq!(winner.matches_won, 3);
}

// ============================================================================
// Byes in odd fields
// ============================================================================

#[tokio::test]
async fn test_swiss_odd_field_rotates_byes() {
    let tournament = open_tournament().await;
    let (category, pairs) =
        frozen_singles_category(&tournament, "SwissOdd", MatchSystem::SwissLadder, 5).await;

    tournament
        .apply_seeding(category.id, &pairs)
        .await
        .expect("seeding");
    tournament.start_first_round(category.id).await.expect("start");

    let mut bye_holders: Vec<i64> = Vec::new();
    for round in 1..=3 {
        let round_matches = matches_in_round(&tournament, category.id, round).await;
        assert_eq!(round_matches.len(), 2, "five pairs play two matches per round");

        let playing: HashSet<i64> = round_matches
            .iter()
            .flat_map(|m| [m.pair1_id.unwrap(), m.pair2_id.unwrap()])
            .collect();
        let sitting: Vec<i64> = pairs
            .iter()
            .copied()
            .filter(|p| !playing.contains(p))
            .collect();
        assert_eq!(sitting.len(), 1);
        bye_holders.push(sitting[0]);

        for ma in &round_matches {
            let winner = ma.pair1_id.unwrap().min(ma.pair2_id.unwrap());
            play_match(&tournament, ma, winner, &[(21, 15), (21, 12)]).await;
        }
    }

    let distinct: HashSet<i64> = bye_holders.iter().copied().collect();
    assert_eq!(distinct.len(), 3, "no pair sat out twice in three rounds");
}
