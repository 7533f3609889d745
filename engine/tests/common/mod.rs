#![allow(dead_code)]

use courtkeeper_engine::models::{Category, Match, MatchState, MatchSystem, Player, Sex};
use courtkeeper_engine::score::MatchScore;
use courtkeeper_engine::{Tournament, TournamentSettings};
use std::sync::Once;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "warn".into()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fresh in-memory tournament with registration metadata written.
pub async fn open_tournament() -> Tournament {
    init_tracing();
    let tournament = Tournament::open("sqlite::memory:")
        .await
        .expect("in-memory database");
    tournament
        .register(&TournamentSettings {
            name: "Club Open".to_string(),
            organizer: "Test Club".to_string(),
            date: "2026-08-01".to_string(),
            use_teams: false,
        })
        .await
        .expect("register tournament");
    tournament
}

/// Creates and registers `count` male players named after `prefix`.
pub async fn make_players(tournament: &Tournament, prefix: &str, count: usize) -> Vec<Player> {
    let mut players = Vec::with_capacity(count);
    for i in 1..=count {
        let player = tournament
            .create_player(&format!("{prefix}{i}"), &format!("{prefix}son{i}"), Sex::Male, None)
            .await
            .expect("create player");
        tournament
            .register_player(player.id)
            .await
            .expect("register player");
        players.push(player);
    }
    players
}

/// Men's singles category with the given system and player count, frozen
/// and ready for seeding / start. Returns the category and the pair ids in
/// player creation order.
pub async fn frozen_singles_category(
    tournament: &Tournament,
    name: &str,
    system: MatchSystem,
    num_players: usize,
) -> (Category, Vec<i64>) {
    let category = tournament.create_category(name).await.expect("create category");
    tournament
        .set_category_match_system(category.id, system)
        .await
        .expect("set match system");

    let players = make_players(tournament, name, num_players).await;
    for player in &players {
        tournament
            .add_player_to_category(category.id, player.id)
            .await
            .expect("add player to category");
    }

    tournament
        .freeze_category(category.id)
        .await
        .expect("freeze category");

    // singles pairs were generated at freeze time, one per player
    let pairs = tournament.pairs(category.id).await.expect("load pairs");
    let pair_ids = players
        .iter()
        .map(|player| {
            pairs
                .iter()
                .find(|p| p.player1_id == player.id)
                .expect("pair for player")
                .id
        })
        .collect();

    (category, pair_ids)
}

/// The match of `round` that features both given pairs.
pub async fn find_match(
    tournament: &Tournament,
    category_id: i64,
    round: i64,
    pair_a: i64,
    pair_b: i64,
) -> Match {
    let groups = tournament
        .match_groups(category_id)
        .await
        .expect("load groups");
    let matches = tournament.matches(category_id).await.expect("load matches");
    matches
        .into_iter()
        .find(|m| {
            let group = groups.iter().find(|g| g.id == m.group_id).expect("group");
            group.round == round
                && [m.pair1_id, m.pair2_id].contains(&Some(pair_a))
                && [m.pair1_id, m.pair2_id].contains(&Some(pair_b))
        })
        .expect("match for pairing")
}

/// Calls the match and records a result in favour of `winner_pair`.
/// `games` uses the winner's perspective, e.g. `&[(21, 15), (21, 12)]`.
pub async fn play_match(
    tournament: &Tournament,
    ma: &Match,
    winner_pair: i64,
    games: &[(i64, i64)],
) {
    let winner_is_slot1 = ma.pair1_id == Some(winner_pair);
    let oriented: Vec<(i64, i64)> = games
        .iter()
        .map(|&(w, l)| if winner_is_slot1 { (w, l) } else { (l, w) })
        .collect();

    tournament.call_match(ma.id).await.expect("call match");
    tournament
        .record_match_score(ma.id, &MatchScore::Games(oriented), false)
        .await
        .expect("record score");
}

/// Every match of the category in the given round.
pub async fn matches_in_round(
    tournament: &Tournament,
    category_id: i64,
    round: i64,
) -> Vec<Match> {
    let groups = tournament
        .match_groups(category_id)
        .await
        .expect("load groups");
    let matches = tournament.matches(category_id).await.expect("load matches");
    matches
        .into_iter()
        .filter(|m| {
            groups
                .iter()
                .find(|g| g.id == m.group_id)
                .map(|g| g.round == round)
                .unwrap_or(false)
        })
        .collect()
}

/// Plays every unfinished ready match of a round, lower pair id wins 2:0.
pub async fn sweep_round(tournament: &Tournament, category_id: i64, round: i64) {
    for ma in matches_in_round(tournament, category_id, round).await {
        if ma.state == MatchState::Finished {
            continue;
        }
        let winner = ma.pair1_id.unwrap().min(ma.pair2_id.unwrap());
        play_match(tournament, &ma, winner, &[(21, 15), (21, 12)]).await;
    }
}
