//! Ranking Engine
//!
//! After every completed round-robin or group round one ranking entry per
//! pair is written, carrying the running totals over all completed rounds
//! so far. Sorting happens per group with the category's comparator and
//! assigns ranks 1..k; elimination categories have no intrinsic order and
//! get their ranks forced from the bracket's final-rank outcomes instead.

use crate::error::{Error, Result};
use crate::models::category::{Category, MatchSystem};
use crate::models::r#match::{Match, MatchState};
use crate::models::player_pair::PlayerPair;
use crate::models::ranking_entry::{PairStats, RankingEntry, NO_GROUP};
use crate::score::MatchScore;
use sqlx::SqliteConnection;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::instrument;

/// Cumulative stats per pair over all finished matches in rounds
/// `1..=round`. Walkovers count as a straight-game win without points.
async fn collect_stats(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<HashMap<i64, PairStats>> {
    let mut stats: HashMap<i64, PairStats> = HashMap::new();

    for r in 1..=round {
        for ma in Match::for_category_and_round(conn, category.id, r).await? {
            if ma.state != MatchState::Finished {
                continue;
            }
            let (Some(pair1), Some(pair2)) = (ma.pair1_id, ma.pair2_id) else {
                continue;
            };
            let Some(score) = ma.match_score()? else {
                continue;
            };

            let (games1, games2, points1, points2) = match &score {
                MatchScore::Walkover { winner_slot } => {
                    if *winner_slot == 1 {
                        (category.win_score, 0, 0, 0)
                    } else {
                        (0, category.win_score, 0, 0)
                    }
                }
                MatchScore::Games(_) => {
                    let (g1, g2) = score.game_wins();
                    let (p1, p2) = score.point_sums();
                    (g1, g2, p1, p2)
                }
            };

            let entry1 = stats.entry(pair1).or_default();
            entry1.games_won += games1;
            entry1.games_lost += games2;
            entry1.points_won += points1;
            entry1.points_lost += points2;
            match score.winner_slot() {
                Some(1) => entry1.matches_won += 1,
                Some(_) => entry1.matches_lost += 1,
                None => entry1.matches_drawn += 1,
            }

            let entry2 = stats.entry(pair2).or_default();
            entry2.games_won += games2;
            entry2.games_lost += games1;
            entry2.points_won += points2;
            entry2.points_lost += points1;
            match score.winner_slot() {
                Some(2) => entry2.matches_won += 1,
                Some(_) => entry2.matches_lost += 1,
                None => entry2.matches_drawn += 1,
            }
        }
    }

    Ok(stats)
}

/// Writes the unsorted entries for `round`, one per pair in `pairs`.
#[instrument(level = "debug", skip(conn, category, pairs))]
pub async fn create_unsorted_entries(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
    pairs: &[PlayerPair],
) -> Result<()> {
    let stats = collect_stats(conn, category, round).await?;

    for pair in pairs {
        if RankingEntry::find_for_pair(conn, category.id, round, pair.id)
            .await?
            .is_some()
        {
            return Err(Error::InvalidRound);
        }
        let pair_stats = stats.get(&pair.id).copied().unwrap_or_default();
        let grp_num = pair.grp_num.unwrap_or(NO_GROUP);
        RankingEntry::create(conn, category.id, round, pair.id, grp_num, &pair_stats).await?;
    }

    Ok(())
}

/// The category's standings comparator; better standings sort first.
/// Elimination systems define no order of their own.
pub fn compare(system: MatchSystem, a: &RankingEntry, b: &RankingEntry) -> Ordering {
    match system {
        MatchSystem::RoundRobin | MatchSystem::SwissLadder | MatchSystem::GroupsThenKo => b
            .win_delta()
            .cmp(&a.win_delta())
            .then_with(|| b.game_delta().cmp(&a.game_delta()))
            .then_with(|| b.point_delta().cmp(&a.point_delta())),
        MatchSystem::SingleElim | MatchSystem::Ranking1 | MatchSystem::Random => Ordering::Equal,
    }
}

/// Sorts the entries of one round group by group and assigns ranks 1..k.
#[instrument(level = "debug", skip(conn, category))]
pub async fn sort_entries(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<()> {
    let entries = RankingEntry::for_category_and_round(conn, category.id, round).await?;

    let mut by_group: HashMap<i64, Vec<RankingEntry>> = HashMap::new();
    for entry in entries {
        by_group.entry(entry.grp_num).or_default().push(entry);
    }

    for group in by_group.values_mut() {
        group.sort_by(|a, b| compare(category.match_system, a, b));
        for (idx, entry) in group.iter().enumerate() {
            RankingEntry::set_rank(conn, entry.id, Some(idx as i64 + 1)).await?;
        }
    }

    Ok(())
}

/// Overwrites the rank of one entry; used for bracket outcomes.
pub async fn force_rank(conn: &mut SqliteConnection, entry_id: i64, rank: i64) -> Result<()> {
    RankingEntry::set_rank(conn, entry_id, Some(rank)).await
}

/// Rewrites the ranks of `round`'s entries from the final-rank outcomes of
/// every finished bracket match up to and including that round.
#[instrument(level = "debug", skip(conn, category))]
pub async fn apply_bracket_ranks(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<()> {
    for r in 1..=round {
        for ma in Match::for_category_and_round(conn, category.id, r).await? {
            if ma.state != MatchState::Finished {
                continue;
            }
            if let (Some(rank), Some(winner)) = (ma.winner_rank, ma.winner_pair_id()?) {
                if let Some(entry) =
                    RankingEntry::find_for_pair(conn, category.id, round, winner).await?
                {
                    force_rank(conn, entry.id, rank).await?;
                }
            }
            if let (Some(rank), Some(loser)) = (ma.loser_rank, ma.loser_pair_id()?) {
                if let Some(entry) =
                    RankingEntry::find_for_pair(conn, category.id, round, loser).await?
                {
                    force_rank(conn, entry.id, rank).await?;
                }
            }
        }
    }
    Ok(())
}

/// Standings of one completed round, best rank first within each group.
pub async fn sorted_ranking(
    conn: &mut SqliteConnection,
    category_id: i64,
    round: i64,
) -> Result<Vec<RankingEntry>> {
    RankingEntry::for_category_and_round(conn, category_id, round).await
}
