//! Per-category round bookkeeping, derived entirely from persisted group
//! and match state.

use crate::error::Result;
use crate::models::match_group::{GroupState, MatchGroup};
use crate::models::r#match::{Match, MatchState};
use sqlx::SqliteConnection;

/// Snapshot of where a category stands in its schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStatus {
    /// Number of completed rounds, counted from 1; 0 when none finished.
    pub finished_rounds: i64,
    /// Rounds with at least one finished or running match beyond the
    /// completed prefix. Group phases can run several at once.
    pub running_rounds: Vec<i64>,
    /// Highest round for which matches have been generated.
    pub highest_generated_round: i64,
}

pub async fn get(conn: &mut SqliteConnection, category_id: i64) -> Result<RoundStatus> {
    let highest: Option<i64> =
        sqlx::query_scalar("SELECT MAX(round) FROM match_group WHERE category_id = ?")
            .bind(category_id)
            .fetch_one(&mut *conn)
            .await?;
    let highest_generated_round = highest.unwrap_or(0);

    // walk rounds from the front until one is not completely finished
    let mut finished_rounds = 0;
    let mut round = 1;
    while round <= highest_generated_round {
        let groups = MatchGroup::for_category_and_round(conn, category_id, round).await?;
        if groups.is_empty() {
            break;
        }
        if !groups.iter().all(|g| g.state == GroupState::Finished) {
            break;
        }
        finished_rounds = round;
        round += 1;
    }

    let mut running_rounds = Vec::new();
    for round in (finished_rounds + 1)..=highest_generated_round {
        let matches = Match::for_category_and_round(conn, category_id, round).await?;
        let touched = matches
            .iter()
            .any(|m| matches!(m.state, MatchState::Finished | MatchState::Busy));
        if touched {
            running_rounds.push(round);
        }
    }

    Ok(RoundStatus {
        finished_rounds,
        running_rounds,
        highest_generated_round,
    })
}

/// (total, unfinished, running) match counts for one round.
pub async fn match_counts(
    conn: &mut SqliteConnection,
    category_id: i64,
    round: i64,
) -> Result<(i64, i64, i64)> {
    let matches = Match::for_category_and_round(conn, category_id, round).await?;
    let total = matches.len() as i64;
    let unfinished = matches
        .iter()
        .filter(|m| m.state != MatchState::Finished)
        .count() as i64;
    let running = matches
        .iter()
        .filter(|m| m.state == MatchState::Busy)
        .count() as i64;
    Ok((total, unfinished, running))
}
