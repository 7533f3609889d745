//! Match Engine
//!
//! Materialises generator output into persisted groups and matches, drives
//! the per-match and per-group state machines, and records scores.
//!
//! ## Bracket materialisation workflow
//!
//! 1. Build and prune the bracket graph for the seeded field
//! 2. Sort matches into allocation order (early rounds first)
//! 3. Create one match group per bracket round, one match per node
//! 4. Wire winner/loser paths: symbolic references or final ranks
//! 5. Link the initially known player pairs
//!
//! Callers wrap every operation in one transaction; a failure anywhere
//! rolls back the whole step so no partial bracket is ever visible.

use crate::db;
use crate::error::{Error, Result};
use crate::models::category::{Category, MatchSystem};
use crate::models::match_group::{
    GroupState, MatchGroup, GROUP_NUM_FINAL, GROUP_NUM_ITERATION, GROUP_NUM_L16,
    GROUP_NUM_QUARTERFINAL, GROUP_NUM_SEMIFINAL,
};
use crate::models::player::{Player, PlayerState};
use crate::models::player_pair::PlayerPair;
use crate::models::r#match::{Match, MatchState};
use crate::score::MatchScore;
use crate::services::bracket::{self, Bracket, BracketKind, Outcome, Slot};
use crate::services::bracket_vis;
use crate::services::round_robin;
use crate::services::round_status;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::instrument;

/// Resolves a symbolic slot with the real pair while keeping the symbolic
/// reference as provenance; winner/loser flips need it to find the slot
/// again.
async fn resolve_symbolic_slot(
    conn: &mut SqliteConnection,
    match_id: i64,
    pos: u8,
    pair_id: i64,
) -> Result<()> {
    let query = if pos == 1 {
        "UPDATE \"match\" SET pair1_id = ? WHERE id = ?"
    } else {
        "UPDATE \"match\" SET pair2_id = ? WHERE id = ?"
    };
    sqlx::query(query)
        .bind(pair_id)
        .bind(match_id)
        .execute(conn)
        .await?;
    Ok(())
}

fn depth_to_group_num(depth: i64) -> i64 {
    match depth {
        0 => GROUP_NUM_FINAL,
        1 => GROUP_NUM_SEMIFINAL,
        2 => GROUP_NUM_QUARTERFINAL,
        3 => GROUP_NUM_L16,
        _ => GROUP_NUM_ITERATION,
    }
}

/// Emits all round-robin matches for one group of pairs, one match group
/// per round, both pair slots wired immediately.
#[instrument(level = "debug", skip(conn, pairs))]
pub async fn generate_group_matches(
    conn: &mut SqliteConnection,
    category: &Category,
    pairs: &[PlayerPair],
    grp_num: i64,
    first_round: i64,
) -> Result<()> {
    if grp_num < 1 && grp_num != GROUP_NUM_ITERATION {
        return Err(Error::InvalidGroupNum);
    }

    let mut internal_round = 0;
    loop {
        let pairings = round_robin::generate_pairings(pairs.len(), internal_round);
        if pairings.is_empty() {
            return Ok(());
        }

        let group = MatchGroup::create(
            conn,
            category.id,
            first_round + internal_round,
            grp_num,
        )
        .await?;

        for (idx1, idx2) in pairings {
            let ma = Match::create(conn, group.id).await?;
            Match::set_pair(conn, ma.id, 1, pairs[idx1].id).await?;
            Match::set_pair(conn, ma.id, 2, pairs[idx2].id).await?;
        }

        MatchGroup::set_state(conn, group.id, GroupState::Frozen).await?;
        close_match_group(conn, group.id).await?;

        internal_round += 1;
    }
}

/// Materialises a pruned bracket: groups per bracket round, matches per
/// surviving node, symbolic winner/loser wiring, seeded pairs, and the
/// visualisation rows for the sheet renderer.
#[instrument(level = "debug", skip(conn, seeding))]
pub async fn generate_bracket_matches(
    conn: &mut SqliteConnection,
    category: &Category,
    kind: BracketKind,
    seeding: &[PlayerPair],
    first_round: i64,
) -> Result<()> {
    let status = round_status::get(conn, category.id).await?;
    if first_round <= status.highest_generated_round {
        return Err(Error::InvalidRound);
    }

    let mut graph = bracket::generate(kind, seeding.len() as i64)?;
    bracket::sort_matches(&mut graph.matches);

    // create groups and matches in allocation order
    let mut bracket_to_match: HashMap<i64, i64> = HashMap::new();
    let mut cur_depth: Option<i64> = None;
    let mut cur_group: Option<MatchGroup> = None;
    let mut round_offset = -1;

    for bm in graph.matches.iter().filter(|m| !m.deleted) {
        if cur_depth != Some(bm.depth) {
            if let Some(group) = cur_group.take() {
                MatchGroup::set_state(conn, group.id, GroupState::Frozen).await?;
                close_match_group(conn, group.id).await?;
            }
            cur_depth = Some(bm.depth);
            round_offset += 1;
            cur_group = Some(
                MatchGroup::create(
                    conn,
                    category.id,
                    first_round + round_offset,
                    depth_to_group_num(bm.depth),
                )
                .await?,
            );
        }

        let group = cur_group.as_ref().expect("group exists for current depth");
        let ma = Match::create(conn, group.id).await?;
        bracket_to_match.insert(bm.id, ma.id);
    }
    if let Some(group) = cur_group.take() {
        MatchGroup::set_state(conn, group.id, GroupState::Frozen).await?;
        close_match_group(conn, group.id).await?;
    }

    // wire outcomes and seeded pairs
    for bm in graph.matches.iter().filter(|m| !m.deleted) {
        let ma_id = bracket_to_match[&bm.id];

        match bm.winner_outcome {
            Outcome::FinalRank(rank) => Match::set_winner_rank(conn, ma_id, rank).await?,
            Outcome::NextMatch { match_id, slot } => {
                let next_id = bracket_to_match[&match_id];
                Match::set_symbolic(conn, next_id, slot, ma_id).await?;
            }
            Outcome::Eliminated => {}
        }
        match bm.loser_outcome {
            Outcome::FinalRank(rank) => Match::set_loser_rank(conn, ma_id, rank).await?,
            Outcome::NextMatch { match_id, slot } => {
                let next_id = bracket_to_match[&match_id];
                Match::set_symbolic(conn, next_id, slot, -ma_id).await?;
            }
            Outcome::Eliminated => {}
        }

        for pos in [1u8, 2u8] {
            if let Slot::Seed(rank) = if pos == 1 { bm.slot1 } else { bm.slot2 } {
                if rank >= 1 && rank <= seeding.len() as i64 {
                    let pair = &seeding[(rank - 1) as usize];
                    Match::set_pair(conn, ma_id, pos, pair.id).await?;
                }
            }
        }
    }

    // the wiring above touched the Ready flags' inputs
    for ma_id in bracket_to_match.values() {
        let ma = Match::get(conn, *ma_id).await?;
        refresh_match_state(conn, &ma).await?;
    }

    bracket_vis::store(conn, category.id, &graph, &bracket_to_match).await?;

    Ok(())
}

/// The bracket graph as generated, exposed for reporting and tests.
pub fn build_bracket(kind: BracketKind, num_players: i64) -> Result<Bracket> {
    let mut graph = bracket::generate(kind, num_players)?;
    bracket::sort_matches(&mut graph.matches);
    Ok(graph)
}

/// Frozen → Idle: allocates tournament-wide match numbers in stored order
/// and computes the initial Ready flags.
#[instrument(level = "debug", skip(conn))]
pub async fn close_match_group(conn: &mut SqliteConnection, group_id: i64) -> Result<()> {
    let group = MatchGroup::get(conn, group_id).await?;
    if group.state != GroupState::Frozen {
        return Err(Error::WrongState);
    }

    for ma in Match::for_group(conn, group_id).await? {
        let num = db::next_match_num(conn).await?;
        Match::set_match_num(conn, ma.id, num).await?;
    }

    MatchGroup::set_state(conn, group_id, GroupState::Idle).await?;

    for ma in Match::for_group(conn, group_id).await? {
        refresh_match_state(conn, &ma).await?;
    }

    Ok(())
}

/// Idle → Scheduled: the external court scheduler has picked the group up.
pub async fn stage_match_group(conn: &mut SqliteConnection, group_id: i64) -> Result<()> {
    let group = MatchGroup::get(conn, group_id).await?;
    if group.state != GroupState::Idle {
        return Err(Error::WrongState);
    }
    MatchGroup::set_state(conn, group_id, GroupState::Scheduled).await
}

pub async fn unstage_match_group(conn: &mut SqliteConnection, group_id: i64) -> Result<()> {
    let group = MatchGroup::get(conn, group_id).await?;
    if group.state != GroupState::Scheduled {
        return Err(Error::WrongState);
    }
    MatchGroup::set_state(conn, group_id, GroupState::Idle).await
}

/// All players behind the resolved pair slots of a match.
async fn match_players(conn: &mut SqliteConnection, ma: &Match) -> Result<Vec<Player>> {
    let mut players = Vec::new();
    for pair_id in [ma.pair1_id, ma.pair2_id].into_iter().flatten() {
        let pair = PlayerPair::get(conn, pair_id).await?;
        players.extend(pair.players(conn).await?);
    }
    Ok(players)
}

/// Recomputes Incomplete/Waiting/Ready for one match. Busy, Finished and
/// Postponed are sticky and only left through their dedicated operations.
pub async fn refresh_match_state(conn: &mut SqliteConnection, ma: &Match) -> Result<()> {
    if matches!(
        ma.state,
        MatchState::Busy | MatchState::Finished | MatchState::Postponed
    ) {
        return Ok(());
    }

    if !ma.has_both_pairs() {
        if ma.state != MatchState::Incomplete {
            Match::set_state(conn, ma.id, MatchState::Incomplete).await?;
        }
        return Ok(());
    }

    let group = MatchGroup::get(conn, ma.group_id).await?;
    let group_closed = !matches!(group.state, GroupState::Config | GroupState::Frozen);

    let players = match_players(conn, ma).await?;
    let all_idle = players.iter().all(|p| p.state == PlayerState::Idle);

    let new_state = if group_closed && all_idle {
        MatchState::Ready
    } else {
        MatchState::Waiting
    };
    if ma.state != new_state {
        Match::set_state(conn, ma.id, new_state).await?;
    }
    Ok(())
}

/// Re-derives the group state from its matches.
async fn refresh_group_state(conn: &mut SqliteConnection, group_id: i64) -> Result<()> {
    let group = MatchGroup::get(conn, group_id).await?;
    if matches!(group.state, GroupState::Config | GroupState::Frozen) {
        return Ok(());
    }

    let matches = Match::for_group(conn, group_id).await?;
    let new_state = if matches.iter().all(|m| m.state == MatchState::Finished) {
        GroupState::Finished
    } else if matches.iter().any(|m| m.state == MatchState::Busy) {
        GroupState::Playing
    } else {
        GroupState::Idle
    };
    if group.state != new_state {
        MatchGroup::set_state(conn, group_id, new_state).await?;
    }
    Ok(())
}

/// Refreshes every unfinished match that references one of the players'
/// pairs; called whenever player availability changes.
async fn refresh_matches_of_players(
    conn: &mut SqliteConnection,
    players: &[Player],
) -> Result<()> {
    let mut seen = Vec::new();
    for player in players {
        let pairs: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM pair WHERE player1_id = ? OR player2_id = ?")
                .bind(player.id)
                .bind(player.id)
                .fetch_all(&mut *conn)
                .await?;
        for pair_id in pairs {
            for ma in Match::pending_for_pair(conn, pair_id).await? {
                if seen.contains(&ma.id) {
                    continue;
                }
                seen.push(ma.id);
                refresh_match_state(conn, &ma).await?;
            }
        }
    }
    Ok(())
}

/// Ready → Busy: the match is called to court. Both pairs' players switch
/// to Playing, which demotes their other Ready matches to Waiting.
#[instrument(level = "debug", skip(conn))]
pub async fn call_match(conn: &mut SqliteConnection, match_id: i64) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    if ma.state != MatchState::Ready {
        return Err(Error::WrongState);
    }

    let players = match_players(conn, &ma).await?;
    if players.iter().any(|p| p.state != PlayerState::Idle) {
        return Err(Error::WrongState);
    }

    Match::set_state(conn, match_id, MatchState::Busy).await?;
    for player in &players {
        Player::set_state(conn, player.id, PlayerState::Playing).await?;
    }
    refresh_group_state(conn, ma.group_id).await?;
    refresh_matches_of_players(conn, &players).await?;
    Ok(())
}

/// Busy → Ready: the call is rolled back without a result.
#[instrument(level = "debug", skip(conn))]
pub async fn cancel_match_call(conn: &mut SqliteConnection, match_id: i64) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    if ma.state != MatchState::Busy {
        return Err(Error::WrongState);
    }

    let players = match_players(conn, &ma).await?;
    for player in &players {
        Player::set_state(conn, player.id, PlayerState::Idle).await?;
    }
    Match::set_state(conn, match_id, MatchState::Ready).await?;
    refresh_group_state(conn, ma.group_id).await?;
    refresh_matches_of_players(conn, &players).await?;
    Ok(())
}

pub async fn postpone_match(conn: &mut SqliteConnection, match_id: i64) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    if matches!(ma.state, MatchState::Finished | MatchState::Busy) {
        return Err(Error::WrongState);
    }
    Match::set_state(conn, match_id, MatchState::Postponed).await
}

pub async fn resume_match(conn: &mut SqliteConnection, match_id: i64) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    if ma.state != MatchState::Postponed {
        return Err(Error::WrongState);
    }
    Match::set_state(conn, match_id, MatchState::Waiting).await?;
    let ma = Match::get(conn, match_id).await?;
    refresh_match_state(conn, &ma).await
}

/// True when draws are a legal outcome for this match: the category must
/// allow them and the match must sit in a round-robin style round.
/// Elimination rounds always need a winner.
fn draw_allowed(category: &Category, grp_num: i64) -> bool {
    if !category.allow_draw {
        return false;
    }
    match category.match_system {
        MatchSystem::RoundRobin | MatchSystem::SwissLadder => true,
        MatchSystem::GroupsThenKo => grp_num > 0,
        _ => false,
    }
}

/// Records or edits a match result.
///
/// The normal path requires a Busy match (walkovers may skip the call to
/// court) and finishes it: score stored, players released, winner and
/// loser propagated into their successor slots.
///
/// Editing a Finished match is allowed as long as the result does not flip
/// — a flip additionally requires `allow_flip` and both successors still
/// pre-Finished, and re-propagates the new winner/loser.
#[instrument(level = "debug", skip(conn, category, score))]
pub async fn set_match_score(
    conn: &mut SqliteConnection,
    category: &Category,
    match_id: i64,
    score: &MatchScore,
    allow_flip: bool,
) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    let group = MatchGroup::get(conn, ma.group_id).await?;

    if !ma.has_both_pairs() {
        return Err(Error::WrongState);
    }

    score.validate(category.win_score, draw_allowed(category, group.grp_num))?;
    if score.is_draw() && !draw_allowed(category, group.grp_num) {
        return Err(Error::InvalidScore("draws are not allowed here".into()));
    }

    if ma.state == MatchState::Finished {
        return edit_match_score(conn, &ma, score, allow_flip).await;
    }

    let callable = match score {
        MatchScore::Walkover { .. } => matches!(
            ma.state,
            MatchState::Waiting | MatchState::Ready | MatchState::Busy
        ),
        MatchScore::Games(_) => ma.state == MatchState::Busy,
    };
    if !callable {
        return Err(Error::WrongState);
    }

    let was_busy = ma.state == MatchState::Busy;
    Match::store_score(conn, match_id, score).await?;
    Match::set_state(conn, match_id, MatchState::Finished).await?;

    if was_busy {
        let players = match_players(conn, &ma).await?;
        for player in &players {
            Player::set_state(conn, player.id, PlayerState::Idle).await?;
        }
        refresh_matches_of_players(conn, &players).await?;
    }

    let ma = Match::get(conn, match_id).await?;
    propagate_result(conn, &ma).await?;
    refresh_group_state(conn, ma.group_id).await?;

    Ok(())
}

async fn edit_match_score(
    conn: &mut SqliteConnection,
    ma: &Match,
    score: &MatchScore,
    allow_flip: bool,
) -> Result<()> {
    let old_winner = ma.winner_pair_id()?;
    let new_winner = match score.winner_slot() {
        Some(1) => ma.pair1_id,
        Some(_) => ma.pair2_id,
        None => None,
    };

    if old_winner == new_winner {
        // cosmetic change, nothing downstream moves
        Match::store_score(conn, ma.id, score).await?;
        return Ok(());
    }

    if !allow_flip {
        return Err(Error::WrongState);
    }

    // both successors must not have started yet
    let successors = Match::successors(conn, ma.id).await?;
    if successors
        .iter()
        .any(|s| matches!(s.state, MatchState::Busy | MatchState::Finished))
    {
        return Err(Error::WrongState);
    }

    Match::store_score(conn, ma.id, score).await?;
    let ma = Match::get(conn, ma.id).await?;
    propagate_result(conn, &ma).await?;

    Ok(())
}

/// Writes the winner and loser of a finished match into every successor
/// slot holding a symbolic reference onto it, then refreshes those
/// successors. Re-entrant: a flip simply overwrites the resolved pair.
async fn propagate_result(conn: &mut SqliteConnection, ma: &Match) -> Result<()> {
    let winner = ma.winner_pair_id()?;
    let loser = ma.loser_pair_id()?;

    for successor in Match::successors(conn, ma.id).await? {
        if matches!(successor.state, MatchState::Busy | MatchState::Finished) {
            continue;
        }
        for (pos, symbolic) in [
            (1u8, successor.pair1_symbolic),
            (2u8, successor.pair2_symbolic),
        ] {
            let Some(symbolic) = symbolic else { continue };
            let incoming = if symbolic == ma.id {
                winner
            } else if symbolic == -ma.id {
                loser
            } else {
                continue;
            };
            if let Some(pair_id) = incoming {
                resolve_symbolic_slot(conn, successor.id, pos, pair_id).await?;
            }
        }
        let successor = Match::get(conn, successor.id).await?;
        refresh_match_state(conn, &successor).await?;
    }

    Ok(())
}

/// Replaces one resolved pair slot; only legal before the match finishes.
#[instrument(level = "debug", skip(conn))]
pub async fn swap_player(
    conn: &mut SqliteConnection,
    match_id: i64,
    old_pair_id: i64,
    new_pair_id: i64,
) -> Result<()> {
    let ma = Match::get(conn, match_id).await?;
    if matches!(ma.state, MatchState::Finished | MatchState::Busy) {
        return Err(Error::WrongState);
    }

    let pos = if ma.pair1_id == Some(old_pair_id) {
        1u8
    } else if ma.pair2_id == Some(old_pair_id) {
        2u8
    } else {
        return Err(Error::PlayersNotAPair);
    };

    if ma.pair1_id == Some(new_pair_id) || ma.pair2_id == Some(new_pair_id) {
        return Err(Error::PlayersIdentical);
    }

    let old_pair = PlayerPair::get(conn, old_pair_id).await?;
    let new_pair = PlayerPair::get(conn, new_pair_id).await?;
    if new_pair.category_id != old_pair.category_id {
        return Err(Error::PlayerNotInCategory);
    }

    // keep the symbolic provenance when the slot had one
    let symbolic = if pos == 1 {
        ma.pair1_symbolic
    } else {
        ma.pair2_symbolic
    };
    if symbolic.is_some() {
        resolve_symbolic_slot(conn, match_id, pos, new_pair_id).await?;
    } else {
        Match::set_pair(conn, match_id, pos, new_pair_id).await?;
    }

    let ma = Match::get(conn, match_id).await?;
    refresh_match_state(conn, &ma).await?;
    Ok(())
}

/// Matches a pair can still be called for: its pending matches with both
/// slots resolved, soonest round first. This is the signal an external
/// court scheduler consumes.
pub async fn next_matches_for_pair(
    conn: &mut SqliteConnection,
    category_id: i64,
    pair_id: i64,
) -> Result<Vec<Match>> {
    let status = round_status::get(conn, category_id).await?;
    let mut result = Vec::new();
    for round in (status.finished_rounds + 1)..=status.highest_generated_round {
        if let Some(ma) = Match::find_for_pair_and_round(conn, category_id, pair_id, round).await? {
            if ma.state != MatchState::Finished {
                result.push(ma);
            }
        }
    }
    Ok(result)
}
