//! Category Strategies
//!
//! Every match system answers the same capability questions: may the
//! configuration freeze, does the category need seeding or group
//! assignments, how does the first round come into being, how many rounds
//! are there, and what happens when a round completes. Dispatch is a plain
//! match on the system tag; each arm is a thin policy over the match and
//! ranking engines.

use crate::error::{Error, Result};
use crate::models::category::{Category, CategoryState, MatchSystem, MatchType};
use crate::models::match_group::{GroupState, MatchGroup, GROUP_NUM_ITERATION};
use crate::models::player_pair::PlayerPair;
use crate::models::r#match::{Match, MatchState};
use crate::services::bracket::BracketKind;
use crate::services::ko_config::KoConfig;
use crate::services::match_engine;
use crate::services::ranking;
use crate::services::round_robin;
use crate::services::swiss;
use crate::services::{bracket, round_status};
use sqlx::SqliteConnection;
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// What the lifecycle controller must do after a completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Continue,
    /// Groups-then-KO finished its group phase and waits for user seeding.
    WaitForSeeding,
    /// A Swiss deadlock cut the schedule short; the category is done.
    FinalizeEarly,
}

pub fn needs_initial_ranking(system: MatchSystem) -> bool {
    matches!(
        system,
        MatchSystem::SwissLadder | MatchSystem::SingleElim | MatchSystem::Ranking1
    )
}

pub fn needs_group_initialization(system: MatchSystem) -> bool {
    system == MatchSystem::GroupsThenKo
}

fn bracket_kind(system: MatchSystem) -> Option<BracketKind> {
    match system {
        MatchSystem::SingleElim => Some(BracketKind::SingleElim),
        MatchSystem::Ranking1 => Some(BracketKind::Ranking1),
        _ => None,
    }
}

/// Players of the category that are not part of any complete pair. Only
/// meaningful for doubles and mixed; singles turn every player into a
/// pair of one at freeze time.
async fn has_unpaired_players(conn: &mut SqliteConnection, category: &Category) -> Result<bool> {
    let players = Category::players(conn, category.id).await?;
    for player in players {
        let pair = PlayerPair::find_for_player(conn, category.id, player.id).await?;
        match pair {
            Some(p) if p.is_paired() => {}
            _ => return Ok(true),
        }
    }
    Ok(false)
}

/// Pairs the category will compete with, counted the way freeze-time
/// validation needs it: one per player for singles, one per complete pair
/// otherwise.
async fn competing_pair_count(conn: &mut SqliteConnection, category: &Category) -> Result<i64> {
    if category.match_type == MatchType::Singles {
        let players = Category::players(conn, category.id).await?;
        Ok(players.len() as i64)
    } else {
        let pairs = PlayerPair::for_category(conn, category.id).await?;
        Ok(pairs.iter().filter(|p| p.is_paired()).count() as i64)
    }
}

/// Freeze precondition per match system.
#[instrument(level = "debug", skip(conn, category))]
pub async fn can_freeze(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
    if category.state != CategoryState::Config {
        return Err(Error::CategoryNotConfigurable);
    }

    if category.match_type != MatchType::Singles && has_unpaired_players(conn, category).await? {
        return Err(Error::UnpairedPlayers);
    }

    let num_pairs = competing_pair_count(conn, category).await?;

    match category.match_system {
        MatchSystem::RoundRobin | MatchSystem::SwissLadder => {
            if num_pairs < 3 {
                return Err(Error::InvalidPlayerCount);
            }
        }
        MatchSystem::SingleElim => {
            if num_pairs < 2 {
                return Err(Error::InvalidPlayerCount);
            }
        }
        MatchSystem::Ranking1 => {
            if num_pairs < 2 || num_pairs > 32 {
                return Err(Error::InvalidPlayerCount);
            }
        }
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            if !cfg.is_valid(num_pairs) {
                return Err(Error::InvalidKoConfig);
            }
        }
        // present in the enum but without a generator; never freezable
        MatchSystem::Random => return Err(Error::InvalidMatchType),
    }

    Ok(())
}

/// Pairs ordered by their seeded rank.
async fn seeded_pairs(conn: &mut SqliteConnection, category_id: i64) -> Result<Vec<PlayerPair>> {
    let mut pairs = PlayerPair::for_category(conn, category_id).await?;
    pairs.retain(|p| p.initial_rank.is_some());
    pairs.sort_by_key(|p| p.initial_rank);
    Ok(pairs)
}

/// Generates the matches of round one (or of the whole schedule, where
/// everything is known up front). Idempotent: an already initialised
/// category is left untouched.
#[instrument(level = "debug", skip(conn, category))]
pub async fn prepare_first_round(conn: &mut SqliteConnection, category: &Category) -> Result<()> {
    if category.state != CategoryState::Idle {
        return Err(Error::WrongState);
    }

    if !MatchGroup::for_category(conn, category.id).await?.is_empty() {
        return Ok(());
    }

    match category.match_system {
        MatchSystem::RoundRobin => {
            let pairs = PlayerPair::for_category(conn, category.id).await?;
            let rounds_per_iteration = round_robin::rounds_per_iteration(pairs.len());
            for iteration in 0..category.rr_iterations {
                let first_round = iteration * rounds_per_iteration + 1;
                match_engine::generate_group_matches(
                    conn,
                    category,
                    &pairs,
                    GROUP_NUM_ITERATION,
                    first_round,
                )
                .await?;
            }
        }
        MatchSystem::SwissLadder => {
            let pairs = seeded_pairs(conn, category.id).await?;
            let standings: Vec<i64> = pairs.iter().map(|p| p.id).collect();
            let plan = swiss::plan_next_round(&standings, &HashSet::new(), &HashMap::new())
                .ok_or(Error::InvalidPlayerCount)?;
            create_swiss_round(conn, category, 1, &plan).await?;
        }
        MatchSystem::SingleElim | MatchSystem::Ranking1 => {
            let seeding = seeded_pairs(conn, category.id).await?;
            let kind = bracket_kind(category.match_system).expect("elimination system");
            match_engine::generate_bracket_matches(conn, category, kind, &seeding, 1).await?;
        }
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            for grp in 1..=cfg.num_groups() {
                let members = PlayerPair::for_category_and_group(conn, category.id, grp).await?;
                match_engine::generate_group_matches(conn, category, &members, grp, 1).await?;
            }
        }
        MatchSystem::Random => return Err(Error::InvalidMatchType),
    }

    Ok(())
}

async fn create_swiss_round(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
    plan: &swiss::SwissRound,
) -> Result<()> {
    let group = MatchGroup::create(conn, category.id, round, GROUP_NUM_ITERATION).await?;
    for &(pair1, pair2) in &plan.pairings {
        let ma = Match::create(conn, group.id).await?;
        Match::set_pair(conn, ma.id, 1, pair1).await?;
        Match::set_pair(conn, ma.id, 2, pair2).await?;
    }
    MatchGroup::set_state(conn, group.id, GroupState::Frozen).await?;
    match_engine::close_match_group(conn, group.id).await?;
    Ok(())
}

/// Scheduled round count of a configured category.
pub async fn total_rounds(conn: &mut SqliteConnection, category: &Category) -> Result<i64> {
    if matches!(
        category.state,
        CategoryState::Config | CategoryState::Frozen
    ) {
        return Err(Error::WrongState);
    }

    let pairs = PlayerPair::for_category(conn, category.id).await?;
    let num_pairs = pairs.len();

    let total = match category.match_system {
        MatchSystem::RoundRobin => {
            category.rr_iterations * round_robin::rounds_per_iteration(num_pairs)
        }
        MatchSystem::SwissLadder => {
            let full = round_robin::rounds_per_iteration(num_pairs);
            category.round_limit.map_or(full, |limit| limit.min(full))
        }
        MatchSystem::SingleElim | MatchSystem::Ranking1 => {
            let kind = bracket_kind(category.match_system).expect("elimination system");
            bracket::num_rounds(kind, num_pairs as i64)
        }
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            cfg.num_group_rounds() + cfg.start_level.num_rounds()
        }
        MatchSystem::Random => return Err(Error::InvalidMatchType),
    };

    Ok(total)
}

/// Round-completion hook: writes rankings and, depending on the system,
/// spawns the next round or hands control back for a state change.
#[instrument(level = "debug", skip(conn, category))]
pub async fn on_round_completed(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<RoundOutcome> {
    match category.match_system {
        MatchSystem::RoundRobin => {
            write_round_entries(conn, category, round).await?;
            Ok(RoundOutcome::Continue)
        }
        MatchSystem::SwissLadder => {
            write_round_entries(conn, category, round).await?;
            if round >= total_rounds(conn, category).await? {
                return Ok(RoundOutcome::Continue);
            }
            match plan_swiss_round(conn, category, round).await? {
                Some(plan) => {
                    create_swiss_round(conn, category, round + 1, &plan).await?;
                    Ok(RoundOutcome::Continue)
                }
                None => {
                    // unresolvable pairing: announce the shortened schedule
                    Category::set_round_limit(conn, category.id, Some(round)).await?;
                    Ok(RoundOutcome::FinalizeEarly)
                }
            }
        }
        MatchSystem::SingleElim | MatchSystem::Ranking1 => {
            write_round_entries(conn, category, round).await?;
            Ok(RoundOutcome::Continue)
        }
        MatchSystem::GroupsThenKo => {
            write_round_entries(conn, category, round).await?;
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            if round == cfg.num_group_rounds() {
                Ok(RoundOutcome::WaitForSeeding)
            } else {
                Ok(RoundOutcome::Continue)
            }
        }
        MatchSystem::Random => Err(Error::InvalidMatchType),
    }
}

/// Writes (or rewrites, after a score edit) the ranking entries of one
/// completed round.
pub async fn write_round_entries(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<()> {
    crate::models::ranking_entry::RankingEntry::delete_for_round(conn, category.id, round).await?;

    let group_phase_rounds = match category.match_system {
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            KoConfig::parse(raw)?.num_group_rounds()
        }
        _ => 0,
    };

    let elimination_round = match category.match_system {
        MatchSystem::SingleElim | MatchSystem::Ranking1 => true,
        MatchSystem::GroupsThenKo => round > group_phase_rounds,
        _ => false,
    };

    if !elimination_round {
        let pairs = PlayerPair::for_category(conn, category.id).await?;
        ranking::create_unsorted_entries(conn, category, round, &pairs).await?;
        ranking::sort_entries(conn, category, round).await?;
        return Ok(());
    }

    // elimination rounds: survivors plus everyone already holding a final
    // rank get an entry; ranks come from the bracket, not from sorting
    let mut pairs = remaining_pairs_after_round(conn, category, round).await?;
    let mut listed: HashSet<i64> = pairs.iter().map(|p| p.id).collect();
    for r in 1..=round {
        for ma in Match::for_category_and_round(conn, category.id, r).await? {
            if ma.state != MatchState::Finished {
                continue;
            }
            for ranked in [
                ma.winner_rank.and(ma.winner_pair_id()?),
                ma.loser_rank.and(ma.loser_pair_id()?),
            ]
            .into_iter()
            .flatten()
            {
                if listed.insert(ranked) {
                    pairs.push(PlayerPair::get(conn, ranked).await?);
                }
            }
        }
    }

    ranking::create_unsorted_entries(conn, category, round, &pairs).await?;
    ranking::apply_bracket_ranks(conn, category, round).await?;
    Ok(())
}

async fn plan_swiss_round(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<Option<swiss::SwissRound>> {
    // standings order from the freshly sorted round ranking
    let entries = ranking::sorted_ranking(conn, category.id, round).await?;
    let mut standings: Vec<(i64, i64)> = entries
        .iter()
        .map(|e| (e.rank.unwrap_or(i64::MAX), e.pair_id))
        .collect();
    standings.sort_by_key(|&(rank, _)| rank);
    let standings: Vec<i64> = standings.into_iter().map(|(_, id)| id).collect();

    // everything played so far, as normalised combinations
    let mut past = HashSet::new();
    let mut byes: HashMap<i64, i64> = HashMap::new();
    for r in 1..=round {
        let mut played_this_round: HashSet<i64> = HashSet::new();
        for ma in Match::for_category_and_round(conn, category.id, r).await? {
            if let (Some(p1), Some(p2)) = (ma.pair1_id, ma.pair2_id) {
                let key = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
                past.insert(key);
                played_this_round.insert(p1);
                played_this_round.insert(p2);
            }
        }
        for &pair_id in &standings {
            if !played_this_round.contains(&pair_id) {
                *byes.entry(pair_id).or_insert(0) += 1;
            }
        }
    }

    Ok(swiss::plan_next_round(&standings, &past, &byes))
}

/// The pairs still "in" after a completed round. Round robin and Swiss
/// never eliminate anyone; elimination systems drop every pair that holds
/// a final rank or has no future match to play.
pub async fn remaining_pairs_after_round(
    conn: &mut SqliteConnection,
    category: &Category,
    round: i64,
) -> Result<Vec<PlayerPair>> {
    match category.match_system {
        MatchSystem::RoundRobin | MatchSystem::SwissLadder => {
            PlayerPair::for_category(conn, category.id).await
        }
        MatchSystem::SingleElim | MatchSystem::Ranking1 => {
            let all = PlayerPair::for_category(conn, category.id).await?;
            surviving_pairs(conn, category, all, 1, round).await
        }
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            let group_rounds = cfg.num_group_rounds();
            if round <= group_rounds {
                return PlayerPair::for_category(conn, category.id).await;
            }
            // KO phase: the qualifiers carry a seeding rank
            let qualifiers = seeded_pairs(conn, category.id).await?;
            surviving_pairs(conn, category, qualifiers, group_rounds + 1, round).await
        }
        MatchSystem::Random => Err(Error::InvalidMatchType),
    }
}

/// Applies the elimination rules round by round: a pair leaves the field
/// once it holds a final rank or has no future match, neither resolved nor
/// symbolic.
async fn surviving_pairs(
    conn: &mut SqliteConnection,
    category: &Category,
    start_set: Vec<PlayerPair>,
    first_round: i64,
    last_round: i64,
) -> Result<Vec<PlayerPair>> {
    let total = total_rounds(conn, category).await?;
    if last_round >= total {
        return Ok(Vec::new());
    }

    let mut remaining = start_set;
    for r in first_round..=last_round {
        for ma in Match::for_category_and_round(conn, category.id, r).await? {
            if ma.state != MatchState::Finished {
                continue;
            }
            let Some(winner) = ma.winner_pair_id()? else {
                continue;
            };
            let Some(loser) = ma.loser_pair_id()? else {
                continue;
            };

            let drop_pair = |pair_id: i64, remaining: &mut Vec<PlayerPair>| {
                remaining.retain(|p| p.id != pair_id);
            };

            if ma.winner_rank.is_some() {
                drop_pair(winner, &mut remaining);
            } else if !has_future_match(conn, category, &ma, winner, r, total, true).await? {
                drop_pair(winner, &mut remaining);
            }

            if ma.loser_rank.is_some() {
                drop_pair(loser, &mut remaining);
            } else if !has_future_match(conn, category, &ma, loser, r, total, false).await? {
                drop_pair(loser, &mut remaining);
            }
        }
    }

    Ok(remaining)
}

async fn has_future_match(
    conn: &mut SqliteConnection,
    category: &Category,
    ma: &Match,
    pair_id: i64,
    round: i64,
    total_rounds: i64,
    as_winner: bool,
) -> Result<bool> {
    for r in (round + 1)..=total_rounds {
        if Match::find_for_pair_and_round(conn, category.id, pair_id, r)
            .await?
            .is_some()
        {
            return Ok(true);
        }
    }

    let symbolic = if as_winner { ma.id } else { -ma.id };
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM \"match\" WHERE pair1_symbolic = ? OR pair2_symbolic = ?",
    )
    .bind(symbolic)
    .bind(symbolic)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Rebuilds the entries of every completed round from `from_round` on,
/// after a score edit changed history.
#[instrument(level = "debug", skip(conn, category))]
pub async fn rebuild_rankings_from(
    conn: &mut SqliteConnection,
    category: &Category,
    from_round: i64,
) -> Result<()> {
    let status = round_status::get(conn, category.id).await?;
    let last = crate::models::ranking_entry::RankingEntry::last_round_with_entries(
        conn,
        category.id,
    )
    .await?
    .unwrap_or(0)
    .max(status.finished_rounds);

    for round in from_round..=last {
        write_round_entries(conn, category, round).await?;
    }
    Ok(())
}
