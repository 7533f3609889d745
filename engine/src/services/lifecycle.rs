//! Category Lifecycle Controller
//!
//! The one place that writes `category.state`. Every user-visible command
//! funnels through here, consults the category's strategy for its
//! preconditions, and performs the transition plus its side effects inside
//! the caller's transaction.
//!
//! CONFIG -> FROZEN -> IDLE -> PLAYING -> FINALIZED, with
//! WAIT_FOR_INTERMEDIATE_SEEDING spliced in between the group and KO
//! phases of groups-then-KO categories.

use crate::error::{Error, Result};
use crate::models::category::{Category, CategoryState, MatchSystem, MatchType};
use crate::models::match_group::MatchGroup;
use crate::models::player_pair::PlayerPair;
use crate::models::r#match::{Match, MatchState};
use crate::models::ranking_entry::RankingEntry;
use crate::services::bracket::BracketKind;
use crate::services::ko_config::KoConfig;
use crate::services::match_engine;
use crate::services::ranking;
use crate::services::round_status;
use crate::services::strategy::{self, RoundOutcome};
use sqlx::SqliteConnection;
use std::collections::HashSet;
use tracing::instrument;

/// Config -> Frozen. Validates via the strategy and materialises the
/// singles pairs (each player becomes a pair of one).
#[instrument(level = "debug", skip(conn))]
pub async fn freeze(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    strategy::can_freeze(conn, &category).await?;

    if category.match_type == MatchType::Singles {
        for player in Category::players(conn, category_id).await? {
            let existing = PlayerPair::find_for_player(conn, category_id, player.id).await?;
            if existing.is_none() {
                PlayerPair::create(conn, category_id, player.id, None).await?;
            }
        }
    }

    Category::set_state(conn, category_id, CategoryState::Frozen).await
}

/// Frozen -> Config. Drops the generated singles pairs and all seeding and
/// grouping decisions so the configuration can be edited again.
#[instrument(level = "debug", skip(conn))]
pub async fn unfreeze(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    if category.state != CategoryState::Frozen {
        return Err(Error::WrongState);
    }

    for pair in PlayerPair::for_category(conn, category_id).await? {
        if category.match_type == MatchType::Singles {
            PlayerPair::delete(conn, pair.id).await?;
        } else {
            PlayerPair::set_group(conn, pair.id, None).await?;
            PlayerPair::set_initial_rank(conn, pair.id, None).await?;
        }
    }

    Category::set_state(conn, category_id, CategoryState::Config).await
}

/// Assigns the round-robin groups of a groups-then-KO category and moves
/// it on to Idle. `groups[i]` lists the pair ids of group `i + 1`.
#[instrument(level = "debug", skip(conn, groups))]
pub async fn apply_group_assignment(
    conn: &mut SqliteConnection,
    category_id: i64,
    groups: &[Vec<i64>],
) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    match category.state {
        CategoryState::Frozen => {}
        CategoryState::Config => return Err(Error::CategoryNotYetFrozen),
        _ => return Err(Error::WrongState),
    }
    if !strategy::needs_group_initialization(category.match_system) {
        return Err(Error::CategoryNeedsNoGroupAssignments);
    }

    let raw = category
        .group_config
        .as_deref()
        .ok_or(Error::InvalidKoConfig)?;
    let cfg = KoConfig::parse(raw)?;

    if groups.len() as i64 != cfg.num_groups() {
        return Err(Error::InvalidGroupNum);
    }

    // the group sizes must match the configured blocks
    let mut wanted: Vec<i64> = cfg
        .group_defs
        .iter()
        .flat_map(|d| std::iter::repeat_n(d.group_size, d.num_groups as usize))
        .collect();
    let mut given: Vec<i64> = groups.iter().map(|g| g.len() as i64).collect();
    wanted.sort_unstable();
    given.sort_unstable();
    if wanted != given {
        return Err(Error::InvalidKoConfig);
    }

    // and the assignment must cover every pair exactly once
    let all_pairs: HashSet<i64> = PlayerPair::for_category(conn, category_id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    let assigned: Vec<i64> = groups.iter().flatten().copied().collect();
    let assigned_set: HashSet<i64> = assigned.iter().copied().collect();
    if assigned.len() != assigned_set.len() || assigned_set != all_pairs {
        return Err(Error::InvalidSeedingList);
    }

    for (idx, members) in groups.iter().enumerate() {
        for &pair_id in members {
            PlayerPair::set_group(conn, pair_id, Some(idx as i64 + 1)).await?;
        }
    }

    Category::set_state(conn, category_id, CategoryState::Idle).await
}

/// Stores the initial seeding of a seeded category and moves it on to
/// Idle. The list must be a permutation of all pairs, best first.
#[instrument(level = "debug", skip(conn, seeding))]
pub async fn apply_initial_ranking(
    conn: &mut SqliteConnection,
    category_id: i64,
    seeding: &[i64],
) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    match category.state {
        CategoryState::Frozen => {}
        CategoryState::Config => return Err(Error::CategoryNotYetFrozen),
        _ => return Err(Error::WrongState),
    }
    if !strategy::needs_initial_ranking(category.match_system) {
        return Err(Error::CategoryNeedsNoSeeding);
    }

    let all_pairs: HashSet<i64> = PlayerPair::for_category(conn, category_id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    let seeded_set: HashSet<i64> = seeding.iter().copied().collect();
    if seeding.len() != seeded_set.len() || seeded_set != all_pairs {
        return Err(Error::InvalidSeedingList);
    }

    for (idx, &pair_id) in seeding.iter().enumerate() {
        PlayerPair::set_initial_rank(conn, pair_id, Some(idx as i64 + 1)).await?;
    }

    Category::set_state(conn, category_id, CategoryState::Idle).await
}

/// Kicks a category off: generates the first round (or the whole
/// schedule) and transitions to Playing. Categories without seeding or
/// grouping needs come straight from Frozen.
#[instrument(level = "debug", skip(conn))]
pub async fn start_first_round(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    let category = Category::get(conn, category_id).await?;

    match category.state {
        CategoryState::Idle => {}
        CategoryState::Frozen => {
            // seeding or group assignments must have happened first
            if strategy::needs_initial_ranking(category.match_system)
                || strategy::needs_group_initialization(category.match_system)
            {
                return Err(Error::WrongState);
            }
            Category::set_state(conn, category_id, CategoryState::Idle).await?;
        }
        CategoryState::Config => return Err(Error::CategoryNotYetFrozen),
        _ => return Err(Error::WrongState),
    }

    let category = Category::get(conn, category_id).await?;
    strategy::prepare_first_round(conn, &category).await?;
    Category::set_state(conn, category_id, CategoryState::Playing).await
}

/// Called after every finished match: fires the strategy's
/// round-completed hook for each newly completed round (in order) and
/// performs the resulting state transition.
#[instrument(level = "debug", skip(conn))]
pub async fn handle_match_finished(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    let status = round_status::get(conn, category_id).await?;
    let processed = RankingEntry::last_round_with_entries(conn, category_id)
        .await?
        .unwrap_or(0);

    for round in (processed + 1)..=status.finished_rounds {
        let category = Category::get(conn, category_id).await?;
        match strategy::on_round_completed(conn, &category, round).await? {
            RoundOutcome::Continue => {
                if round >= strategy::total_rounds(conn, &category).await? {
                    Category::set_state(conn, category_id, CategoryState::Finalized).await?;
                }
            }
            RoundOutcome::WaitForSeeding => {
                Category::set_state(
                    conn,
                    category_id,
                    CategoryState::WaitForIntermediateSeeding,
                )
                .await?;
            }
            RoundOutcome::FinalizeEarly => {
                Category::set_state(conn, category_id, CategoryState::Finalized).await?;
            }
        }
    }

    Ok(())
}

/// Records a score through the match engine, then updates rankings and the
/// category state. Editing a finished match rebuilds every later completed
/// round's standings as well.
#[instrument(level = "debug", skip(conn, score))]
pub async fn record_match_score(
    conn: &mut SqliteConnection,
    category_id: i64,
    match_id: i64,
    score: &crate::score::MatchScore,
    allow_flip: bool,
) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    let ma = Match::get(conn, match_id).await?;
    let group = MatchGroup::get(conn, ma.group_id).await?;
    if group.category_id != category_id {
        return Err(Error::NotFound(format!("match {match_id}")));
    }

    let editing = ma.state == MatchState::Finished;

    match_engine::set_match_score(conn, &category, match_id, score, allow_flip).await?;

    if editing {
        // history changed: every completed round from here on re-derives
        strategy::rebuild_rankings_from(conn, &category, group.round).await?;
    } else {
        handle_match_finished(conn, category_id).await?;
    }

    Ok(())
}

/// WaitForIntermediateSeeding -> Playing: takes the user's KO seeding,
/// validates it against the group-phase qualifiers and generates the KO
/// bracket.
#[instrument(level = "debug", skip(conn, seeding))]
pub async fn apply_intermediate_seeding(
    conn: &mut SqliteConnection,
    category_id: i64,
    seeding: &[i64],
) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    if category.state != CategoryState::WaitForIntermediateSeeding {
        return Err(Error::WrongState);
    }

    let raw = category
        .group_config
        .as_deref()
        .ok_or(Error::InvalidKoConfig)?;
    let cfg = KoConfig::parse(raw)?;
    let group_rounds = cfg.num_group_rounds();

    let expected = expected_qualifiers(conn, &category, &cfg, group_rounds).await?;
    let seeded_set: HashSet<i64> = seeding.iter().copied().collect();
    if seeding.len() != seeded_set.len() || seeded_set != expected {
        return Err(Error::InvalidSeedingList);
    }

    let mut qualifier_pairs = Vec::with_capacity(seeding.len());
    for (idx, &pair_id) in seeding.iter().enumerate() {
        PlayerPair::set_initial_rank(conn, pair_id, Some(idx as i64 + 1)).await?;
        qualifier_pairs.push(PlayerPair::get(conn, pair_id).await?);
    }

    match_engine::generate_bracket_matches(
        conn,
        &category,
        BracketKind::SingleElim,
        &qualifier_pairs,
        group_rounds + 1,
    )
    .await?;

    Category::set_state(conn, category_id, CategoryState::Playing).await
}

/// The pairs entitled to enter the KO phase: each group's winner, plus its
/// runner-up when the configuration lets seconds survive.
async fn expected_qualifiers(
    conn: &mut SqliteConnection,
    category: &Category,
    cfg: &KoConfig,
    group_rounds: i64,
) -> Result<HashSet<i64>> {
    let entries = ranking::sorted_ranking(conn, category.id, group_rounds).await?;
    let cut = if cfg.second_survives { 2 } else { 1 };
    Ok(entries
        .iter()
        .filter(|e| e.grp_num > 0 && e.rank.is_some_and(|r| r <= cut))
        .map(|e| e.pair_id)
        .collect())
}

/// Rolls the last completed round back: rankings deleted, its matches
/// reopened, generated-but-unplayed follow-up rounds removed. Refused as
/// soon as any later match has started.
#[instrument(level = "debug", skip(conn))]
pub async fn undo_last_round(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    let category = Category::get(conn, category_id).await?;
    let status = round_status::get(conn, category_id).await?;
    let last = status.finished_rounds;
    if last < 1 {
        return Err(Error::InvalidRound);
    }

    // nothing after the round may have started
    for round in (last + 1)..=status.highest_generated_round {
        let matches = Match::for_category_and_round(conn, category_id, round).await?;
        if matches
            .iter()
            .any(|m| matches!(m.state, MatchState::Busy | MatchState::Finished))
        {
            return Err(Error::WrongState);
        }
    }

    // standings of the round (and anything later, defensively) disappear
    let last_entries = RankingEntry::last_round_with_entries(conn, category_id)
        .await?
        .unwrap_or(0);
    for round in last..=last_entries.max(last) {
        RankingEntry::delete_for_round(conn, category_id, round).await?;
    }

    // rounds that exist only as generated follow-up of the undone round
    // are removed entirely: the Swiss next round, or a KO phase hanging
    // off an undone final group round
    let regenerated_later_rounds = match category.match_system {
        MatchSystem::SwissLadder => true,
        MatchSystem::GroupsThenKo => {
            let raw = category
                .group_config
                .as_deref()
                .ok_or(Error::InvalidKoConfig)?;
            let cfg = KoConfig::parse(raw)?;
            last == cfg.num_group_rounds()
        }
        _ => false,
    };
    if regenerated_later_rounds {
        for round in (last + 1)..=status.highest_generated_round {
            for ma in Match::for_category_and_round(conn, category_id, round).await? {
                Match::delete(conn, ma.id).await?;
            }
            for group in MatchGroup::for_category_and_round(conn, category_id, round).await? {
                MatchGroup::delete(conn, group.id).await?;
            }
        }
        if category.match_system == MatchSystem::GroupsThenKo {
            for pair in PlayerPair::for_category(conn, category_id).await? {
                PlayerPair::set_initial_rank(conn, pair.id, None).await?;
            }
        }
    } else {
        // elimination brackets persist; only the propagated pairs leave
        // their successor slots again
        for ma in Match::for_category_and_round(conn, category_id, last).await? {
            for successor in Match::successors(conn, ma.id).await? {
                for (pos, symbolic) in [
                    (1u8, successor.pair1_symbolic),
                    (2u8, successor.pair2_symbolic),
                ] {
                    if symbolic.map(i64::abs) == Some(ma.id) {
                        let query = if pos == 1 {
                            "UPDATE \"match\" SET pair1_id = NULL WHERE id = ?"
                        } else {
                            "UPDATE \"match\" SET pair2_id = NULL WHERE id = ?"
                        };
                        sqlx::query(query)
                            .bind(successor.id)
                            .execute(&mut *conn)
                            .await?;
                    }
                }
                let successor = Match::get(conn, successor.id).await?;
                match_engine::refresh_match_state(conn, &successor).await?;
            }
        }
    }

    // reopen the round itself
    for ma in Match::for_category_and_round(conn, category_id, last).await? {
        Match::clear_score(conn, ma.id).await?;
        Match::set_state(conn, ma.id, MatchState::Waiting).await?;
        let ma = Match::get(conn, ma.id).await?;
        match_engine::refresh_match_state(conn, &ma).await?;
    }
    for group in MatchGroup::for_category_and_round(conn, category_id, last).await? {
        MatchGroup::set_state(conn, group.id, crate::models::GroupState::Idle).await?;
    }

    if category.round_limit.is_some_and(|limit| limit >= last) {
        Category::set_round_limit(conn, category_id, None).await?;
    }

    Category::set_state(conn, category_id, CategoryState::Playing).await
}

/// "In" and "out" lists after a completed round: who is still competing,
/// who has left the field.
pub async fn in_out_list(
    conn: &mut SqliteConnection,
    category_id: i64,
    round: i64,
) -> Result<(Vec<PlayerPair>, Vec<PlayerPair>)> {
    let category = Category::get(conn, category_id).await?;
    let status = round_status::get(conn, category_id).await?;
    if round < 1 || round > status.finished_rounds {
        return Err(Error::InvalidRound);
    }

    let still_in = strategy::remaining_pairs_after_round(conn, &category, round).await?;
    let in_ids: HashSet<i64> = still_in.iter().map(|p| p.id).collect();
    let out = PlayerPair::for_category(conn, category_id)
        .await?
        .into_iter()
        .filter(|p| !in_ids.contains(&p.id))
        .collect();

    Ok((still_in, out))
}
