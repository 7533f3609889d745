//! Public Facade
//!
//! [`Tournament`] is the explicit context every caller works with: it
//! carries the database pool and nothing else. Each command validates its
//! inputs, runs in exactly one transaction and either commits or leaves
//! the database untouched. There are no singletons; several tournaments
//! can be open side by side.

use crate::config;
use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::category::{Category, CategorySex, CategoryState, MatchSystem, MatchType};
use crate::models::court::Court;
use crate::models::match_group::MatchGroup;
use crate::models::player::{Player, PlayerState, Sex};
use crate::models::player_pair::PlayerPair;
use crate::models::r#match::Match;
use crate::models::ranking_entry::RankingEntry;
use crate::models::team::Team;
use crate::score::MatchScore;
use crate::services::bracket_vis::BracketVisRow;
use crate::services::changelog::{self, ChangeLogEntry};
use crate::services::ko_config::KoConfig;
use crate::services::lifecycle;
use crate::services::match_engine;
use crate::services::ranking;
use crate::services::round_status::{self, RoundStatus};
use crate::services::strategy;
use tracing::instrument;

/// Basic tournament metadata written at registration time.
#[derive(Debug, Clone, Default)]
pub struct TournamentSettings {
    pub name: String,
    pub organizer: String,
    pub date: String,
    pub use_teams: bool,
}

pub struct Tournament {
    pool: DbPool,
}

impl Tournament {
    /// Opens (or creates) the tournament file behind `database_url` and
    /// enforces the schema version.
    pub async fn open(database_url: &str) -> Result<Self> {
        let pool = db::create_pool(database_url).await?;
        db::check_database_version(&pool).await?;
        Ok(Tournament { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Writes the registration metadata of a fresh tournament.
    #[instrument(level = "info", skip(self, settings), fields(name = %settings.name))]
    pub async fn register(&self, settings: &TournamentSettings) -> Result<()> {
        if settings.name.trim().is_empty() {
            return Err(Error::InvalidName(settings.name.clone()));
        }
        let mut tx = self.pool.begin().await?;
        config::set(&mut tx, config::KEY_TNMT_NAME, &settings.name).await?;
        config::set(&mut tx, config::KEY_TNMT_ORGA, &settings.organizer).await?;
        config::set(&mut tx, config::KEY_TNMT_DATE, &settings.date).await?;
        config::set_bool(&mut tx, config::KEY_USE_TEAMS, settings.use_teams).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        config::get(&self.pool, key).await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        config::set(&mut tx, key, value).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn uses_teams(&self) -> Result<bool> {
        config::get_bool(&self.pool, config::KEY_USE_TEAMS).await
    }

    // --- teams ---

    #[instrument(level = "info", skip(self))]
    pub async fn create_team(&self, name: &str) -> Result<Team> {
        if !self.uses_teams().await? {
            return Err(Error::NotUsingTeams);
        }
        if name.trim().is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        let mut tx = self.pool.begin().await?;
        if Team::find_by_name(&mut tx, name).await?.is_some() {
            return Err(Error::NameExists(name.to_string()));
        }
        let team = Team::create(&mut tx, name).await?;
        tx.commit().await?;
        Ok(team)
    }

    pub async fn rename_team(&self, team_id: i64, new_name: &str) -> Result<()> {
        if new_name.trim().is_empty() {
            return Err(Error::InvalidName(new_name.to_string()));
        }
        let mut tx = self.pool.begin().await?;
        Team::get(&mut tx, team_id).await?;
        if let Some(existing) = Team::find_by_name(&mut tx, new_name).await? {
            if existing.id != team_id {
                return Err(Error::NameExists(new_name.to_string()));
            }
        }
        Team::rename(&mut tx, team_id, new_name).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Removes a team; refused while any player still belongs to it.
    pub async fn delete_team(&self, team_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let team = Team::get(&mut tx, team_id).await?;
        let members: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM player WHERE team_id = ?")
            .bind(team_id)
            .fetch_one(&mut *tx)
            .await?;
        if members > 0 {
            return Err(Error::WrongState);
        }
        sqlx::query("DELETE FROM team WHERE id = ?")
            .bind(team_id)
            .execute(&mut *tx)
            .await?;
        db::compact_seq_nums(&mut tx, "team", team.seq_num).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn teams(&self) -> Result<Vec<Team>> {
        let mut conn = self.pool.acquire().await?;
        Team::list_all(&mut conn).await
    }

    // --- players ---

    #[instrument(level = "info", skip(self))]
    pub async fn create_player(
        &self,
        first_name: &str,
        last_name: &str,
        sex: Sex,
        team_id: Option<i64>,
    ) -> Result<Player> {
        if first_name.trim().is_empty() || last_name.trim().is_empty() {
            return Err(Error::InvalidName(format!("{first_name} {last_name}")));
        }
        if team_id.is_some() && !self.uses_teams().await? {
            return Err(Error::NotUsingTeams);
        }

        let mut tx = self.pool.begin().await?;
        if let Some(team_id) = team_id {
            Team::get(&mut tx, team_id).await?;
        }
        if Player::find_by_name(&mut tx, first_name, last_name)
            .await?
            .is_some()
        {
            return Err(Error::NameExists(format!("{first_name} {last_name}")));
        }
        let player = Player::create(&mut tx, first_name, last_name, sex, team_id).await?;
        tx.commit().await?;
        Ok(player)
    }

    /// WaitForRegistration -> Idle: the player showed up at the venue.
    pub async fn register_player(&self, player_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let player = Player::get(&mut tx, player_id).await?;
        if player.state != PlayerState::WaitForRegistration {
            return Err(Error::WrongState);
        }
        Player::set_state(&mut tx, player_id, PlayerState::Idle).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Idle -> WaitForRegistration; impossible while the player is on
    /// court or refereeing.
    pub async fn unregister_player(&self, player_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let player = Player::get(&mut tx, player_id).await?;
        if player.state != PlayerState::Idle {
            return Err(Error::WrongState);
        }
        Player::set_state(&mut tx, player_id, PlayerState::WaitForRegistration).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Deletes a player; refused while any category still references them.
    pub async fn delete_player(&self, player_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if Player::is_referenced(&mut tx, player_id).await? {
            return Err(Error::PlayerNotInCategory);
        }
        Player::delete(&mut tx, player_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn players(&self) -> Result<Vec<Player>> {
        let mut conn = self.pool.acquire().await?;
        Player::list_all(&mut conn).await
    }

    // --- category configuration ---

    #[instrument(level = "info", skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        if name.trim().is_empty() {
            return Err(Error::InvalidName(name.to_string()));
        }
        let mut tx = self.pool.begin().await?;
        if Category::find_by_name(&mut tx, name).await?.is_some() {
            return Err(Error::NameExists(name.to_string()));
        }
        let category = Category::create(&mut tx, name).await?;
        tx.commit().await?;
        Ok(category)
    }

    pub async fn rename_category(&self, category_id: i64, new_name: &str) -> Result<()> {
        if new_name.trim().is_empty() {
            return Err(Error::InvalidName(new_name.to_string()));
        }
        let mut tx = self.pool.begin().await?;
        Category::get(&mut tx, category_id).await?;
        if let Some(existing) = Category::find_by_name(&mut tx, new_name).await? {
            if existing.id != category_id {
                return Err(Error::NameExists(new_name.to_string()));
            }
        }
        Category::rename(&mut tx, category_id, new_name).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let mut conn = self.pool.acquire().await?;
        Category::list_all(&mut conn).await
    }

    pub async fn category(&self, category_id: i64) -> Result<Category> {
        let mut conn = self.pool.acquire().await?;
        Category::get(&mut conn, category_id).await
    }

    async fn configurable_category(
        &self,
        conn: &mut sqlx::SqliteConnection,
        category_id: i64,
    ) -> Result<Category> {
        let category = Category::get(conn, category_id).await?;
        if category.state != CategoryState::Config {
            return Err(Error::CategoryNotConfigurable);
        }
        Ok(category)
    }

    pub async fn set_category_match_type(
        &self,
        category_id: i64,
        match_type: MatchType,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let category = self.configurable_category(&mut tx, category_id).await?;
        // mixed implies both sexes
        if match_type == MatchType::Mixed && category.sex != CategorySex::DontCare {
            Category::set_sex(&mut tx, category_id, CategorySex::DontCare).await?;
        }
        Category::set_match_type(&mut tx, category_id, match_type).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_category_sex(&self, category_id: i64, sex: CategorySex) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let category = self.configurable_category(&mut tx, category_id).await?;
        if category.match_type == MatchType::Mixed && sex != CategorySex::DontCare {
            return Err(Error::InvalidSex);
        }
        Category::set_sex(&mut tx, category_id, sex).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_category_match_system(
        &self,
        category_id: i64,
        match_system: MatchSystem,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.configurable_category(&mut tx, category_id).await?;
        Category::set_match_system(&mut tx, category_id, match_system).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_category_parameters(
        &self,
        category_id: i64,
        allow_draw: bool,
        win_score: i64,
        draw_score: i64,
        rr_iterations: i64,
    ) -> Result<()> {
        if win_score < 1 || draw_score < 0 || rr_iterations < 1 {
            return Err(Error::InvalidReconfig);
        }
        let mut tx = self.pool.begin().await?;
        self.configurable_category(&mut tx, category_id).await?;
        Category::set_parameters(
            &mut tx,
            category_id,
            allow_draw,
            win_score,
            draw_score,
            rr_iterations,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_category_group_config(
        &self,
        category_id: i64,
        group_config: &str,
    ) -> Result<()> {
        // must parse, validity against the pair count is checked at freeze
        KoConfig::parse(group_config)?;
        let mut tx = self.pool.begin().await?;
        self.configurable_category(&mut tx, category_id).await?;
        Category::set_group_config(&mut tx, category_id, Some(group_config)).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- category membership and pairing ---

    pub async fn add_player_to_category(&self, category_id: i64, player_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let category = self.configurable_category(&mut tx, category_id).await?;
        let player = Player::get(&mut tx, player_id).await?;

        if let Some(required) = category.accepted_sex() {
            if player.sex != required {
                return Err(Error::InvalidSex);
            }
        }
        if Category::has_player(&mut tx, category_id, player_id).await? {
            return Err(Error::PlayerAlreadyPaired);
        }

        Category::add_player(&mut tx, category_id, player_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_player_from_category(
        &self,
        category_id: i64,
        player_id: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.configurable_category(&mut tx, category_id).await?;
        if !Category::has_player(&mut tx, category_id, player_id).await? {
            return Err(Error::PlayerNotInCategory);
        }
        if let Some(pair) = PlayerPair::find_for_player(&mut tx, category_id, player_id).await? {
            if pair.is_paired() {
                return Err(Error::PlayerAlreadyPaired);
            }
            PlayerPair::delete(&mut tx, pair.id).await?;
        }
        Category::remove_player(&mut tx, category_id, player_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Forms a doubles/mixed pair out of two category members.
    #[instrument(level = "info", skip(self))]
    pub async fn pair_players(
        &self,
        category_id: i64,
        player1_id: i64,
        player2_id: i64,
    ) -> Result<PlayerPair> {
        if player1_id == player2_id {
            return Err(Error::PlayersIdentical);
        }

        let mut tx = self.pool.begin().await?;
        let category = self.configurable_category(&mut tx, category_id).await?;
        if category.match_type == MatchType::Singles {
            return Err(Error::InvalidMatchType);
        }

        let player1 = Player::get(&mut tx, player1_id).await?;
        let player2 = Player::get(&mut tx, player2_id).await?;
        for player_id in [player1_id, player2_id] {
            if !Category::has_player(&mut tx, category_id, player_id).await? {
                return Err(Error::PlayerNotInCategory);
            }
            if PlayerPair::find_for_player(&mut tx, category_id, player_id)
                .await?
                .is_some()
            {
                return Err(Error::PlayerAlreadyPaired);
            }
        }

        match category.match_type {
            MatchType::Mixed => {
                if player1.sex == player2.sex {
                    return Err(Error::InvalidSex);
                }
            }
            MatchType::Doubles => {
                if let Some(required) = category.accepted_sex() {
                    if player1.sex != required || player2.sex != required {
                        return Err(Error::InvalidSex);
                    }
                }
            }
            MatchType::Singles => unreachable!("rejected above"),
        }

        let pair = PlayerPair::create(&mut tx, category_id, player1_id, Some(player2_id)).await?;
        tx.commit().await?;
        Ok(pair)
    }

    pub async fn split_pair(
        &self,
        category_id: i64,
        player1_id: i64,
        player2_id: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        self.configurable_category(&mut tx, category_id).await?;

        let pair = PlayerPair::find_for_player(&mut tx, category_id, player1_id)
            .await?
            .ok_or(Error::PlayersNotAPair)?;
        let members = [Some(pair.player1_id), pair.player2_id];
        if !members.contains(&Some(player2_id)) {
            return Err(Error::PlayersNotAPair);
        }
        PlayerPair::delete(&mut tx, pair.id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn pairs(&self, category_id: i64) -> Result<Vec<PlayerPair>> {
        let mut conn = self.pool.acquire().await?;
        PlayerPair::for_category(&mut conn, category_id).await
    }

    // --- lifecycle commands ---

    pub async fn freeze_category(&self, category_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::freeze(&mut tx, category_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn unfreeze_category(&self, category_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::unfreeze(&mut tx, category_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn apply_group_assignment(
        &self,
        category_id: i64,
        groups: &[Vec<i64>],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::apply_group_assignment(&mut tx, category_id, groups).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn apply_seeding(&self, category_id: i64, seeding: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::apply_initial_ranking(&mut tx, category_id, seeding).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn start_first_round(&self, category_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::start_first_round(&mut tx, category_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn apply_intermediate_seeding(
        &self,
        category_id: i64,
        seeding: &[i64],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::apply_intermediate_seeding(&mut tx, category_id, seeding).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn undo_last_round(&self, category_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        lifecycle::undo_last_round(&mut tx, category_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- match commands ---

    pub async fn call_match(&self, match_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::call_match(&mut tx, match_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn cancel_match_call(&self, match_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::cancel_match_call(&mut tx, match_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn postpone_match(&self, match_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::postpone_match(&mut tx, match_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn resume_match(&self, match_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::resume_match(&mut tx, match_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn stage_match_group(&self, group_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::stage_match_group(&mut tx, group_id).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn unstage_match_group(&self, group_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::unstage_match_group(&mut tx, group_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Records (or edits) a result and lets the lifecycle controller pull
    /// everything downstream: rankings, next rounds, state changes.
    #[instrument(level = "info", skip(self, score))]
    pub async fn record_match_score(
        &self,
        match_id: i64,
        score: &MatchScore,
        allow_flip: bool,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let ma = Match::get(&mut tx, match_id).await?;
        let group = MatchGroup::get(&mut tx, ma.group_id).await?;
        lifecycle::record_match_score(&mut tx, group.category_id, match_id, score, allow_flip)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Declares a walkover in favour of `winner_pair_id`.
    pub async fn walkover(&self, match_id: i64, winner_pair_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let ma = Match::get(&mut tx, match_id).await?;
        let winner_slot = if ma.pair1_id == Some(winner_pair_id) {
            1
        } else if ma.pair2_id == Some(winner_pair_id) {
            2
        } else {
            return Err(Error::PlayersNotAPair);
        };
        let group = MatchGroup::get(&mut tx, ma.group_id).await?;
        let score = MatchScore::Walkover { winner_slot };
        lifecycle::record_match_score(&mut tx, group.category_id, match_id, &score, false).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn swap_player(
        &self,
        match_id: i64,
        old_pair_id: i64,
        new_pair_id: i64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        match_engine::swap_player(&mut tx, match_id, old_pair_id, new_pair_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Assigns (or clears) the referee of a not-yet-finished match. The
    /// player must not be competing in it.
    pub async fn assign_referee(&self, match_id: i64, referee_id: Option<i64>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let ma = Match::get(&mut tx, match_id).await?;
        if ma.state == crate::models::MatchState::Finished {
            return Err(Error::WrongState);
        }
        if let Some(player_id) = referee_id {
            let player = Player::get(&mut tx, player_id).await?;
            if player.state == PlayerState::Playing {
                return Err(Error::WrongState);
            }
            for pair_id in [ma.pair1_id, ma.pair2_id].into_iter().flatten() {
                let pair = PlayerPair::get(&mut tx, pair_id).await?;
                if pair.player1_id == player_id || pair.player2_id == Some(player_id) {
                    return Err(Error::PlayerAlreadyPaired);
                }
            }
        }
        Match::set_referee(&mut tx, match_id, referee_id).await?;
        tx.commit().await?;
        Ok(())
    }

    // --- courts ---

    pub async fn create_court(&self, court_num: i64, name: Option<&str>) -> Result<Court> {
        let mut tx = self.pool.begin().await?;
        let court = Court::create(&mut tx, court_num, name).await?;
        tx.commit().await?;
        Ok(court)
    }

    pub async fn courts(&self) -> Result<Vec<Court>> {
        let mut conn = self.pool.acquire().await?;
        Court::list_all(&mut conn).await
    }

    // --- queries ---

    pub async fn matches(&self, category_id: i64) -> Result<Vec<Match>> {
        let mut conn = self.pool.acquire().await?;
        Match::for_category(&mut conn, category_id).await
    }

    pub async fn match_groups(&self, category_id: i64) -> Result<Vec<MatchGroup>> {
        let mut conn = self.pool.acquire().await?;
        MatchGroup::for_category(&mut conn, category_id).await
    }

    pub async fn round_status(&self, category_id: i64) -> Result<RoundStatus> {
        let mut conn = self.pool.acquire().await?;
        round_status::get(&mut conn, category_id).await
    }

    /// (total, unfinished, running) match counts of one round.
    pub async fn match_counts(&self, category_id: i64, round: i64) -> Result<(i64, i64, i64)> {
        let mut conn = self.pool.acquire().await?;
        round_status::match_counts(&mut conn, category_id, round).await
    }

    pub async fn total_rounds(&self, category_id: i64) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        let category = Category::get(&mut conn, category_id).await?;
        strategy::total_rounds(&mut conn, &category).await
    }

    /// Standings after a completed round, best rank first per group.
    pub async fn standings(&self, category_id: i64, round: i64) -> Result<Vec<RankingEntry>> {
        let mut conn = self.pool.acquire().await?;
        ranking::sorted_ranking(&mut conn, category_id, round).await
    }

    pub async fn in_out_list(
        &self,
        category_id: i64,
        round: i64,
    ) -> Result<(Vec<PlayerPair>, Vec<PlayerPair>)> {
        let mut conn = self.pool.acquire().await?;
        lifecycle::in_out_list(&mut conn, category_id, round).await
    }

    /// Pending matches of a pair, soonest first; the external court
    /// scheduler's input signal.
    pub async fn next_matches_for_pair(
        &self,
        category_id: i64,
        pair_id: i64,
    ) -> Result<Vec<Match>> {
        let mut conn = self.pool.acquire().await?;
        match_engine::next_matches_for_pair(&mut conn, category_id, pair_id).await
    }

    /// The persisted bracket sheet model for the external renderer.
    pub async fn bracket_visualisation(&self, category_id: i64) -> Result<Vec<BracketVisRow>> {
        let mut conn = self.pool.acquire().await?;
        crate::services::bracket_vis::for_category(&mut conn, category_id).await
    }

    // --- change log ---

    pub async fn enable_change_log(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        changelog::enable(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn disable_change_log(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        changelog::disable(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn change_log_enabled(&self) -> Result<bool> {
        changelog::is_enabled(&self.pool).await
    }

    pub async fn change_log(&self) -> Result<Vec<ChangeLogEntry>> {
        let mut conn = self.pool.acquire().await?;
        changelog::read_all(&mut conn).await
    }

    pub async fn compacted_change_log(&self) -> Result<Vec<ChangeLogEntry>> {
        let mut conn = self.pool.acquire().await?;
        let entries = changelog::read_all(&mut conn).await?;
        Ok(changelog::compact(&entries))
    }

    pub async fn clear_change_log(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        changelog::clear(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
