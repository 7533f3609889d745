use crate::db;
use crate::error::{Error, Result};
use crate::models::player::{Player, Sex};
use sqlx::FromRow;
use sqlx::SqliteConnection;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum MatchType {
    Singles,
    Doubles,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum CategorySex {
    Male,
    Female,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum MatchSystem {
    RoundRobin,
    SwissLadder,
    SingleElim,
    Ranking1,
    GroupsThenKo,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum CategoryState {
    Config,
    Frozen,
    Idle,
    Playing,
    WaitForIntermediateSeeding,
    Finalized,
}

#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub match_type: MatchType,
    pub sex: CategorySex,
    pub match_system: MatchSystem,
    pub state: CategoryState,
    pub allow_draw: bool,
    pub win_score: i64,
    pub draw_score: i64,
    pub group_config: Option<String>,
    pub rr_iterations: i64,
    pub round_limit: Option<i64>,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, name, match_type, sex, match_system, state, allow_draw, win_score, \
                       draw_score, group_config, rr_iterations, round_limit, seq_num";

impl Category {
    #[instrument(level = "debug", skip(conn))]
    pub async fn create(conn: &mut SqliteConnection, name: &str) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "category").await?;
        let cat = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO category (name, seq_num) VALUES (?, ?) RETURNING {COLUMNS}"
        ))
        .bind(name)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(cat)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let cat = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM category WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(cat)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("category {id}")))
    }

    pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Self>> {
        let cat = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM category WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(conn)
        .await?;
        Ok(cat)
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let cats = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM category ORDER BY seq_num ASC"
        ))
        .fetch_all(conn)
        .await?;
        Ok(cats)
    }

    /// State transitions go through the lifecycle controller; nothing else
    /// may call this.
    pub(crate) async fn set_state(
        conn: &mut SqliteConnection,
        id: i64,
        state: CategoryState,
    ) -> Result<()> {
        sqlx::query("UPDATE category SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn rename(conn: &mut SqliteConnection, id: i64, new_name: &str) -> Result<()> {
        sqlx::query("UPDATE category SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_match_type(
        conn: &mut SqliteConnection,
        id: i64,
        match_type: MatchType,
    ) -> Result<()> {
        sqlx::query("UPDATE category SET match_type = ? WHERE id = ?")
            .bind(match_type)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_sex(conn: &mut SqliteConnection, id: i64, sex: CategorySex) -> Result<()> {
        sqlx::query("UPDATE category SET sex = ? WHERE id = ?")
            .bind(sex)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_match_system(
        conn: &mut SqliteConnection,
        id: i64,
        match_system: MatchSystem,
    ) -> Result<()> {
        sqlx::query("UPDATE category SET match_system = ? WHERE id = ?")
            .bind(match_system)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_parameters(
        conn: &mut SqliteConnection,
        id: i64,
        allow_draw: bool,
        win_score: i64,
        draw_score: i64,
        rr_iterations: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE category SET allow_draw = ?, win_score = ?, draw_score = ?, rr_iterations = ?
             WHERE id = ?",
        )
        .bind(allow_draw)
        .bind(win_score)
        .bind(draw_score)
        .bind(rr_iterations)
        .bind(id)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn set_group_config(
        conn: &mut SqliteConnection,
        id: i64,
        group_config: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE category SET group_config = ? WHERE id = ?")
            .bind(group_config)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub(crate) async fn set_round_limit(
        conn: &mut SqliteConnection,
        id: i64,
        round_limit: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE category SET round_limit = ? WHERE id = ?")
            .bind(round_limit)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    // --- membership ---

    pub async fn add_player(conn: &mut SqliteConnection, id: i64, player_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO cat_player (category_id, player_id) VALUES (?, ?)")
            .bind(id)
            .bind(player_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn remove_player(conn: &mut SqliteConnection, id: i64, player_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cat_player WHERE category_id = ? AND player_id = ?")
            .bind(id)
            .bind(player_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn has_player(conn: &mut SqliteConnection, id: i64, player_id: i64) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cat_player WHERE category_id = ? AND player_id = ?")
                .bind(id)
                .bind(player_id)
                .fetch_one(conn)
                .await?;
        Ok(count > 0)
    }

    pub async fn players(conn: &mut SqliteConnection, id: i64) -> Result<Vec<Player>> {
        let players = sqlx::query_as::<_, Player>(
            "SELECT p.id, p.first_name, p.last_name, p.sex, p.team_id, p.state, p.seq_num
             FROM player p JOIN cat_player cp ON cp.player_id = p.id
             WHERE cp.category_id = ?
             ORDER BY p.seq_num ASC",
        )
        .bind(id)
        .fetch_all(conn)
        .await?;
        Ok(players)
    }

    /// The player sex a category accepts; `None` means both.
    pub fn accepted_sex(&self) -> Option<Sex> {
        match (self.match_type, self.sex) {
            (MatchType::Mixed, _) => None,
            (_, CategorySex::Male) => Some(Sex::Male),
            (_, CategorySex::Female) => Some(Sex::Female),
            (_, CategorySex::DontCare) => None,
        }
    }
}
