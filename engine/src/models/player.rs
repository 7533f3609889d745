use crate::db;
use crate::error::{Error, Result};
use sqlx::FromRow;
use sqlx::SqliteConnection;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum PlayerState {
    WaitForRegistration,
    Idle,
    Playing,
    Referee,
}

#[derive(Debug, Clone, FromRow)]
pub struct Player {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub team_id: Option<i64>,
    pub state: PlayerState,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, first_name, last_name, sex, team_id, state, seq_num";

impl Player {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }

    #[instrument(level = "debug", skip(conn))]
    pub async fn create(
        conn: &mut SqliteConnection,
        first_name: &str,
        last_name: &str,
        sex: Sex,
        team_id: Option<i64>,
    ) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "player").await?;
        let player = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO player (first_name, last_name, sex, team_id, seq_num)
             VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(first_name)
        .bind(last_name)
        .bind(sex)
        .bind(team_id)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(player)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let player = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM player WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(player)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("player {id}")))
    }

    pub async fn find_by_name(
        conn: &mut SqliteConnection,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Self>> {
        let player = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM player WHERE first_name = ? AND last_name = ?"
        ))
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(conn)
        .await?;
        Ok(player)
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let players = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM player ORDER BY seq_num ASC"
        ))
        .fetch_all(conn)
        .await?;
        Ok(players)
    }

    pub async fn set_state(
        conn: &mut SqliteConnection,
        id: i64,
        state: PlayerState,
    ) -> Result<()> {
        sqlx::query("UPDATE player SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_team(
        conn: &mut SqliteConnection,
        id: i64,
        team_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE player SET team_id = ? WHERE id = ?")
            .bind(team_id)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// True while any category still references the player, directly or
    /// through a pair. Such players may not be deleted.
    pub async fn is_referenced(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let in_category: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cat_player WHERE player_id = ?")
                .bind(id)
                .fetch_one(&mut *conn)
                .await?;
        if in_category > 0 {
            return Ok(true);
        }
        let in_pair: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pair WHERE player1_id = ? OR player2_id = ?")
                .bind(id)
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(in_pair > 0)
    }

    #[instrument(level = "debug", skip(conn))]
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        let player = Self::get(conn, id).await?;
        sqlx::query("DELETE FROM player WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        db::compact_seq_nums(conn, "player", player.seq_num).await
    }
}
