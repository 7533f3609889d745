use crate::db;
use crate::error::{Error, Result};
use sqlx::FromRow;
use sqlx::SqliteConnection;
use tracing::instrument;

/// Functional round tags. Positive group numbers are round-robin groups.
pub const GROUP_NUM_ITERATION: i64 = -1;
pub const GROUP_NUM_L16: i64 = -2;
pub const GROUP_NUM_QUARTERFINAL: i64 = -3;
pub const GROUP_NUM_SEMIFINAL: i64 = -4;
pub const GROUP_NUM_FINAL: i64 = -5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum GroupState {
    Config,
    Frozen,
    Idle,
    Scheduled,
    Playing,
    Finished,
}

#[derive(Debug, Clone, FromRow)]
pub struct MatchGroup {
    pub id: i64,
    pub category_id: i64,
    pub round: i64,
    pub grp_num: i64,
    pub state: GroupState,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, category_id, round, grp_num, state, seq_num";

impl MatchGroup {
    #[instrument(level = "debug", skip(conn))]
    pub async fn create(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
        grp_num: i64,
    ) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "match_group").await?;
        let group = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO match_group (category_id, round, grp_num, seq_num)
             VALUES (?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(category_id)
        .bind(round)
        .bind(grp_num)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(group)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let group = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM match_group WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(group)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("match group {id}")))
    }

    pub async fn for_category(conn: &mut SqliteConnection, category_id: i64) -> Result<Vec<Self>> {
        let groups = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM match_group WHERE category_id = ? ORDER BY round ASC, seq_num ASC"
        ))
        .bind(category_id)
        .fetch_all(conn)
        .await?;
        Ok(groups)
    }

    pub async fn for_category_and_round(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
    ) -> Result<Vec<Self>> {
        let groups = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM match_group WHERE category_id = ? AND round = ? ORDER BY seq_num ASC"
        ))
        .bind(category_id)
        .bind(round)
        .fetch_all(conn)
        .await?;
        Ok(groups)
    }

    pub async fn set_state(conn: &mut SqliteConnection, id: i64, state: GroupState) -> Result<()> {
        sqlx::query("UPDATE match_group SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        let group = Self::get(conn, id).await?;
        sqlx::query("DELETE FROM match_group WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        db::compact_seq_nums(conn, "match_group", group.seq_num).await
    }
}
