use crate::db;
use crate::error::{Error, Result};
use crate::models::player::Player;
use sqlx::FromRow;
use sqlx::SqliteConnection;
use tracing::instrument;

/// The competing unit inside a category: one player in singles, two in
/// doubles and mixed. `player2_id` absent marks an unpaired participant.
#[derive(Debug, Clone, FromRow)]
pub struct PlayerPair {
    pub id: i64,
    pub category_id: i64,
    pub player1_id: i64,
    pub player2_id: Option<i64>,
    pub grp_num: Option<i64>,
    pub initial_rank: Option<i64>,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, category_id, player1_id, player2_id, grp_num, initial_rank, seq_num";

impl PlayerPair {
    pub fn is_paired(&self) -> bool {
        self.player2_id.is_some()
    }

    #[instrument(level = "debug", skip(conn))]
    pub async fn create(
        conn: &mut SqliteConnection,
        category_id: i64,
        player1_id: i64,
        player2_id: Option<i64>,
    ) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "pair").await?;
        let pair = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO pair (category_id, player1_id, player2_id, seq_num)
             VALUES (?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(category_id)
        .bind(player1_id)
        .bind(player2_id)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(pair)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let pair = sqlx::query_as::<_, Self>(&format!("SELECT {COLUMNS} FROM pair WHERE id = ?"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(pair)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("player pair {id}")))
    }

    pub async fn for_category(conn: &mut SqliteConnection, category_id: i64) -> Result<Vec<Self>> {
        let pairs = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM pair WHERE category_id = ? ORDER BY seq_num ASC"
        ))
        .bind(category_id)
        .fetch_all(conn)
        .await?;
        Ok(pairs)
    }

    pub async fn for_category_and_group(
        conn: &mut SqliteConnection,
        category_id: i64,
        grp_num: i64,
    ) -> Result<Vec<Self>> {
        let pairs = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM pair WHERE category_id = ? AND grp_num = ? ORDER BY seq_num ASC"
        ))
        .bind(category_id)
        .bind(grp_num)
        .fetch_all(conn)
        .await?;
        Ok(pairs)
    }

    /// The pair a player belongs to within a category, if any.
    pub async fn find_for_player(
        conn: &mut SqliteConnection,
        category_id: i64,
        player_id: i64,
    ) -> Result<Option<Self>> {
        let pair = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM pair
             WHERE category_id = ? AND (player1_id = ? OR player2_id = ?)"
        ))
        .bind(category_id)
        .bind(player_id)
        .bind(player_id)
        .fetch_optional(conn)
        .await?;
        Ok(pair)
    }

    pub async fn set_group(conn: &mut SqliteConnection, id: i64, grp_num: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE pair SET grp_num = ? WHERE id = ?")
            .bind(grp_num)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_initial_rank(
        conn: &mut SqliteConnection,
        id: i64,
        initial_rank: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE pair SET initial_rank = ? WHERE id = ?")
            .bind(initial_rank)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        let pair = Self::get(conn, id).await?;
        sqlx::query("DELETE FROM pair WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        db::compact_seq_nums(conn, "pair", pair.seq_num).await
    }

    /// Both members as loaded players (one element for unpaired/singles).
    pub async fn players(&self, conn: &mut SqliteConnection) -> Result<Vec<Player>> {
        let mut players = vec![Player::get(conn, self.player1_id).await?];
        if let Some(p2) = self.player2_id {
            players.push(Player::get(conn, p2).await?);
        }
        Ok(players)
    }
}
