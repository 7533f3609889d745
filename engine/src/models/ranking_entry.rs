use crate::db;
use crate::error::Result;
use sqlx::FromRow;
use sqlx::SqliteConnection;

/// Group value for entries that rank across the whole category.
pub const NO_GROUP: i64 = -999;

/// Cumulative standing of one pair after one completed round. Entries are
/// written once per (category, round, pair) and only the rank field is
/// ever rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RankingEntry {
    pub id: i64,
    pub category_id: i64,
    pub round: i64,
    pub pair_id: i64,
    pub grp_num: i64,
    pub matches_won: i64,
    pub matches_drawn: i64,
    pub matches_lost: i64,
    pub games_won: i64,
    pub games_lost: i64,
    pub points_won: i64,
    pub points_lost: i64,
    pub rank: Option<i64>,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, category_id, round, pair_id, grp_num, matches_won, matches_drawn, \
                       matches_lost, games_won, games_lost, points_won, points_lost, rank, seq_num";

/// The counted portion of a ranking entry, accumulated match by match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairStats {
    pub matches_won: i64,
    pub matches_drawn: i64,
    pub matches_lost: i64,
    pub games_won: i64,
    pub games_lost: i64,
    pub points_won: i64,
    pub points_lost: i64,
}

impl RankingEntry {
    pub fn win_delta(&self) -> i64 {
        self.matches_won - self.matches_lost
    }

    pub fn game_delta(&self) -> i64 {
        self.games_won - self.games_lost
    }

    pub fn point_delta(&self) -> i64 {
        self.points_won - self.points_lost
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
        pair_id: i64,
        grp_num: i64,
        stats: &PairStats,
    ) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "ranking").await?;
        let entry = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO ranking (category_id, round, pair_id, grp_num, matches_won,
                                  matches_drawn, matches_lost, games_won, games_lost,
                                  points_won, points_lost, seq_num)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        ))
        .bind(category_id)
        .bind(round)
        .bind(pair_id)
        .bind(grp_num)
        .bind(stats.matches_won)
        .bind(stats.matches_drawn)
        .bind(stats.matches_lost)
        .bind(stats.games_won)
        .bind(stats.games_lost)
        .bind(stats.points_won)
        .bind(stats.points_lost)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(entry)
    }

    pub async fn for_category_and_round(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
    ) -> Result<Vec<Self>> {
        let entries = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM ranking WHERE category_id = ? AND round = ?
             ORDER BY grp_num ASC, rank ASC, seq_num ASC"
        ))
        .bind(category_id)
        .bind(round)
        .fetch_all(conn)
        .await?;
        Ok(entries)
    }

    pub async fn find_for_pair(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
        pair_id: i64,
    ) -> Result<Option<Self>> {
        let entry = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM ranking WHERE category_id = ? AND round = ? AND pair_id = ?"
        ))
        .bind(category_id)
        .bind(round)
        .bind(pair_id)
        .fetch_optional(conn)
        .await?;
        Ok(entry)
    }

    pub async fn set_rank(conn: &mut SqliteConnection, id: i64, rank: Option<i64>) -> Result<()> {
        sqlx::query("UPDATE ranking SET rank = ? WHERE id = ?")
            .bind(rank)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete_for_round(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
    ) -> Result<()> {
        sqlx::query("DELETE FROM ranking WHERE category_id = ? AND round = ?")
            .bind(category_id)
            .bind(round)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Highest round for which any entry exists in a category.
    pub async fn last_round_with_entries(
        conn: &mut SqliteConnection,
        category_id: i64,
    ) -> Result<Option<i64>> {
        let round: Option<i64> =
            sqlx::query_scalar("SELECT MAX(round) FROM ranking WHERE category_id = ?")
                .bind(category_id)
                .fetch_one(conn)
                .await?;
        Ok(round)
    }
}
