use crate::db;
use crate::error::{Error, Result};
use sqlx::FromRow;
use sqlx::SqliteConnection;

/// Courts are bookkeeping only: assignment policy lives outside the engine
/// and consumes the match-ready signal.
#[derive(Debug, Clone, FromRow)]
pub struct Court {
    pub id: i64,
    pub court_num: i64,
    pub name: Option<String>,
    pub state: String,
    pub seq_num: i64,
}

impl Court {
    pub async fn create(
        conn: &mut SqliteConnection,
        court_num: i64,
        name: Option<&str>,
    ) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "court").await?;
        let court = sqlx::query_as::<_, Self>(
            "INSERT INTO court (court_num, name, seq_num) VALUES (?, ?, ?)
             RETURNING id, court_num, name, state, seq_num",
        )
        .bind(court_num)
        .bind(name)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(court)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "SELECT id, court_num, name, state, seq_num FROM court WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| Error::NotFound(format!("court {id}")))
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let courts = sqlx::query_as::<_, Self>(
            "SELECT id, court_num, name, state, seq_num FROM court ORDER BY court_num ASC",
        )
        .fetch_all(conn)
        .await?;
        Ok(courts)
    }
}
