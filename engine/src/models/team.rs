use crate::db;
use crate::error::{Error, Result};
use sqlx::FromRow;
use sqlx::SqliteConnection;

#[derive(Debug, Clone, FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub seq_num: i64,
}

impl Team {
    pub async fn create(conn: &mut SqliteConnection, name: &str) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "team").await?;
        let team = sqlx::query_as::<_, Self>(
            "INSERT INTO team (name, seq_num) VALUES (?, ?) RETURNING id, name, seq_num",
        )
        .bind(name)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(team)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let team = sqlx::query_as::<_, Self>("SELECT id, name, seq_num FROM team WHERE id = ?")
            .bind(id)
            .fetch_optional(conn)
            .await?;
        Ok(team)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("team {id}")))
    }

    pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Self>> {
        let team = sqlx::query_as::<_, Self>("SELECT id, name, seq_num FROM team WHERE name = ?")
            .bind(name)
            .fetch_optional(conn)
            .await?;
        Ok(team)
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<Self>> {
        let teams =
            sqlx::query_as::<_, Self>("SELECT id, name, seq_num FROM team ORDER BY seq_num ASC")
                .fetch_all(conn)
                .await?;
        Ok(teams)
    }

    pub async fn rename(conn: &mut SqliteConnection, id: i64, new_name: &str) -> Result<()> {
        sqlx::query("UPDATE team SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
