use crate::db::DbPool;
use crate::error::Result;

/// Well-known configuration keys. The config table is a plain key/value
/// store; anything outside this list is passed through untouched.
pub const KEY_TNMT_NAME: &str = "TnmtName";
pub const KEY_TNMT_ORGA: &str = "TnmtOrga";
pub const KEY_TNMT_DATE: &str = "TnmtDate";
pub const KEY_DATABASE_VERSION: &str = "DatabaseVersion";
pub const KEY_USE_TEAMS: &str = "UseTeams";
pub const KEY_CHANGE_LOG_ENABLED: &str = "ChangeLogEnabled";

pub async fn get(pool: &DbPool, key: &str) -> Result<Option<String>> {
    let value: Option<String> =
        sqlx::query_scalar("SELECT cfg_value FROM config WHERE cfg_key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value)
}

pub async fn set(conn: &mut sqlx::SqliteConnection, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO config (cfg_key, cfg_value) VALUES (?, ?)
         ON CONFLICT (cfg_key) DO UPDATE SET cfg_value = excluded.cfg_value",
    )
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

/// Bool values are stored as "0"/"1"; absent keys read as `false`.
pub async fn get_bool(pool: &DbPool, key: &str) -> Result<bool> {
    Ok(matches!(get(pool, key).await?.as_deref(), Some("1")))
}

pub async fn set_bool(conn: &mut sqlx::SqliteConnection, key: &str, value: bool) -> Result<()> {
    set(conn, key, if value { "1" } else { "0" }).await
}
