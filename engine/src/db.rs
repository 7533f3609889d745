use crate::error::{Error, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub type DbPool = SqlitePool;

/// Schema version written on create and enforced on open.
pub const DATABASE_VERSION: i64 = 3;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Opens (or creates) a tournament file and brings the schema up to date.
///
/// WAL mode keeps readers concurrent while SQLite serialises writers, which
/// is exactly the locking contract the engine guarantees. Use
/// `sqlite::memory:` as the URL for throwaway databases in tests.
pub async fn create_pool(database_url: &str) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    // WAL lets readers observe the last committed snapshot while SQLite
    // serialises the single writer, so file databases get a small pool
    // for concurrent read-only callers. In-memory databases exist per
    // connection and must stay on exactly one.
    let is_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
    let max_connections = if is_memory { 1 } else { 4 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

/// Allocates the next tournament-wide match number. Must be called inside
/// the transaction that persists the numbered matches.
pub async fn next_match_num(conn: &mut sqlx::SqliteConnection) -> Result<i64> {
    let num: i64 =
        sqlx::query_scalar("SELECT next_value FROM sequence WHERE seq_name = 'match_num'")
            .fetch_one(&mut *conn)
            .await?;

    sqlx::query("UPDATE sequence SET next_value = next_value + 1 WHERE seq_name = 'match_num'")
        .execute(&mut *conn)
        .await?;

    Ok(num)
}

/// Next seq_num for a table that keeps user-visible ordering.
pub async fn next_seq_num(conn: &mut sqlx::SqliteConnection, table: &str) -> Result<i64> {
    let query = format!("SELECT COALESCE(MAX(seq_num), 0) + 1 FROM \"{table}\"");
    let num: i64 = sqlx::query_scalar(&query).fetch_one(&mut *conn).await?;
    Ok(num)
}

/// Closes the gap left behind by a deleted row.
pub async fn compact_seq_nums(
    conn: &mut sqlx::SqliteConnection,
    table: &str,
    deleted_seq: i64,
) -> Result<()> {
    let query = format!("UPDATE \"{table}\" SET seq_num = seq_num - 1 WHERE seq_num > ?");
    sqlx::query(&query)
        .bind(deleted_seq)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Fails with [`Error::IncompatibleDatabaseVersion`] when the file was
/// written by an incompatible schema version.
pub async fn check_database_version(pool: &DbPool) -> Result<()> {
    let stored: Option<String> =
        sqlx::query_scalar("SELECT cfg_value FROM config WHERE cfg_key = 'DatabaseVersion'")
            .fetch_optional(pool)
            .await?;

    match stored {
        None => {
            sqlx::query("INSERT INTO config (cfg_key, cfg_value) VALUES ('DatabaseVersion', ?)")
                .bind(DATABASE_VERSION.to_string())
                .execute(pool)
                .await?;
            Ok(())
        }
        Some(v) if v.parse::<i64>() == Ok(DATABASE_VERSION) => Ok(()),
        Some(v) => Err(Error::IncompatibleDatabaseVersion(v)),
    }
}
