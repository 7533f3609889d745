//! Change Log
//!
//! Row-level audit stream for external synchronisation. Capture happens
//! through per-table SQLite triggers, so every logged row is written by
//! the very transaction that performed the user change and the log can
//! never drift from the data. Disabled by default; enabling installs the
//! triggers (they live in the schema and survive reopen), disabling drops
//! them.
//!
//! The compaction pass shrinks a log to its minimal equivalent: redundant
//! updates collapse onto the newest one, insert-then-delete histories
//! vanish entirely. The compacted log is the unit of partial sync, and
//! replaying it onto an empty schema reproduces the source database.

use crate::config;
use crate::db::DbPool;
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use sqlx::FromRow;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
pub enum ChangeAction {
    #[sqlx(rename = "I")]
    Insert,
    #[sqlx(rename = "U")]
    Update,
    #[sqlx(rename = "D")]
    Delete,
}

#[derive(Debug, Clone, FromRow)]
pub struct ChangeLogEntry {
    pub seq: i64,
    pub table_name: String,
    pub row_id: i64,
    pub action: ChangeAction,
    /// JSON object of the row after the change; absent for deletes.
    pub snapshot: Option<String>,
    pub logged_at: NaiveDateTime,
}

/// Audited tables with their column lists, parents before children so a
/// replayed log satisfies the foreign key graph.
const AUDITED_TABLES: &[(&str, &[&str])] = &[
    ("config", &["cfg_key", "cfg_value"]),
    ("team", &["id", "name", "seq_num"]),
    (
        "player",
        &["id", "first_name", "last_name", "sex", "team_id", "state", "seq_num"],
    ),
    (
        "category",
        &[
            "id", "name", "match_type", "sex", "match_system", "state", "allow_draw",
            "win_score", "draw_score", "group_config", "rr_iterations", "round_limit", "seq_num",
        ],
    ),
    ("cat_player", &["category_id", "player_id"]),
    (
        "pair",
        &["id", "category_id", "player1_id", "player2_id", "grp_num", "initial_rank", "seq_num"],
    ),
    (
        "match_group",
        &["id", "category_id", "round", "grp_num", "state", "seq_num"],
    ),
    (
        "match",
        &[
            "id", "group_id", "match_num", "pair1_id", "pair2_id", "pair1_symbolic",
            "pair2_symbolic", "referee_id", "score", "walkover", "winner_rank", "loser_rank",
            "state", "seq_num",
        ],
    ),
    (
        "ranking",
        &[
            "id", "category_id", "round", "pair_id", "grp_num", "matches_won", "matches_drawn",
            "matches_lost", "games_won", "games_lost", "points_won", "points_lost", "rank",
            "seq_num",
        ],
    ),
    ("court", &["id", "court_num", "name", "state", "seq_num"]),
    (
        "bracket_vis",
        &[
            "id", "category_id", "match_id", "page", "grid_x", "grid_y", "y_span",
            "y_page_break_span", "next_page", "orientation", "terminator",
            "terminator_offset_y", "initial_rank1", "initial_rank2",
        ],
    ),
    ("sequence", &["seq_name", "next_value"]),
];

fn json_object_expr(columns: &[&str], prefix: &str) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("'{c}', {prefix}.\"{c}\""))
        .collect();
    format!("json_object({})", parts.join(", "))
}

/// Installs the capture triggers and flips the config flag.
#[instrument(level = "debug", skip(conn))]
pub async fn enable(conn: &mut SqliteConnection) -> Result<()> {
    for (table, columns) in AUDITED_TABLES {
        let snapshot = json_object_expr(columns, "NEW");
        let insert_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS chglog_{table}_ins AFTER INSERT ON \"{table}\" BEGIN
                INSERT INTO change_log (table_name, row_id, action, snapshot)
                VALUES ('{table}', NEW.rowid, 'I', {snapshot});
             END"
        );
        let update_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS chglog_{table}_upd AFTER UPDATE ON \"{table}\" BEGIN
                INSERT INTO change_log (table_name, row_id, action, snapshot)
                VALUES ('{table}', NEW.rowid, 'U', {snapshot});
             END"
        );
        let delete_trigger = format!(
            "CREATE TRIGGER IF NOT EXISTS chglog_{table}_del AFTER DELETE ON \"{table}\" BEGIN
                INSERT INTO change_log (table_name, row_id, action, snapshot)
                VALUES ('{table}', OLD.rowid, 'D', NULL);
             END"
        );
        sqlx::query(&insert_trigger).execute(&mut *conn).await?;
        sqlx::query(&update_trigger).execute(&mut *conn).await?;
        sqlx::query(&delete_trigger).execute(&mut *conn).await?;
    }

    config::set_bool(conn, config::KEY_CHANGE_LOG_ENABLED, true).await
}

/// Drops the capture triggers; already-written entries stay.
#[instrument(level = "debug", skip(conn))]
pub async fn disable(conn: &mut SqliteConnection) -> Result<()> {
    for (table, _) in AUDITED_TABLES {
        for suffix in ["ins", "upd", "del"] {
            let drop = format!("DROP TRIGGER IF EXISTS chglog_{table}_{suffix}");
            sqlx::query(&drop).execute(&mut *conn).await?;
        }
    }
    config::set_bool(conn, config::KEY_CHANGE_LOG_ENABLED, false).await
}

pub async fn is_enabled(pool: &DbPool) -> Result<bool> {
    config::get_bool(pool, config::KEY_CHANGE_LOG_ENABLED).await
}

pub async fn read_all(conn: &mut SqliteConnection) -> Result<Vec<ChangeLogEntry>> {
    let entries = sqlx::query_as::<_, ChangeLogEntry>(
        "SELECT seq, table_name, row_id, action, snapshot, logged_at
         FROM change_log ORDER BY seq ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

pub async fn clear(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("DELETE FROM change_log").execute(conn).await?;
    Ok(())
}

/// Produces the minimal equivalent log.
///
/// Per row (back to front): only the newest update survives; a history
/// that starts with an insert collapses onto a single insert carrying the
/// newest snapshot, and vanishes completely when the row was deleted
/// again. Rows first seen as updates keep one update (or one delete).
/// The surviving entries keep the relative order in which their rows first
/// appeared, so parents still precede children on replay.
pub fn compact(entries: &[ChangeLogEntry]) -> Vec<ChangeLogEntry> {
    #[derive(Default)]
    struct RowHistory {
        first_seq: i64,
        started_with_insert: bool,
        deleted: bool,
        newest: Option<ChangeLogEntry>,
        delete_entry: Option<ChangeLogEntry>,
    }

    let mut histories: HashMap<(String, i64), RowHistory> = HashMap::new();
    let mut order: Vec<(String, i64)> = Vec::new();

    for entry in entries {
        let key = (entry.table_name.clone(), entry.row_id);
        let history = histories.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            RowHistory {
                first_seq: entry.seq,
                ..Default::default()
            }
        });

        match entry.action {
            ChangeAction::Insert => {
                // a delete earlier in the log means this is a fresh row
                // under a recycled id; treat the rebirth as an insert
                history.started_with_insert = history.newest.is_none() || history.deleted;
                history.deleted = false;
                history.delete_entry = None;
                history.newest = Some(entry.clone());
            }
            ChangeAction::Update => {
                history.deleted = false;
                history.newest = Some(entry.clone());
            }
            ChangeAction::Delete => {
                history.deleted = true;
                history.delete_entry = Some(entry.clone());
            }
        }
    }

    let mut result = Vec::new();
    for key in order {
        let history = &histories[&key];
        if history.deleted {
            // insert + ... + delete annihilates
            if !history.started_with_insert {
                if let Some(delete) = &history.delete_entry {
                    result.push(delete.clone());
                }
            }
            continue;
        }
        if let Some(newest) = &history.newest {
            let mut entry = newest.clone();
            entry.action = if history.started_with_insert {
                ChangeAction::Insert
            } else {
                ChangeAction::Update
            };
            entry.seq = history.first_seq;
            result.push(entry);
        }
    }

    result.sort_by_key(|e| e.seq);
    result
}

/// Applies a (typically compacted) log onto a freshly migrated database.
/// Foreign keys are checked at the end rather than per statement because a
/// compacted log may interleave tables.
#[instrument(level = "debug", skip(conn, entries))]
pub async fn replay(conn: &mut SqliteConnection, entries: &[ChangeLogEntry]) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await?;

    for entry in entries {
        let columns = AUDITED_TABLES
            .iter()
            .find(|(t, _)| *t == entry.table_name)
            .map(|(_, c)| *c)
            .ok_or_else(|| Error::NotFound(format!("audited table {}", entry.table_name)))?;

        match entry.action {
            ChangeAction::Insert | ChangeAction::Update => {
                let raw = entry
                    .snapshot
                    .as_deref()
                    .ok_or_else(|| Error::NotFound("row snapshot".into()))?;
                let snapshot: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| Error::InvalidName(format!("bad snapshot: {e}")))?;

                let column_list: Vec<String> =
                    columns.iter().map(|c| format!("\"{c}\"")).collect();
                let placeholders = vec!["?"; columns.len() + 1].join(", ");
                let sql = format!(
                    "INSERT OR REPLACE INTO \"{}\" (rowid, {}) VALUES ({placeholders})",
                    entry.table_name,
                    column_list.join(", "),
                );

                let mut query = sqlx::query(&sql).bind(entry.row_id);
                for column in columns {
                    query = match snapshot.get(*column) {
                        Some(serde_json::Value::Number(n)) if n.is_i64() => {
                            query.bind(n.as_i64())
                        }
                        Some(serde_json::Value::Number(n)) => query.bind(n.as_f64()),
                        Some(serde_json::Value::String(s)) => query.bind(s.clone()),
                        Some(serde_json::Value::Bool(b)) => query.bind(*b as i64),
                        _ => query.bind(None::<String>),
                    };
                }
                query.execute(&mut *conn).await?;
            }
            ChangeAction::Delete => {
                let sql = format!("DELETE FROM \"{}\" WHERE rowid = ?", entry.table_name);
                sqlx::query(&sql)
                    .bind(entry.row_id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
