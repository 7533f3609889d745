//! Persisted bracket sheet model.
//!
//! The engine stores one row per bracket slot with grid coordinates and
//! connector hints; an external renderer turns these into SVG sheets.
//! Slots whose match was pruned keep their row with a NULL match id so the
//! sheet can still draw the empty position.

use crate::error::Result;
use crate::services::bracket::Bracket;
use serde::Serialize;
use sqlx::FromRow;
use sqlx::SqliteConnection;
use std::collections::HashMap;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BracketVisRow {
    pub id: i64,
    pub category_id: i64,
    pub match_id: Option<i64>,
    pub page: i64,
    pub grid_x: i64,
    pub grid_y: i64,
    pub y_span: i64,
    pub y_page_break_span: i64,
    pub next_page: i64,
    pub orientation: i64,
    pub terminator: i64,
    pub terminator_offset_y: i64,
    pub initial_rank1: Option<i64>,
    pub initial_rank2: Option<i64>,
}

/// Stores the layout rows of a freshly generated bracket.
pub async fn store(
    conn: &mut SqliteConnection,
    category_id: i64,
    graph: &Bracket,
    bracket_to_match: &HashMap<i64, i64>,
) -> Result<()> {
    for el in &graph.vis {
        let match_id = bracket_to_match.get(&el.bracket_match_id).copied();
        sqlx::query(
            "INSERT INTO bracket_vis (category_id, match_id, page, grid_x, grid_y, y_span,
                                      y_page_break_span, next_page, orientation, terminator,
                                      terminator_offset_y, initial_rank1, initial_rank2)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(category_id)
        .bind(match_id)
        .bind(el.page)
        .bind(el.grid_x)
        .bind(el.grid_y)
        .bind(el.y_span)
        .bind(el.y_page_break_span)
        .bind(el.next_page)
        .bind(el.orientation)
        .bind(el.terminator)
        .bind(el.terminator_offset_y)
        .bind(el.initial_rank1)
        .bind(el.initial_rank2)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// The stored sheet model of a category, page by page.
pub async fn for_category(
    conn: &mut SqliteConnection,
    category_id: i64,
) -> Result<Vec<BracketVisRow>> {
    let rows = sqlx::query_as::<_, BracketVisRow>(
        "SELECT id, category_id, match_id, page, grid_x, grid_y, y_span, y_page_break_span,
                next_page, orientation, terminator, terminator_offset_y, initial_rank1,
                initial_rank2
         FROM bracket_vis WHERE category_id = ?
         ORDER BY page ASC, grid_x ASC, grid_y ASC",
    )
    .bind(category_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn delete_for_category(conn: &mut SqliteConnection, category_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM bracket_vis WHERE category_id = ?")
        .bind(category_id)
        .execute(conn)
        .await?;
    Ok(())
}
