use crate::db;
use crate::error::{Error, Result};
use crate::score::MatchScore;
use sqlx::FromRow;
use sqlx::SqliteConnection;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
pub enum MatchState {
    Incomplete,
    Waiting,
    Ready,
    Busy,
    Finished,
    Postponed,
}

/// What a pair slot currently holds. Symbolic references are stored as a
/// signed match id: positive selects the winner, negative the loser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRef {
    Pair(i64),
    WinnerOf(i64),
    LoserOf(i64),
    Empty,
}

impl PairRef {
    pub fn from_columns(pair_id: Option<i64>, symbolic: Option<i64>) -> Self {
        match (pair_id, symbolic) {
            (Some(id), _) => PairRef::Pair(id),
            (None, Some(s)) if s > 0 => PairRef::WinnerOf(s),
            (None, Some(s)) if s < 0 => PairRef::LoserOf(-s),
            _ => PairRef::Empty,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Match {
    pub id: i64,
    pub group_id: i64,
    pub match_num: Option<i64>,
    pub pair1_id: Option<i64>,
    pub pair2_id: Option<i64>,
    pub pair1_symbolic: Option<i64>,
    pub pair2_symbolic: Option<i64>,
    pub referee_id: Option<i64>,
    pub score: Option<String>,
    pub walkover: i64,
    pub winner_rank: Option<i64>,
    pub loser_rank: Option<i64>,
    pub state: MatchState,
    pub seq_num: i64,
}

const COLUMNS: &str = "id, group_id, match_num, pair1_id, pair2_id, pair1_symbolic, \
                       pair2_symbolic, referee_id, score, walkover, winner_rank, loser_rank, \
                       state, seq_num";

impl Match {
    pub fn slot(&self, pos: u8) -> PairRef {
        match pos {
            1 => PairRef::from_columns(self.pair1_id, self.pair1_symbolic),
            _ => PairRef::from_columns(self.pair2_id, self.pair2_symbolic),
        }
    }

    pub fn has_both_pairs(&self) -> bool {
        self.pair1_id.is_some() && self.pair2_id.is_some()
    }

    pub fn match_score(&self) -> Result<Option<MatchScore>> {
        if self.walkover != 0 {
            return Ok(Some(MatchScore::Walkover {
                winner_slot: self.walkover as u8,
            }));
        }
        match &self.score {
            None => Ok(None),
            Some(raw) => Ok(Some(MatchScore::parse(raw)?)),
        }
    }

    /// Resolved winner pair of a finished match; `None` on a draw.
    pub fn winner_pair_id(&self) -> Result<Option<i64>> {
        let Some(score) = self.match_score()? else {
            return Ok(None);
        };
        Ok(match score.winner_slot() {
            Some(1) => self.pair1_id,
            Some(_) => self.pair2_id,
            None => None,
        })
    }

    /// Resolved loser pair of a finished match; `None` on a draw.
    pub fn loser_pair_id(&self) -> Result<Option<i64>> {
        let Some(score) = self.match_score()? else {
            return Ok(None);
        };
        Ok(match score.winner_slot() {
            Some(1) => self.pair2_id,
            Some(_) => self.pair1_id,
            None => None,
        })
    }

    #[instrument(level = "debug", skip(conn))]
    pub async fn create(conn: &mut SqliteConnection, group_id: i64) -> Result<Self> {
        let seq_num = db::next_seq_num(conn, "match").await?;
        let ma = sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO \"match\" (group_id, seq_num) VALUES (?, ?) RETURNING {COLUMNS}"
        ))
        .bind(group_id)
        .bind(seq_num)
        .fetch_one(conn)
        .await?;
        Ok(ma)
    }

    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Self>> {
        let ma = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM \"match\" WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(ma)
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Self> {
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("match {id}")))
    }

    pub async fn for_group(conn: &mut SqliteConnection, group_id: i64) -> Result<Vec<Self>> {
        let matches = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM \"match\" WHERE group_id = ? ORDER BY seq_num ASC"
        ))
        .bind(group_id)
        .fetch_all(conn)
        .await?;
        Ok(matches)
    }

    pub async fn for_category(conn: &mut SqliteConnection, category_id: i64) -> Result<Vec<Self>> {
        let matches = sqlx::query_as::<_, Self>(
            "SELECT m.id, m.group_id, m.match_num, m.pair1_id, m.pair2_id, m.pair1_symbolic,
                    m.pair2_symbolic, m.referee_id, m.score, m.walkover, m.winner_rank,
                    m.loser_rank, m.state, m.seq_num
             FROM \"match\" m JOIN match_group mg ON mg.id = m.group_id
             WHERE mg.category_id = ?
             ORDER BY mg.round ASC, m.seq_num ASC",
        )
        .bind(category_id)
        .fetch_all(conn)
        .await?;
        Ok(matches)
    }

    pub async fn for_category_and_round(
        conn: &mut SqliteConnection,
        category_id: i64,
        round: i64,
    ) -> Result<Vec<Self>> {
        let matches = sqlx::query_as::<_, Self>(
            "SELECT m.id, m.group_id, m.match_num, m.pair1_id, m.pair2_id, m.pair1_symbolic,
                    m.pair2_symbolic, m.referee_id, m.score, m.walkover, m.winner_rank,
                    m.loser_rank, m.state, m.seq_num
             FROM \"match\" m JOIN match_group mg ON mg.id = m.group_id
             WHERE mg.category_id = ? AND mg.round = ?
             ORDER BY m.seq_num ASC",
        )
        .bind(category_id)
        .bind(round)
        .fetch_all(conn)
        .await?;
        Ok(matches)
    }

    pub async fn find_for_pair_and_round(
        conn: &mut SqliteConnection,
        category_id: i64,
        pair_id: i64,
        round: i64,
    ) -> Result<Option<Self>> {
        let ma = sqlx::query_as::<_, Self>(
            "SELECT m.id, m.group_id, m.match_num, m.pair1_id, m.pair2_id, m.pair1_symbolic,
                    m.pair2_symbolic, m.referee_id, m.score, m.walkover, m.winner_rank,
                    m.loser_rank, m.state, m.seq_num
             FROM \"match\" m JOIN match_group mg ON mg.id = m.group_id
             WHERE mg.category_id = ? AND mg.round = ? AND (m.pair1_id = ? OR m.pair2_id = ?)",
        )
        .bind(category_id)
        .bind(round)
        .bind(pair_id)
        .bind(pair_id)
        .fetch_optional(conn)
        .await?;
        Ok(ma)
    }

    /// Matches holding a symbolic reference onto this match, i.e. the
    /// forward edges of the bracket DAG, derived rather than stored.
    pub async fn successors(conn: &mut SqliteConnection, id: i64) -> Result<Vec<Self>> {
        let matches = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM \"match\"
             WHERE pair1_symbolic IN (?, ?) OR pair2_symbolic IN (?, ?)"
        ))
        .bind(id)
        .bind(-id)
        .bind(id)
        .bind(-id)
        .fetch_all(conn)
        .await?;
        Ok(matches)
    }

    /// All not-yet-finished matches referencing a resolved pair.
    pub async fn pending_for_pair(conn: &mut SqliteConnection, pair_id: i64) -> Result<Vec<Self>> {
        let matches = sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM \"match\"
             WHERE (pair1_id = ? OR pair2_id = ?) AND state != 'finished'"
        ))
        .bind(pair_id)
        .bind(pair_id)
        .fetch_all(conn)
        .await?;
        Ok(matches)
    }

    pub async fn set_state(conn: &mut SqliteConnection, id: i64, state: MatchState) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_match_num(
        conn: &mut SqliteConnection,
        id: i64,
        match_num: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET match_num = ? WHERE id = ?")
            .bind(match_num)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Writes a resolved pair into a slot, clearing any symbolic reference.
    pub async fn set_pair(
        conn: &mut SqliteConnection,
        id: i64,
        pos: u8,
        pair_id: i64,
    ) -> Result<()> {
        let query = if pos == 1 {
            "UPDATE \"match\" SET pair1_id = ?, pair1_symbolic = NULL WHERE id = ?"
        } else {
            "UPDATE \"match\" SET pair2_id = ?, pair2_symbolic = NULL WHERE id = ?"
        };
        sqlx::query(query).bind(pair_id).bind(id).execute(conn).await?;
        Ok(())
    }

    /// Writes a symbolic reference into a slot, clearing any resolved pair.
    pub async fn set_symbolic(
        conn: &mut SqliteConnection,
        id: i64,
        pos: u8,
        symbolic: i64,
    ) -> Result<()> {
        let query = if pos == 1 {
            "UPDATE \"match\" SET pair1_symbolic = ?, pair1_id = NULL WHERE id = ?"
        } else {
            "UPDATE \"match\" SET pair2_symbolic = ?, pair2_id = NULL WHERE id = ?"
        };
        sqlx::query(query).bind(symbolic).bind(id).execute(conn).await?;
        Ok(())
    }

    pub async fn clear_slot(conn: &mut SqliteConnection, id: i64, pos: u8) -> Result<()> {
        let query = if pos == 1 {
            "UPDATE \"match\" SET pair1_id = NULL, pair1_symbolic = NULL WHERE id = ?"
        } else {
            "UPDATE \"match\" SET pair2_id = NULL, pair2_symbolic = NULL WHERE id = ?"
        };
        sqlx::query(query).bind(id).execute(conn).await?;
        Ok(())
    }

    pub async fn set_winner_rank(conn: &mut SqliteConnection, id: i64, rank: i64) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET winner_rank = ? WHERE id = ?")
            .bind(rank)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_loser_rank(conn: &mut SqliteConnection, id: i64, rank: i64) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET loser_rank = ? WHERE id = ?")
            .bind(rank)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn set_referee(
        conn: &mut SqliteConnection,
        id: i64,
        referee_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET referee_id = ? WHERE id = ?")
            .bind(referee_id)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn store_score(
        conn: &mut SqliteConnection,
        id: i64,
        score: &MatchScore,
    ) -> Result<()> {
        let (text, walkover): (Option<String>, i64) = match score {
            MatchScore::Games(_) => (Some(score.to_string()), 0),
            MatchScore::Walkover { winner_slot } => (None, *winner_slot as i64),
        };
        sqlx::query("UPDATE \"match\" SET score = ?, walkover = ? WHERE id = ?")
            .bind(text)
            .bind(walkover)
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn clear_score(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("UPDATE \"match\" SET score = NULL, walkover = 0 WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        let ma = Self::get(conn, id).await?;
        sqlx::query("DELETE FROM \"match\" WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        db::compact_seq_nums(conn, "match", ma.seq_num).await
    }
}
