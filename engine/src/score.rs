//! Match score value type and validation.
//!
//! The wire format is a comma-separated list of `p1:p2` game scores, most
//! significant game first, e.g. `"21:15,19:21,21:8"`. A walkover carries no
//! games, only the winning slot.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchScore {
    /// Played games as (points slot 1, points slot 2).
    Games(Vec<(i64, i64)>),
    /// Result declared without play; only the winner identity is known.
    Walkover { winner_slot: u8 },
}

impl MatchScore {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut games = Vec::new();
        for part in raw.split(',') {
            let (p1, p2) = part
                .split_once(':')
                .ok_or_else(|| Error::InvalidScore(format!("malformed game '{part}'")))?;
            let p1: i64 = p1
                .trim()
                .parse()
                .map_err(|_| Error::InvalidScore(format!("malformed game '{part}'")))?;
            let p2: i64 = p2
                .trim()
                .parse()
                .map_err(|_| Error::InvalidScore(format!("malformed game '{part}'")))?;
            games.push((p1, p2));
        }
        Ok(MatchScore::Games(games))
    }

    /// Game wins per slot; walkovers count as a straight win in the
    /// category's required number of games with no points played.
    pub fn game_wins(&self) -> (i64, i64) {
        match self {
            MatchScore::Games(games) => {
                let w1 = games.iter().filter(|(a, b)| a > b).count() as i64;
                let w2 = games.iter().filter(|(a, b)| b > a).count() as i64;
                (w1, w2)
            }
            MatchScore::Walkover { winner_slot } => {
                if *winner_slot == 1 {
                    (1, 0)
                } else {
                    (0, 1)
                }
            }
        }
    }

    /// Winning slot (1 or 2), or `None` for a draw.
    pub fn winner_slot(&self) -> Option<u8> {
        match self {
            MatchScore::Walkover { winner_slot } => Some(*winner_slot),
            MatchScore::Games(_) => {
                let (w1, w2) = self.game_wins();
                match w1.cmp(&w2) {
                    std::cmp::Ordering::Greater => Some(1),
                    std::cmp::Ordering::Less => Some(2),
                    std::cmp::Ordering::Equal => None,
                }
            }
        }
    }

    pub fn is_draw(&self) -> bool {
        self.winner_slot().is_none()
    }

    /// Total points per slot (zero for walkovers).
    pub fn point_sums(&self) -> (i64, i64) {
        match self {
            MatchScore::Games(games) => games
                .iter()
                .fold((0, 0), |(s1, s2), (p1, p2)| (s1 + p1, s2 + p2)),
            MatchScore::Walkover { .. } => (0, 0),
        }
    }

    /// Checks a score against the category's scoring rules.
    ///
    /// `win_score` is the number of won games that decides a match. Without
    /// draws a match runs to at most `2 * win_score - 1` games and ends the
    /// moment one side reaches `win_score`. With draws allowed, exactly
    /// `2 * (win_score - 1)` games are played and equal game wins are a
    /// legal outcome.
    pub fn validate(&self, win_score: i64, allow_draw: bool) -> Result<()> {
        let games = match self {
            MatchScore::Walkover { winner_slot } => {
                if *winner_slot == 1 || *winner_slot == 2 {
                    return Ok(());
                }
                return Err(Error::InvalidScore("walkover winner must be slot 1 or 2".into()));
            }
            MatchScore::Games(games) => games,
        };

        if win_score < 1 {
            return Err(Error::InvalidScore("win score must be positive".into()));
        }

        for &(p1, p2) in games {
            if p1 < 0 || p2 < 0 {
                return Err(Error::InvalidScore("negative points".into()));
            }
            if p1 == p2 {
                return Err(Error::InvalidScore("a game cannot end level".into()));
            }
        }

        if allow_draw {
            let expected = 2 * (win_score - 1);
            if games.len() as i64 != expected {
                return Err(Error::InvalidScore(format!(
                    "expected exactly {expected} games"
                )));
            }
            return Ok(());
        }

        let (w1, w2) = self.game_wins();
        let (winner_games, loser_games) = if w1 >= w2 { (w1, w2) } else { (w2, w1) };
        if winner_games != win_score || loser_games >= win_score {
            return Err(Error::InvalidScore(format!(
                "winner must take exactly {win_score} games"
            )));
        }

        // the deciding game has to be the last one
        let decided_at = {
            let mut w1 = 0;
            let mut w2 = 0;
            let mut idx = games.len();
            for (i, &(p1, p2)) in games.iter().enumerate() {
                if p1 > p2 {
                    w1 += 1;
                } else {
                    w2 += 1;
                }
                if w1 == win_score || w2 == win_score {
                    idx = i + 1;
                    break;
                }
            }
            idx
        };
        if decided_at != games.len() {
            return Err(Error::InvalidScore("games played after the decision".into()));
        }

        Ok(())
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchScore::Games(games) => {
                let parts: Vec<String> =
                    games.iter().map(|(p1, p2)| format!("{p1}:{p2}")).collect();
                write!(f, "{}", parts.join(","))
            }
            MatchScore::Walkover { winner_slot } => write!(f, "walkover:{winner_slot}"),
        }
    }
}
