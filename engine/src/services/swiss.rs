//! Swiss Ladder Pairing
//!
//! Pairs the field for the next round from the current standings: best
//! against second-best and so on down the list, skipping combinations that
//! have already been played. When the walk gets stuck, the most recent
//! pairing is undone and the search resumes with the next candidate
//! partner, so the result is the first repetition-free pairing in
//! standings order.
//!
//! Odd fields hand out one bye per round. The bye rotates: only pairs with
//! the current minimum number of byes are candidates, tried from the
//! bottom of the standings upwards, and each candidate gets a chance to
//! make the rest of the field pairable before the round is declared
//! deadlocked. A deadlock is an announced outcome, not an error: the
//! category's schedule is cut short at the rounds already played.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwissRound {
    /// Pair-id combinations in standings order, best-ranked first.
    pub pairings: Vec<(i64, i64)>,
    /// The pair sitting out this round, if the field is odd.
    pub bye: Option<i64>,
}

fn played_key(a: i64, b: i64) -> (i64, i64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Plans the next Swiss round.
///
/// `standings` holds pair ids, best first; `past_matches` every combination
/// already played in the category; `bye_counts` how often each pair has
/// sat out so far. Returns `None` when no repetition-free pairing exists
/// for any legal bye choice.
pub fn plan_next_round(
    standings: &[i64],
    past_matches: &HashSet<(i64, i64)>,
    bye_counts: &HashMap<i64, i64>,
) -> Option<SwissRound> {
    if standings.len() < 2 {
        return None;
    }

    if standings.len() % 2 == 0 {
        return pair_field(standings, past_matches).map(|pairings| SwissRound {
            pairings,
            bye: None,
        });
    }

    // bye rotation: only the least-rested pairs qualify, tried from the
    // bottom of the standings upwards
    let min_byes = standings
        .iter()
        .map(|id| bye_counts.get(id).copied().unwrap_or(0))
        .min()
        .unwrap_or(0);

    for &candidate in standings.iter().rev() {
        if bye_counts.get(&candidate).copied().unwrap_or(0) != min_byes {
            continue;
        }
        let remaining: Vec<i64> = standings
            .iter()
            .copied()
            .filter(|&id| id != candidate)
            .collect();
        if let Some(pairings) = pair_field(&remaining, past_matches) {
            return Some(SwissRound {
                pairings,
                bye: Some(candidate),
            });
        }
    }

    None
}

/// Backtracking walk over an even field in standings order.
fn pair_field(order: &[i64], past_matches: &HashSet<(i64, i64)>) -> Option<Vec<(i64, i64)>> {
    debug_assert!(order.len() % 2 == 0);

    let mut used = vec![false; order.len()];
    let mut pairings = Vec::with_capacity(order.len() / 2);
    if backtrack(order, past_matches, &mut used, &mut pairings) {
        Some(pairings)
    } else {
        None
    }
}

fn backtrack(
    order: &[i64],
    past_matches: &HashSet<(i64, i64)>,
    used: &mut [bool],
    pairings: &mut Vec<(i64, i64)>,
) -> bool {
    let Some(first) = used.iter().position(|u| !u) else {
        return true;
    };

    used[first] = true;
    for second in (first + 1)..order.len() {
        if used[second] {
            continue;
        }
        if past_matches.contains(&played_key(order[first], order[second])) {
            continue;
        }
        used[second] = true;
        pairings.push((order[first], order[second]));
        if backtrack(order, past_matches, used, pairings) {
            return true;
        }
        pairings.pop();
        used[second] = false;
    }
    used[first] = false;

    false
}
