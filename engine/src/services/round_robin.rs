//! Round Robin Pairing Generator
//!
//! Produces the pairings of one round-robin round with the circle method:
//! index 0 stays fixed while the remaining indices rotate around it, one
//! step per round. Writing the rotated block as positions `n_0 .. n_{N-1}`,
//! the occupant of position `p` in round `r` is
//!
//! ```text
//! n_p = (r + p - 1) mod (N - 1) + 1    for 0 < p < N
//! n_0 = 0
//! ```
//!
//! and the matches of the round are `n_0 : n_{N-1}`, `n_1 : n_{N-2}`, and
//! so on towards the middle. An odd field gets a dummy participant whose
//! matches are skipped, which hands one bye per round to the dummy's
//! opponent.

/// Returns the pairings `(a, b)` of 0-based round `round` for `num_players`
/// participants, as indices into the caller's seeding order. Out-of-range
/// arguments yield an empty list.
pub fn generate_pairings(num_players: usize, round: i64) -> Vec<(usize, usize)> {
    let is_odd = num_players % 2 != 0;
    let n = if is_odd { num_players + 1 } else { num_players };

    if n < 2 || round < 0 || round >= (n as i64 - 1) {
        return Vec::new();
    }

    let r = round as usize;
    let pos = |p: usize| -> usize {
        if p == 0 {
            0
        } else {
            (r + p - 1) % (n - 1) + 1
        }
    };

    let p_max = n - 1;
    (0..n / 2)
        .map(|m| (pos(m), pos(p_max - m)))
        .filter(|&(a, b)| !is_odd || (a != p_max && b != p_max))
        .collect()
}

/// Number of rounds a full single iteration takes: `n - 1` for an even
/// field, `n` for an odd one (every participant sits out once).
pub fn rounds_per_iteration(num_players: usize) -> i64 {
    if num_players < 2 {
        return 0;
    }
    if num_players % 2 == 0 {
        num_players as i64 - 1
    } else {
        num_players as i64
    }
}
