//! Elimination Bracket Generator
//!
//! Builds the in-memory bracket graph that the match engine materialises
//! into groups and matches. Two flavours exist: single elimination with a
//! third-place match (synthesised right-to-left from the final) and the
//! fixed "Ranking1" brackets for up to 16 or 32 players (tabulated, every
//! participant ends up with a unique final rank).
//!
//! Bracket matches form a DAG held in an arena: forward edges are the
//! winner/loser outcomes, backward edges are the symbolic slot contents.
//! After seeding-dependent pruning, surviving matches map 1:1 onto real
//! matches.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    SingleElim,
    Ranking1,
}

/// Content of a pair slot inside the bracket graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Initial seeding rank, 1-based.
    Seed(i64),
    /// Fed by another bracket match; winner or loser is decided by that
    /// match's outcome edge pointing back here.
    FromMatch(i64),
    /// Transient marker used while pruning: the occupant was removed.
    Unused,
}

/// Where the winner or loser of a bracket match goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NextMatch { match_id: i64, slot: u8 },
    FinalRank(i64),
    Eliminated,
}

#[derive(Debug, Clone)]
pub struct BracketMatch {
    /// 1-based id, unique within one generated bracket.
    pub id: i64,
    pub slot1: Slot,
    pub slot2: Slot,
    pub winner_outcome: Outcome,
    pub loser_outcome: Outcome,
    /// 0 = final round; deeper levels play earlier.
    pub depth: i64,
    pub deleted: bool,
}

impl BracketMatch {
    fn slot(&self, pos: u8) -> Slot {
        if pos == 1 { self.slot1 } else { self.slot2 }
    }

    fn set_slot(&mut self, pos: u8, value: Slot) {
        if pos == 1 {
            self.slot1 = value;
        } else {
            self.slot2 = value;
        }
    }
}

/// Sheet-layout tuple for one bracket slot, only present for the tabulated
/// brackets. Consumed by the external bracket renderer.
#[derive(Debug, Clone, Copy)]
pub struct VisElement {
    pub bracket_match_id: i64,
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

#[derive(Debug, Clone, Default)]
pub struct Bracket {
    pub matches: Vec<BracketMatch>,
    pub vis: Vec<VisElement>,
}

impl Bracket {
    pub fn surviving(&self) -> impl Iterator<Item = &BracketMatch> {
        self.matches.iter().filter(|m| !m.deleted)
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut BracketMatch> {
        self.matches.iter_mut().find(|m| m.id == id)
    }
}

/// Builds and prunes the bracket for `num_players` seeded participants.
pub fn generate(kind: BracketKind, num_players: i64) -> Result<Bracket> {
    if num_players < 2 {
        return Err(Error::InvalidPlayerCount);
    }

    let mut bracket = match kind {
        BracketKind::SingleElim => gen_single_elim(num_players),
        BracketKind::Ranking1 => {
            if num_players > 32 {
                return Err(Error::InvalidPlayerCount);
            }
            gen_ranking1(num_players)
        }
    };

    remove_unused_matches(&mut bracket, num_players);

    Ok(bracket)
}

/// Rounds the bracket will occupy for the given field.
pub fn num_rounds(kind: BracketKind, num_players: i64) -> i64 {
    if num_players < 2 {
        return 0;
    }
    match kind {
        BracketKind::SingleElim => {
            let mut rounds = 1;
            let mut n = 2;
            while n < num_players {
                n *= 2;
                rounds += 1;
            }
            rounds
        }
        BracketKind::Ranking1 => {
            if num_players > 16 {
                7
            } else if num_players > 8 {
                5
            } else if num_players > 4 {
                3
            } else if num_players > 2 {
                2
            } else {
                1
            }
        }
    }
}

/// Sort order for allocating match numbers: earliest rounds first; within
/// a round, matches whose winner earns a final rank go last, the best rank
/// (the final itself) at the very end.
pub fn sort_matches(matches: &mut [BracketMatch]) {
    matches.sort_by(|a, b| {
        use std::cmp::Ordering;
        match b.depth.cmp(&a.depth) {
            Ordering::Equal => {}
            other => return other,
        }
        let rank_of = |m: &BracketMatch| match m.winner_outcome {
            Outcome::FinalRank(r) => Some(r),
            _ => None,
        };
        match (rank_of(a), rank_of(b)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            // the numerically better rank is decided later
            (Some(ra), Some(rb)) => rb.cmp(&ra),
        }
    });
}

// ---------------------------------------------------------------------------
// single elimination
// ---------------------------------------------------------------------------

fn gen_single_elim(num_players: i64) -> Bracket {
    // grow from the right (the final) to the left (initial matches)
    let mut matches: Vec<BracketMatch> = Vec::new();
    let mut next_id = 1;
    let mut new_match = |slot1, slot2, winner, loser, depth| {
        let m = BracketMatch {
            id: next_id,
            slot1,
            slot2,
            winner_outcome: winner,
            loser_outcome: loser,
            depth,
            deleted: false,
        };
        next_id += 1;
        m
    };

    matches.push(new_match(
        Slot::Seed(1),
        Slot::Seed(2),
        Outcome::FinalRank(1),
        Outcome::FinalRank(2),
        0,
    ));

    // kept aside until the semifinal split wires its feeders
    let mut third_place = new_match(
        Slot::Seed(3),
        Slot::Seed(4),
        Outcome::FinalRank(3),
        Outcome::FinalRank(4),
        0,
    );
    let third_place_id = third_place.id;

    let mut n_actual = 2;
    let mut cur_depth = 0;

    while n_actual < num_players {
        // split each match of the previous round into two feeders; the
        // seeds of one match always sum to n_actual + 1
        n_actual *= 2;
        cur_depth += 1;

        let prev_count = matches.len();
        for idx in 0..prev_count {
            if matches[idx].depth != cur_depth - 1 {
                continue;
            }
            let (rank1, rank2) = match (matches[idx].slot1, matches[idx].slot2) {
                (Slot::Seed(r1), Slot::Seed(r2)) => (r1, r2),
                _ => continue,
            };
            let parent_id = matches[idx].id;

            let mut child1 = new_match(
                Slot::Seed(rank1),
                Slot::Seed(n_actual + 1 - rank1),
                Outcome::NextMatch {
                    match_id: parent_id,
                    slot: 1,
                },
                Outcome::Eliminated,
                cur_depth,
            );
            let mut child2 = new_match(
                Slot::Seed(rank2),
                Slot::Seed(n_actual + 1 - rank2),
                Outcome::NextMatch {
                    match_id: parent_id,
                    slot: 2,
                },
                Outcome::Eliminated,
                cur_depth,
            );
            matches[idx].slot1 = Slot::FromMatch(child1.id);
            matches[idx].slot2 = Slot::FromMatch(child2.id);

            // semifinal losers meet again for third place
            if cur_depth == 1 && num_players > 3 {
                child1.loser_outcome = Outcome::NextMatch {
                    match_id: third_place_id,
                    slot: 1,
                };
                child2.loser_outcome = Outcome::NextMatch {
                    match_id: third_place_id,
                    slot: 2,
                };
                third_place.slot1 = Slot::FromMatch(child1.id);
                third_place.slot2 = Slot::FromMatch(child2.id);
                matches.push(third_place.clone());
            }

            matches.push(child1);
            matches.push(child2);
        }
    }

    Bracket {
        matches,
        vis: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// tabulated "Ranking1" brackets
// ---------------------------------------------------------------------------

// columns: initialRank1, initialRank2, nextMatchWinner, nextMatchLoser,
// posWinner, posLoser, depth. Negative initial ranks reference the source
// match; negative next-match values are final ranks.
#[rustfmt::skip]
const RAW_BRACKET_16: [[i64; 7]; 36] = [
    [  1,  16, 13,  9, 1, 1, 4], [  8,   9, 13,  9, 2, 2, 4],
    [  5,  12, 14, 10, 1, 1, 4], [  4,  13, 14, 10, 2, 2, 4],
    [ 14,   3, 15, 11, 1, 1, 4], [ 11,   6, 15, 11, 2, 2, 4],
    [ 10,   7, 16, 12, 1, 1, 4], [ 15,   2, 16, 12, 2, 2, 4],
    [ -1,  -2, 17, 21, 1, 1, 3], [ -3,  -4, 18, 22, 1, 1, 3],
    [ -5,  -6, 19, 21, 1, 2, 3], [ -7,  -8, 20, 22, 1, 2, 3],
    [ -1,  -2, 27, 19, 1, 2, 3], [ -3,  -4, 27, 20, 2, 2, 3],
    [ -5,  -6, 28, 17, 1, 2, 3], [ -7,  -8, 28, 18, 2, 2, 3],
    [ -9, -15, 25, 23, 1, 1, 2], [-10, -16, 25, 23, 2, 2, 2],
    [-11, -13, 26, 24, 1, 1, 2], [-12, -14, 26, 24, 2, 2, 2],
    [ -9, -11, 30, 29, 1, 1, 1], [-10, -12, 30, 29, 2, 2, 1],
    [-17, -18, 32, 31, 1, 1, 1], [-19, -20, 32, 31, 2, 2, 1],
    [-17, -18, 34, 33, 1, 1, 1], [-19, -20, 34, 33, 2, 2, 1],
    [-13, -14, 36, 35, 1, 1, 1], [-15, -16, 36, 35, 2, 2, 1],
    [-21, -22, -15, -16, 0, 0, 0], [-21, -22, -13, -14, 0, 0, 0],
    [-23, -24, -11, -12, 0, 0, 0], [-23, -24,  -9, -10, 0, 0, 0],
    [-25, -26,  -7,  -8, 0, 0, 0], [-25, -26,  -5,  -6, 0, 0, 0],
    [-27, -28,  -3,  -4, 0, 0, 0], [-27, -28,  -1,  -2, 0, 0, 0],
];

// columns: page, grid x0, grid y0, y-span, yPageBreakSpan, nextPage,
// orientation (-1 left / 1 right), terminator (1 outwards / -1 inwards),
// terminatorOffsetY
#[rustfmt::skip]
const VIS_BRACKET_16: [[i64; 9]; 36] = [
    [0, 5,  0,  2, 0, 0,  1, 0, 0], [0, 5,  4,  2, 0, 0,  1, 0, 0],
    [0, 5,  8,  2, 0, 0,  1, 0, 0], [0, 5, 12,  2, 0, 0,  1, 0, 0],
    [0, 5, 16,  2, 0, 0,  1, 0, 0], [0, 5, 20,  2, 0, 0,  1, 0, 0],
    [0, 5, 24,  2, 0, 0,  1, 0, 0], [0, 5, 28,  2, 0, 0,  1, 0, 0],
    [0, 5,  1,  4, 0, 0, -1, 0, 0], [0, 5,  9,  4, 0, 0, -1, 0, 0],
    [0, 5, 17,  4, 0, 0, -1, 0, 0], [0, 5, 25,  4, 0, 0, -1, 0, 0],
    [0, 6,  1,  4, 0, 0,  1, 0, 0], [0, 6,  9,  4, 0, 0,  1, 0, 0],
    [0, 6, 17,  4, 0, 0,  1, 0, 0], [0, 6, 25,  4, 0, 0,  1, 0, 0],
    [0, 4,  3,  4, 0, 0, -1, 0, 0], [0, 4, 11,  4, 0, 0, -1, 0, 0],
    [0, 4, 19,  4, 0, 0, -1, 0, 0], [0, 4, 27,  4, 0, 0, -1, 0, 0],
    [0, 8, 34,  2, 0, 0,  1, 0, 0], [0, 8, 38,  2, 0, 0,  1, 0, 0],
    [0, 2, 34,  2, 0, 0,  1, 0, 0], [0, 2, 38,  2, 0, 0,  1, 0, 0],
    [0, 3,  4,  8, 0, 0, -1, 0, 0], [0, 3, 20,  8, 0, 0, -1, 0, 0],
    [0, 7,  3,  8, 0, 0,  1, 0, 0], [0, 7, 19,  8, 0, 0,  1, 0, 0],
    [0, 8, 35,  4, 0, 0, -1, 1, 0], [0, 9, 35,  4, 0, 0,  1, 1, 0],
    [0, 2, 35,  4, 0, 0, -1, 1, 0], [0, 3, 35,  4, 0, 0,  1, 1, 0],
    [0, 2, 30,  2, 0, 0, -1, 1, 0], [0, 2,  8, 16, 0, 0, -1, 1, 0],
    [0, 9, 29,  2, 0, 0,  1, 1, 0], [0, 8,  7, 16, 0, 0,  1, 1, 0],
];

#[rustfmt::skip]
const RAW_BRACKET_32: [[i64; 7]; 92] = [
    [  1,  32, 18, 17, 1, 1, 6], [ 16,  17, 18, 17, 2, 2, 6],
    [  8,  25, 20, 19, 1, 1, 6], [  9,  24, 20, 19, 2, 2, 6],
    [  4,  29, 22, 21, 1, 1, 6], [ 13,  20, 22, 21, 2, 2, 6],
    [  5,  28, 24, 23, 1, 1, 6], [ 12,  21, 24, 23, 2, 2, 6],
    [ 22,  11, 26, 25, 1, 1, 6], [ 27,   6, 26, 25, 2, 2, 6],
    [ 19,  14, 28, 27, 1, 1, 6], [ 30,   3, 28, 27, 2, 2, 6],
    [ 23,  10, 30, 29, 1, 1, 6], [ 26,   7, 30, 29, 2, 2, 6],
    [ 18,  15, 32, 31, 1, 1, 6], [ 31,   2, 32, 31, 2, 2, 6],
    [ -1,  -2, 33, 45, 1, 1, 5], [ -1,  -2, 34, 36, 1, 2, 5],
    [ -3,  -4, 35, 45, 1, 2, 5], [ -3,  -4, 34, 38, 2, 2, 5],
    [ -5,  -6, 36, 46, 1, 1, 5], [ -5,  -6, 37, 33, 1, 2, 5],
    [ -7,  -8, 38, 46, 1, 2, 5], [ -7,  -8, 37, 35, 2, 2, 5],
    [ -9, -10, 39, 47, 1, 1, 5], [ -9, -10, 40, 42, 1, 2, 5],
    [-11, -12, 41, 47, 1, 2, 5], [-11, -12, 40, 44, 2, 2, 5],
    [-13, -14, 42, 48, 1, 1, 5], [-13, -14, 43, 41, 1, 2, 5],
    [-15, -16, 44, 48, 1, 2, 5], [-15, -16, 43, 39, 2, 2, 5],
    [-17, -22, 53, 49, 1, 1, 4], [-18, -20, 57, 65, 1, 2, 4],
    [-19, -24, 53, 49, 2, 2, 4], [-21, -18, 54, 50, 1, 1, 4],
    [-22, -24, 57, 66, 2, 2, 4], [-23, -20, 54, 50, 2, 2, 4],
    [-25, -32, 55, 51, 1, 1, 4], [-26, -28, 58, 63, 1, 2, 4],
    [-27, -30, 55, 51, 2, 2, 4], [-29, -26, 56, 52, 1, 1, 4],
    [-30, -32, 58, 64, 2, 2, 4], [-31, -28, 56, 52, 2, 2, 4],
    [-17, -19, 60, 59, 1, 1, 4], [-21, -23, 60, 59, 2, 2, 4],
    [-25, -27, 62, 61, 1, 1, 4], [-29, -31, 62, 61, 2, 2, 4],
    [-33, -35, 68, 67, 1, 1, 3], [-36, -38, 68, 67, 2, 2, 3],
    [-39, -41, 70, 69, 1, 1, 3], [-42, -44, 70, 69, 2, 2, 3],
    [-33, -35, 63, 71, 1, 1, 3], [-36, -38, 64, 71, 1, 2, 3],
    [-39, -41, 65, 72, 1, 1, 3], [-42, -44, 66, 72, 1, 2, 3],
    [-34, -37, 92, 91, 1, 1, 2], [-40, -43, 92, 91, 2, 2, 2],
    [-45, -46, 78, 77, 1, 1, 2], [-45, -46, 80, 79, 1, 1, 2],
    [-47, -48, 78, 77, 2, 2, 2], [-47, -48, 80, 79, 2, 2, 2],
    [-53, -40, 75, 73, 1, 1, 2], [-54, -43, 75, 73, 2, 2, 2],
    [-55, -34, 76, 74, 1, 1, 2], [-56, -37, 76, 74, 2, 2, 2],
    [-49, -50, 82, 81, 1, 1, 1], [-49, -50, 84, 83, 1, 1, 1],
    [-51, -52, 82, 81, 2, 2, 1], [-51, -52, 84, 83, 2, 2, 1],
    [-53, -54, 86, 85, 1, 1, 1], [-55, -56, 86, 85, 2, 2, 1],
    [-63, -64, 88, 87, 1, 1, 1], [-65, -66, 88, 87, 2, 2, 1],
    [-63, -64, 90, 89, 1, 1, 1], [-65, -66, 90, 89, 2, 2, 1],
    [-59, -61, -31, -32, 0, 0, 0], [-59, -61, -29, -30, 0, 0, 0],
    [-60, -62, -27, -28, 0, 0, 0], [-60, -62, -25, -26, 0, 0, 0],
    [-67, -69, -23, -24, 0, 0, 0], [-67, -69, -21, -22, 0, 0, 0],
    [-68, -70, -19, -20, 0, 0, 0], [-68, -70, -17, -18, 0, 0, 0],
    [-71, -72, -15, -16, 0, 0, 0], [-71, -72, -13, -14, 0, 0, 0],
    [-73, -74, -11, -12, 0, 0, 0], [-73, -74,  -9, -10, 0, 0, 0],
    [-75, -76,  -7,  -8, 0, 0, 0], [-75, -76,  -5,  -6, 0, 0, 0],
    [-57, -58,  -3,  -4, 0, 0, 0], [-57, -58,  -1,  -2, 0, 0, 0],
];

#[rustfmt::skip]
const VIS_BRACKET_32: [[i64; 9]; 92] = [
    [0,  7,  0,  2,  0, 0,  1,  0,  0], [0,  7,  4,  2,  0, 0,  1,  0,  0],
    [0,  7,  8,  2,  0, 0,  1,  0,  0], [0,  7, 12,  2,  0, 0,  1,  0,  0],
    [0,  7, 16,  2,  0, 0,  1,  0,  0], [0,  7, 20,  2,  0, 0,  1,  0,  0],
    [0,  7, 24,  2,  0, 0,  1,  0,  0], [0,  7, 28,  2,  0, 0,  1,  0,  0],
    [1,  7,  0,  2,  0, 0,  1,  0,  0], [1,  7,  4,  2,  0, 0,  1,  0,  0],
    [1,  7,  8,  2,  0, 0,  1,  0,  0], [1,  7, 12,  2,  0, 0,  1,  0,  0],
    [1,  7, 16,  2,  0, 0,  1,  0,  0], [1,  7, 20,  2,  0, 0,  1,  0,  0],
    [1,  7, 24,  2,  0, 0,  1,  0,  0], [1,  7, 28,  2,  0, 0,  1,  0,  0],
    [0,  7,  1,  4,  0, 0, -1,  0,  0], [0,  8,  1,  4,  0, 0,  1,  0,  0],
    [0,  7,  9,  4,  0, 0, -1,  0,  0], [0,  8,  9,  4,  0, 0,  1,  0,  0],
    [0,  7, 17,  4,  0, 0, -1,  0,  0], [0,  8, 17,  4,  0, 0,  1,  0,  0],
    [0,  7, 25,  4,  0, 0, -1,  0,  0], [0,  8, 25,  4,  0, 0,  1,  0,  0],
    [1,  7,  1,  4,  0, 0, -1,  0,  0], [1,  8,  1,  4,  0, 0,  1,  0,  0],
    [1,  7,  9,  4,  0, 0, -1,  0,  0], [1,  8,  9,  4,  0, 0,  1,  0,  0],
    [1,  7, 17,  4,  0, 0, -1,  0,  0], [1,  8, 17,  4,  0, 0,  1,  0,  0],
    [1,  7, 25,  4,  0, 0, -1,  0,  0], [1,  8, 25,  4,  0, 0,  1,  0,  0],
    [0,  6,  3,  4,  0, 0, -1,  0,  0], [0,  9,  3,  8,  0, 0,  1,  0,  0],
    [0,  6, 11,  4,  0, 0, -1,  0,  0], [0,  6, 19,  4,  0, 0, -1,  0,  0],
    [0,  9, 19,  8,  0, 0,  1,  0,  0], [0,  6, 27,  4,  0, 0, -1,  0,  0],
    [1,  6,  3,  4,  0, 0, -1,  0,  0], [1,  9,  3,  8,  0, 0,  1,  0,  0],
    [1,  6, 11,  4,  0, 0, -1,  0,  0], [1,  6, 19,  4,  0, 0, -1,  0,  0],
    [1,  9, 19,  8,  0, 0,  1,  0,  0], [1,  6, 27,  4,  0, 0, -1,  0,  0],
    [2,  3, 19,  2,  0, 0,  1,  0,  0], [2,  3, 23,  2,  0, 0,  1,  0,  0],
    [2,  3, 27,  2,  0, 0,  1,  0,  0], [2,  3, 31,  2,  0, 0,  1,  0,  0],
    [2,  3,  0,  2,  0, 0,  1,  0,  0], [2,  3,  4,  2,  0, 0,  1,  0,  0],
    [2,  3,  8,  2,  0, 0,  1,  0,  0], [2,  3, 12,  2,  0, 0,  1,  0,  0],
    [0,  5,  4,  8,  0, 0, -1,  0,  0], [0,  5, 20,  8,  0, 0, -1,  0,  0],
    [1,  5,  4,  8,  0, 0, -1,  0,  0], [1,  5, 20,  8,  0, 0, -1,  0,  0],
    [0, 10,  7, 16,  0, 0,  1,  0,  0], [1, 10,  7, 16,  0, 0,  1,  0,  0],
    [2,  3, 20,  4,  0, 0, -1,  0,  0], [2,  4, 20,  4,  0, 0,  1,  0,  0],
    [2,  3, 28,  4,  0, 0, -1,  0,  0], [2,  4, 28,  4,  0, 0,  1,  0,  0],
    [0,  4,  8,  6,  0, 0, -1,  0,  0], [0,  4, 24,  6,  0, 0, -1,  0,  0],
    [1,  4,  8,  6,  0, 0, -1,  0,  0], [1,  4, 24,  6,  0, 0, -1,  0,  0],
    [2,  3,  1,  4,  0, 0, -1,  0,  0], [2,  4,  1,  4,  0, 0,  1,  0,  0],
    [2,  3,  9,  4,  0, 0, -1,  0,  0], [2,  4,  9,  4,  0, 0,  1,  0,  0],
    [2,  9, 10,  2,  0, 0,  1,  0,  0], [2,  9, 14,  2,  0, 0,  1,  0,  0],
    [2,  9,  0,  2,  0, 0,  1,  0,  0], [2,  9,  4,  2,  0, 0,  1,  0,  0],
    [0,  3, 10, 16,  0, 0, -1,  0,  0], [1,  3, 10, 16,  0, 0, -1,  0,  0],
    [2,  9, 21,  2,  0, 0, -1,  1,  0], [2,  2, 22,  8,  0, 0, -1,  1,  0],
    [2, 10, 21,  2,  0, 0,  1,  1,  0], [2,  5, 22,  8,  0, 0,  1,  1,  0],
    [2,  3, 15,  2,  0, 0, -1,  1,  0], [2,  2,  3,  8,  0, 0, -1,  1,  0],
    [2,  4, 15,  2,  0, 0,  1,  1,  0], [2,  5,  3,  8,  0, 0,  1,  1,  0],
    [2,  9, 11,  4,  0, 0, -1,  1,  0], [2, 10, 11,  4,  0, 0,  1,  1,  0],
    [2,  9,  1,  4,  0, 0, -1,  1,  0], [2, 10,  1,  4,  0, 0,  1,  1,  0],
    [1,  2, 28,  2,  0, 0, -1,  1,  0], [0,  2, 15, 32, 16, 1, -1,  1, -4],
    [1, 10, 29,  2,  0, 0,  1,  1,  0], [0, 11, 15, 32, 16, 1,  1, -1, -4],
];

fn gen_ranking1(num_players: i64) -> Bracket {
    let (raw, vis): (&[[i64; 7]], &[[i64; 9]]) = if num_players <= 16 {
        (&RAW_BRACKET_16, &VIS_BRACKET_16)
    } else {
        (&RAW_BRACKET_32, &VIS_BRACKET_32)
    };

    let mut bracket = Bracket::default();
    for (i, row) in raw.iter().enumerate() {
        let id = (i + 1) as i64;
        let slot_from = |v: i64| {
            if v > 0 {
                Slot::Seed(v)
            } else {
                Slot::FromMatch(-v)
            }
        };
        let outcome_from = |next: i64, pos: i64| {
            if next > 0 {
                Outcome::NextMatch {
                    match_id: next,
                    slot: pos as u8,
                }
            } else if next < 0 {
                Outcome::FinalRank(-next)
            } else {
                Outcome::Eliminated
            }
        };

        bracket.matches.push(BracketMatch {
            id,
            slot1: slot_from(row[0]),
            slot2: slot_from(row[1]),
            winner_outcome: outcome_from(row[2], row[4]),
            loser_outcome: outcome_from(row[3], row[5]),
            depth: row[6],
            deleted: false,
        });

        let v = vis[i];
        bracket.vis.push(VisElement {
            bracket_match_id: id,
            page: v[0],
            grid_x: v[1],
            grid_y: v[2],
            y_span: v[3],
            y_page_break_span: v[4],
            next_page: v[5],
            orientation: v[6],
            terminator: v[7],
            terminator_offset_y: v[8],
            initial_rank1: (row[0] > 0).then_some(row[0]),
            initial_rank2: (row[1] > 0).then_some(row[1]),
        });
    }

    bracket
}

// ---------------------------------------------------------------------------
// pruning
// ---------------------------------------------------------------------------

/// Strips all matches that depend on seeds beyond the actual player count,
/// iterating until a fixpoint:
///
/// 1. both seeds over the count: the match dies, its successor slots become
///    unused;
/// 2. one seed over the count: the real occupant fast-forwards into the
///    winner successor (re-linking its source match when symbolic); the
///    loser slot downstream becomes unused; the match dies unless its
///    winner carries a final rank;
/// 3. an unused slot next to a symbolic one with a final-rank winner: the
///    rank transfers to the source match and the carrier dies.
fn remove_unused_matches(bracket: &mut Bracket, num_players: i64) {
    sort_matches(&mut bracket.matches);

    let mut changed = true;
    while changed {
        changed = false;

        // an unused marker counts like an over-count seed: the occupant
        // does not exist, so the cascade below treats both alike
        let over = |s: Slot| matches!(s, Slot::Seed(r) if r > num_players) || s == Slot::Unused;

        // step 1: matches without any real player
        for idx in 0..bracket.matches.len() {
            let m = &bracket.matches[idx];
            if m.deleted {
                continue;
            }
            if over(m.slot1) && over(m.slot2) {
                let winner = m.winner_outcome;
                let loser = m.loser_outcome;
                if let Outcome::NextMatch { match_id, slot } = winner {
                    if let Some(next) = bracket.get_mut(match_id) {
                        next.set_slot(slot, Slot::Unused);
                    }
                }
                if let Outcome::NextMatch { match_id, slot } = loser {
                    if let Some(next) = bracket.get_mut(match_id) {
                        next.set_slot(slot, Slot::Unused);
                    }
                }
                bracket.matches[idx].deleted = true;
                changed = true;
            }
        }

        // step 2: fast-forward matches with exactly one real occupant
        for idx in 0..bracket.matches.len() {
            let m = &bracket.matches[idx];
            if m.deleted {
                continue;
            }
            let stay_pos: u8 = if over(m.slot1) {
                2
            } else if over(m.slot2) {
                1
            } else {
                continue;
            };

            let m_id = m.id;
            let stay_slot = m.slot(stay_pos);
            let winner = m.winner_outcome;
            let loser = m.loser_outcome;

            if let Outcome::NextMatch { match_id, slot } = winner {
                if let Some(next) = bracket.get_mut(match_id) {
                    if next.slot(slot) != stay_slot {
                        next.set_slot(slot, stay_slot);
                        changed = true;
                    }
                }
                // re-link a symbolic occupant so its source feeds the
                // successor directly
                if let Slot::FromMatch(src_id) = stay_slot {
                    let redirect = Outcome::NextMatch { match_id, slot };
                    if let Some(src) = bracket.get_mut(src_id) {
                        let feeds_winner = matches!(
                            src.winner_outcome,
                            Outcome::NextMatch { match_id: w, .. } if w == m_id
                        );
                        if feeds_winner && src.winner_outcome != redirect {
                            src.winner_outcome = redirect;
                            changed = true;
                        } else if !feeds_winner && src.loser_outcome != redirect {
                            src.loser_outcome = redirect;
                            changed = true;
                        }
                    }
                }
            }

            // the automatic win produces no loser
            if let Outcome::NextMatch { match_id, slot } = loser {
                if let Some(next) = bracket.get_mut(match_id) {
                    if next.slot(slot) != Slot::Unused {
                        next.set_slot(slot, Slot::Unused);
                        changed = true;
                    }
                }
            }

            // keep the match only when the winner would lose ranking
            // information otherwise
            if !matches!(winner, Outcome::FinalRank(_)) {
                bracket.matches[idx].deleted = true;
                changed = true;
            }
        }

        // step 3: transfer orphaned final ranks onto the source match
        for idx in 0..bracket.matches.len() {
            let m = &bracket.matches[idx];
            if m.deleted {
                continue;
            }
            let (src_id, rank) = match (m.slot1, m.slot2, m.winner_outcome) {
                (Slot::Unused, Slot::FromMatch(src), Outcome::FinalRank(r)) => (src, r),
                (Slot::FromMatch(src), Slot::Unused, Outcome::FinalRank(r)) => (src, r),
                _ => continue,
            };
            let m_id = m.id;
            if let Some(src) = bracket.get_mut(src_id) {
                let feeds_winner = matches!(
                    src.winner_outcome,
                    Outcome::NextMatch { match_id: w, .. } if w == m_id
                );
                if feeds_winner {
                    src.winner_outcome = Outcome::FinalRank(rank);
                } else {
                    src.loser_outcome = Outcome::FinalRank(rank);
                }
            }
            bracket.matches[idx].deleted = true;
            changed = true;
        }
    }

    debug_assert!(
        bracket
            .surviving()
            .all(|m| m.slot1 != Slot::Unused && m.slot2 != Slot::Unused),
        "pruning left an unused-player slot behind"
    );
}
