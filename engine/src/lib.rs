//! # courtkeeper-engine
//!
//! The progression engine of a badminton tournament manager: categories,
//! player pairs, match generation (round robin, Swiss ladder, single
//! elimination with a third-place match, fixed ranking brackets), score
//! entry and standings, all persisted in a single embedded SQLite file
//! that survives arbitrary close/reopen cycles.
//!
//! The entry point is [`tournament::Tournament`], an explicit context
//! object wrapping the database pool. Every command it exposes runs in
//! one transaction: it either commits or leaves no trace.
//!
//! The engine is a library. Reporting (bracket sheets, standings tables)
//! and online synchronisation are external consumers of the data and the
//! change log; court scheduling is an external policy over the
//! match-ready signal.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod score;
pub mod services;
pub mod tournament;

pub use error::{Error, Result};
pub use tournament::{Tournament, TournamentSettings};
