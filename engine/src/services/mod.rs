//! Service Layer
//!
//! Business logic on top of the models. Pure algorithms (pairing and
//! bracket generation) are plain function modules; the stateful services
//! orchestrate multi-step mutations and always run inside the caller's
//! transaction so a failure rolls back as one unit.
//!
//! - **round_robin**: circle-method pairing generator
//! - **bracket**: elimination bracket graphs, pruning, match ordering
//! - **ko_config**: group-phase/KO configuration wire format
//! - **swiss**: standings-driven pairing with bye rotation
//! - **round_status**: per-category round bookkeeping
//! - **match_engine**: match/group materialisation and state machines
//! - **ranking**: standings computation and rank assignment
//! - **strategy**: per-match-system capability dispatch
//! - **lifecycle**: the category state machine controller
//! - **changelog**: row-level audit capture, compaction and replay
//! - **bracket_vis**: persisted bracket sheet model for the renderer

pub mod bracket;
pub mod bracket_vis;
pub mod changelog;
pub mod ko_config;
pub mod lifecycle;
pub mod match_engine;
pub mod ranking;
pub mod round_robin;
pub mod round_status;
pub mod strategy;
pub mod swiss;
