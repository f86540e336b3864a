//! Tournament business logic: match state machine, scheduling, ranking, progression.

pub mod match_state;
pub mod progression;
pub mod ranking;
pub mod schedule;

pub use match_state::Outcome;
pub use progression::{tournament_stage, Stage, TransitionRules};
pub use ranking::{compute_scores, cutoff_tie, rank_groups, CutoffTie};
