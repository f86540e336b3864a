//! Player identity and ranking entries.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (user accounts live outside this crate).
pub type PlayerId = Uuid;

/// Standing of one player over a set of matches (for API / tie detection).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub player_id: PlayerId,
    /// 3 per win, 1 per draw.
    pub win_points: u32,
    /// Sum of raw (un-floored) match scores.
    pub scored_points: f64,
}

impl RankingEntry {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            win_points: 0,
            scored_points: 0.0,
        }
    }

    /// Record a win for this player.
    pub fn add_win(&mut self) {
        self.win_points += 3;
    }

    /// Record a draw for this player.
    pub fn add_draw(&mut self) {
        self.win_points += 1;
    }

    pub fn add_scored(&mut self, points: f64) {
        self.scored_points += points;
    }

    /// Two entries are level when both ranking criteria are equal.
    pub fn same_score(&self, other: &RankingEntry) -> bool {
        self.win_points == other.win_points && self.scored_points == other.scored_points
    }
}
