//! Match (game), its players and points, and the draft form produced by the schedulers.

use crate::models::player::PlayerId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Score at which a match is decided outright.
pub const MAXIMUM_POINTS: f64 = 2.0;

/// Phase of a tournament this match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Group,
    Playoff,
    Preliminary,
    PrePlayoff,
    Swiss,
}

impl MatchType {
    /// Elimination matches cannot end level; they go to overtime instead.
    pub fn is_elimination(self) -> bool {
        matches!(self, MatchType::Playoff | MatchType::PrePlayoff)
    }

    /// Types whose result feeds a later stage of the tournament.
    pub fn is_multi_stage(self) -> bool {
        matches!(
            self,
            MatchType::Playoff | MatchType::Preliminary | MatchType::PrePlayoff
        )
    }

    /// Matches that make up the group stage of a preliminary-playoff tournament.
    pub fn is_preliminary_stage(self) -> bool {
        matches!(self, MatchType::Preliminary | MatchType::PrePlayoff)
    }
}

/// Side of the court; points are assigned by color.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    White,
    Red,
}

/// Court official attached to a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchRole {
    /// Runs the match clock.
    TimeKeeper,
    /// Records the points.
    PointMaker,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointType {
    Men,
    Kote,
    Do,
    Tsuki,
    /// Foul: half a point to the opponent.
    Hansoku,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub id: PlayerId,
    pub color: PlayerColor,
    #[serde(default)]
    pub points: Vec<Point>,
}

impl MatchPlayer {
    pub fn new(id: PlayerId, color: PlayerColor) -> Self {
        Self {
            id,
            color,
            points: Vec::new(),
        }
    }

    /// Points this player scored themselves (everything except hansoku).
    fn ippons(&self) -> f64 {
        self.points
            .iter()
            .filter(|p| p.point_type != PointType::Hansoku)
            .count() as f64
    }

    fn hansoku_count(&self) -> f64 {
        self.points
            .iter()
            .filter(|p| p.point_type == PointType::Hansoku)
            .count() as f64
    }
}

/// Raw (un-floored) score of every player, in player order.
///
/// An ippon is worth 1 to its scorer; a hansoku is worth 0.5 to the opponent.
/// A bye has no opponent, so only its own ippons count.
pub fn raw_scores(players: &[MatchPlayer]) -> Vec<f64> {
    match players {
        [a, b] => vec![
            a.ippons() + 0.5 * b.hansoku_count(),
            b.ippons() + 0.5 * a.hansoku_count(),
        ],
        _ => players.iter().map(MatchPlayer::ippons).collect(),
    }
}

/// A persisted match. Created only by the store from a [`MatchDraft`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    /// Store-managed revision used for compare-and-swap saves.
    #[serde(default)]
    pub version: u64,
    pub tournament_id: Option<TournamentId>,
    #[serde(rename = "type")]
    pub kind: MatchType,
    pub tournament_round: u32,
    /// One player for a bye, otherwise two (white first).
    pub players: Vec<MatchPlayer>,
    pub winner: Option<PlayerId>,
    pub end_timestamp: Option<DateTime<Utc>>,
    pub is_overtime: bool,
    pub player1_score: u32,
    pub player2_score: u32,
    pub start_timestamp: Option<DateTime<Utc>>,
    pub timer_started_timestamp: Option<DateTime<Utc>>,
    /// Accumulated running time in milliseconds.
    pub elapsed_time: i64,
    pub is_timer_on: bool,
    /// Regulation time in milliseconds, copied from the tournament.
    pub match_time: Option<i64>,
    #[serde(default)]
    pub time_keeper: Option<PlayerId>,
    #[serde(default)]
    pub point_maker: Option<PlayerId>,
}

impl Match {
    /// Finished means decided (winner) or recorded as a draw (end timestamp).
    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.end_timestamp.is_some()
    }

    pub fn is_bye(&self) -> bool {
        self.players.len() == 1
    }

    pub fn is_draw(&self) -> bool {
        self.winner.is_none() && self.end_timestamp.is_some()
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player)
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    /// The other player of a two-player match.
    pub fn opponent_of(&self, player: PlayerId) -> Option<PlayerId> {
        if !self.has_player(player) {
            return None;
        }
        self.players.iter().map(|p| p.id).find(|&id| id != player)
    }

    /// Players of a decided match that did not win.
    pub fn losers(&self) -> Vec<PlayerId> {
        match self.winner {
            Some(w) => self.player_ids().filter(|&id| id != w).collect(),
            None => Vec::new(),
        }
    }

    /// Slot holding the official for `role`.
    pub fn official_mut(&mut self, role: MatchRole) -> &mut Option<PlayerId> {
        match role {
            MatchRole::TimeKeeper => &mut self.time_keeper,
            MatchRole::PointMaker => &mut self.point_maker,
        }
    }

    pub fn raw_scores(&self) -> (f64, f64) {
        let scores = raw_scores(&self.players);
        (
            scores.first().copied().unwrap_or(0.0),
            scores.get(1).copied().unwrap_or(0.0),
        )
    }
}

/// A match that has not been stored yet (no id).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDraft {
    pub tournament_id: Option<TournamentId>,
    #[serde(rename = "type")]
    pub kind: MatchType,
    pub tournament_round: u32,
    pub players: Vec<MatchPlayer>,
    pub winner: Option<PlayerId>,
    pub match_time: Option<i64>,
}

impl MatchDraft {
    /// Materialize the draft under the id the store assigned.
    pub fn into_match(self, id: MatchId) -> Match {
        Match {
            id,
            version: 0,
            tournament_id: self.tournament_id,
            kind: self.kind,
            tournament_round: self.tournament_round,
            players: self.players,
            winner: self.winner,
            end_timestamp: None,
            is_overtime: false,
            player1_score: 0,
            player2_score: 0,
            start_timestamp: None,
            timer_started_timestamp: None,
            elapsed_time: 0,
            is_timer_on: false,
            match_time: self.match_time,
            time_keeper: None,
            point_maker: None,
        }
    }

    pub fn is_bye(&self) -> bool {
        self.players.len() == 1
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.iter().any(|p| p.id == player)
    }
}

/// Shared fields of every draft a generator emits in one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DraftTemplate {
    pub tournament_id: Option<TournamentId>,
    pub kind: MatchType,
    pub round: u32,
    pub match_time: Option<i64>,
}

impl DraftTemplate {
    pub fn new(tournament_id: Option<TournamentId>, kind: MatchType, round: u32) -> Self {
        Self {
            tournament_id,
            kind,
            round,
            match_time: None,
        }
    }

    pub fn with_match_time(mut self, match_time: Option<i64>) -> Self {
        self.match_time = match_time;
        self
    }

    pub fn with_kind(mut self, kind: MatchType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = round;
        self
    }

    /// Two-player match, first player in white.
    pub fn pair(&self, white: PlayerId, red: PlayerId) -> MatchDraft {
        self.draft(
            vec![
                MatchPlayer::new(white, PlayerColor::White),
                MatchPlayer::new(red, PlayerColor::Red),
            ],
            None,
        )
    }

    /// One-player match whose winner is already decided.
    pub fn bye(&self, player: PlayerId) -> MatchDraft {
        self.draft(vec![MatchPlayer::new(player, PlayerColor::White)], Some(player))
    }

    fn draft(&self, players: Vec<MatchPlayer>, winner: Option<PlayerId>) -> MatchDraft {
        MatchDraft {
            tournament_id: self.tournament_id,
            kind: self.kind,
            tournament_round: self.round,
            players,
            winner,
            match_time: self.match_time,
        }
    }
}
