//! Data structures for the Kendo tournament: players, matches, tournaments.

mod game;
mod player;
mod tournament;

pub use game::{
    raw_scores, DraftTemplate, Match, MatchDraft, MatchId, MatchPlayer, MatchRole, MatchType,
    PlayerColor, Point, PointType, MAXIMUM_POINTS,
};
pub use player::{PlayerId, RankingEntry};
pub use tournament::{
    CreateTournamentRequest, Team, TeamId, Tournament, TournamentId, TournamentType,
    UpdateTournamentRequest, MINIMUM_GROUP_SIZE,
};
