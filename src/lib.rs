//! Kendo tournament engine: match scoring, schedule generation and stage progression
//! over a versioned document store.

pub mod config;
pub mod error;
pub mod logic;
pub mod models;
pub mod notify;
pub mod service;
pub mod store;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, EntityKind, StoreError, StoreResult};
pub use logic::{Outcome, Stage};
pub use models::{
    CreateTournamentRequest, Match, MatchDraft, MatchId, MatchPlayer, MatchRole, MatchType,
    PlayerColor, PlayerId, Point, PointType, RankingEntry, Team, TeamId, Tournament,
    TournamentId, TournamentType, UpdateTournamentRequest,
};
pub use notify::{LogNotifier, Notifier};
pub use service::{AddPointRequest, CreateMatchRequest, Engine, Standings};
pub use store::{MemoryStore, Store};
