//! Document store abstraction for matches and tournaments.
//!
//! Both aggregates carry a `version`; saves are compare-and-swap. Changes that touch
//! a tournament and its matches together go through [`Store::commit`], which applies
//! them atomically or not at all.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreResult;
use crate::models::{Match, MatchDraft, MatchId, Tournament, TournamentId};

/// Selects a set of matches.
#[derive(Clone, Debug, PartialEq)]
pub enum MatchFilter {
    /// Every match whose `tournament_id` is this tournament.
    Tournament(TournamentId),
    Ids(Vec<MatchId>),
}

impl MatchFilter {
    pub fn matches(&self, m: &Match) -> bool {
        match self {
            MatchFilter::Tournament(id) => m.tournament_id == Some(*id),
            MatchFilter::Ids(ids) => ids.contains(&m.id),
        }
    }
}

/// One atomic update of a tournament and its schedule.
///
/// `tournament` is the document as read (its `version` is the expected one) with any
/// roster edits applied. The store owns `match_schedule`: it drops deleted ids and
/// appends the ids of inserted drafts.
#[derive(Clone, Debug)]
pub struct ScheduleChange {
    pub tournament: Tournament,
    pub delete: Vec<MatchId>,
    pub insert: Vec<MatchDraft>,
    /// Delete every match of the tournament before inserting.
    pub clear_schedule: bool,
}

impl ScheduleChange {
    pub fn new(tournament: Tournament) -> Self {
        Self {
            tournament,
            delete: Vec::new(),
            insert: Vec::new(),
            clear_schedule: false,
        }
    }

    pub fn inserting(tournament: Tournament, drafts: Vec<MatchDraft>) -> Self {
        Self {
            insert: drafts,
            ..Self::new(tournament)
        }
    }
}

/// Result of a successful [`Store::commit`].
#[derive(Clone, Debug)]
pub struct Committed {
    pub tournament: Tournament,
    pub inserted: Vec<Match>,
}

/// Storage used by the engine.
pub trait Store: Send + Sync {
    fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>>;

    /// Matches selected by `filter`, in insertion order.
    fn find_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<Match>>;

    /// Store a draft under a fresh id.
    fn insert_match(&self, draft: MatchDraft) -> StoreResult<Match>;

    fn insert_matches(&self, drafts: Vec<MatchDraft>) -> StoreResult<Vec<Match>>;

    /// Delete matches selected by `filter`; returns how many were removed.
    fn delete_matches(&self, filter: &MatchFilter) -> StoreResult<usize>;

    /// Replace a match if its version is unchanged; returns the saved document.
    fn save_match(&self, m: &Match) -> StoreResult<Match>;

    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    fn insert_tournament(&self, tournament: Tournament) -> StoreResult<Tournament>;

    /// Replace a tournament if its version is unchanged; returns the saved document.
    fn save_tournament(&self, tournament: &Tournament) -> StoreResult<Tournament>;

    /// Remove a tournament and every match it owns, in one step. Returns the removed
    /// tournament, or `None` when there was none.
    fn delete_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// The tournament whose schedule contains `match_id`.
    fn find_tournament_by_match(&self, match_id: MatchId) -> StoreResult<Option<Tournament>>;

    /// Apply a [`ScheduleChange`] atomically, failing with a conflict on a stale version.
    fn commit(&self, change: ScheduleChange) -> StoreResult<Committed>;
}
