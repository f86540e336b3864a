//! Engine: the operations exposed to the API layer.
//!
//! Each operation reads from the [`Store`], applies pure logic, commits with
//! compare-and-swap (retrying on conflicts) and only then publishes notifications.

mod matches;
mod teams;
mod tournaments;

pub use matches::{AddPointRequest, CreateMatchRequest};
pub use tournaments::Standings;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, EntityKind, StoreError};
use crate::models::{Match, MatchId, Tournament, TournamentId};
use crate::notify::{events, Notifier};
use crate::store::{Committed, MatchFilter, ScheduleChange, Store};
use log::warn;
use serde::Serialize;
use std::sync::Arc;

pub struct Engine {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load_match(&self, id: MatchId) -> EngineResult<Match> {
        self.store
            .get_match(id)?
            .ok_or(EngineError::NotFound(EntityKind::Match, id))
    }

    fn load_tournament(&self, id: TournamentId) -> EngineResult<Tournament> {
        self.store
            .get_tournament(id)?
            .ok_or(EngineError::NotFound(EntityKind::Tournament, id))
    }

    /// Read-modify-write of one match, retried on version conflicts.
    ///
    /// `apply` validates and mutates; an error aborts without saving.
    fn update_match<T>(
        &self,
        id: MatchId,
        mut apply: impl FnMut(&mut Match) -> EngineResult<T>,
    ) -> EngineResult<(Match, T)> {
        for attempt in 1..=self.config.max_commit_attempts {
            let mut m = self.load_match(id)?;
            let result = apply(&mut m)?;
            match self.store.save_match(&m) {
                Ok(saved) => return Ok((saved, result)),
                Err(StoreError::Conflict { .. }) => {
                    warn!("Match {id} changed during update (attempt {attempt}), retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Conflict {
            kind: EntityKind::Match,
            id,
            attempts: self.config.max_commit_attempts,
        })
    }

    /// Per-tournament transaction: read the tournament and its matches, let `plan`
    /// decide on a change, commit it atomically. Retried from the read on conflicts.
    ///
    /// `plan` returning `None` means there is nothing to write.
    fn transact(
        &self,
        id: TournamentId,
        mut plan: impl FnMut(&Tournament, &[Match]) -> EngineResult<Option<ScheduleChange>>,
    ) -> EngineResult<Option<Committed>> {
        for attempt in 1..=self.config.max_commit_attempts {
            let tournament = self.load_tournament(id)?;
            let matches = self.store.find_matches(&MatchFilter::Tournament(id))?;
            let Some(change) = plan(&tournament, &matches)? else {
                return Ok(None);
            };
            match self.store.commit(change) {
                Ok(committed) => return Ok(Some(committed)),
                Err(StoreError::Conflict { .. }) => {
                    warn!("Tournament {id} changed during update (attempt {attempt}), retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::Conflict {
            kind: EntityKind::Tournament,
            id,
            attempts: self.config.max_commit_attempts,
        })
    }

    fn publish<T: Serialize>(&self, channel: impl ToString, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.notifier.publish(&channel.to_string(), event, value),
            Err(e) => warn!("Could not serialize {event} notification: {e}"),
        }
    }

    fn publish_match(&self, event: &str, m: &Match) {
        self.publish(m.id, event, m);
    }

    fn publish_tournament(&self, tournament: &Tournament) {
        self.publish(tournament.id, events::TOURNAMENT_UPDATED, tournament);
    }
}
