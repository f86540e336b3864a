//! In-memory store: everything behind one `RwLock`, which makes `commit` atomic.

use crate::error::{EntityKind, StoreError, StoreResult};
use crate::models::{Match, MatchDraft, MatchId, Tournament, TournamentId};
use crate::store::{Committed, MatchFilter, ScheduleChange, Store};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    /// Match plus its insertion sequence number.
    matches: HashMap<MatchId, (u64, Match)>,
    tournaments: HashMap<TournamentId, Tournament>,
    /// Reverse index: match id -> tournament whose schedule lists it.
    owners: HashMap<MatchId, TournamentId>,
    next_seq: u64,
}

impl Inner {
    fn insert_draft(&mut self, draft: MatchDraft) -> Match {
        let mut m = draft.into_match(Uuid::new_v4());
        m.version = 1;
        self.next_seq += 1;
        self.matches.insert(m.id, (self.next_seq, m.clone()));
        m
    }

    fn reindex(&mut self, previous: &[MatchId], tournament: &Tournament) {
        for id in previous {
            self.owners.remove(id);
        }
        for &id in &tournament.match_schedule {
            self.owners.insert(id, tournament.id);
        }
    }
}

/// Process-local [`Store`] used by the web binary and the tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock error".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock error".to_string()))
    }
}

impl Store for MemoryStore {
    fn get_match(&self, id: MatchId) -> StoreResult<Option<Match>> {
        Ok(self.read()?.matches.get(&id).map(|(_, m)| m.clone()))
    }

    fn find_matches(&self, filter: &MatchFilter) -> StoreResult<Vec<Match>> {
        let g = self.read()?;
        let mut found: Vec<&(u64, Match)> =
            g.matches.values().filter(|(_, m)| filter.matches(m)).collect();
        found.sort_by_key(|(seq, _)| *seq);
        Ok(found.into_iter().map(|(_, m)| m.clone()).collect())
    }

    fn insert_match(&self, draft: MatchDraft) -> StoreResult<Match> {
        Ok(self.write()?.insert_draft(draft))
    }

    fn insert_matches(&self, drafts: Vec<MatchDraft>) -> StoreResult<Vec<Match>> {
        let mut g = self.write()?;
        Ok(drafts.into_iter().map(|d| g.insert_draft(d)).collect())
    }

    fn delete_matches(&self, filter: &MatchFilter) -> StoreResult<usize> {
        let mut g = self.write()?;
        let before = g.matches.len();
        g.matches.retain(|_, (_, m)| !filter.matches(m));
        Ok(before - g.matches.len())
    }

    fn save_match(&self, m: &Match) -> StoreResult<Match> {
        let mut g = self.write()?;
        let (_, stored) = g
            .matches
            .get_mut(&m.id)
            .ok_or(StoreError::Missing(EntityKind::Match, m.id))?;
        if stored.version != m.version {
            return Err(StoreError::Conflict {
                kind: EntityKind::Match,
                id: m.id,
            });
        }
        let mut saved = m.clone();
        saved.version += 1;
        *stored = saved.clone();
        Ok(saved)
    }

    fn get_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.read()?.tournaments.get(&id).cloned())
    }

    fn insert_tournament(&self, tournament: Tournament) -> StoreResult<Tournament> {
        let mut g = self.write()?;
        let mut t = tournament;
        t.version = 1;
        g.reindex(&[], &t);
        g.tournaments.insert(t.id, t.clone());
        Ok(t)
    }

    fn save_tournament(&self, tournament: &Tournament) -> StoreResult<Tournament> {
        let mut g = self.write()?;
        let stored = g
            .tournaments
            .get(&tournament.id)
            .ok_or(StoreError::Missing(EntityKind::Tournament, tournament.id))?;
        if stored.version != tournament.version {
            return Err(StoreError::Conflict {
                kind: EntityKind::Tournament,
                id: tournament.id,
            });
        }
        let previous = stored.match_schedule.clone();
        let mut saved = tournament.clone();
        saved.version += 1;
        g.reindex(&previous, &saved);
        g.tournaments.insert(saved.id, saved.clone());
        Ok(saved)
    }

    fn delete_tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let mut g = self.write()?;
        let Some(tournament) = g.tournaments.remove(&id) else {
            return Ok(None);
        };
        for match_id in &tournament.match_schedule {
            g.owners.remove(match_id);
            g.matches.remove(match_id);
        }
        g.matches.retain(|_, (_, m)| m.tournament_id != Some(id));
        Ok(Some(tournament))
    }

    fn find_tournament_by_match(&self, match_id: MatchId) -> StoreResult<Option<Tournament>> {
        let g = self.read()?;
        Ok(g
            .owners
            .get(&match_id)
            .and_then(|id| g.tournaments.get(id))
            .cloned())
    }

    fn commit(&self, change: ScheduleChange) -> StoreResult<Committed> {
        let mut g = self.write()?;
        let id = change.tournament.id;
        let stored = g
            .tournaments
            .get(&id)
            .ok_or(StoreError::Missing(EntityKind::Tournament, id))?;
        if stored.version != change.tournament.version {
            return Err(StoreError::Conflict {
                kind: EntityKind::Tournament,
                id,
            });
        }
        let previous = stored.match_schedule.clone();

        let mut removed = change.delete;
        if change.clear_schedule {
            removed.extend(previous.iter().copied());
            removed.extend(
                g.matches
                    .values()
                    .filter(|(_, m)| m.tournament_id == Some(id))
                    .map(|(_, m)| m.id),
            );
        }
        for match_id in &removed {
            g.matches.remove(match_id);
        }

        let mut tournament = change.tournament;
        tournament.match_schedule = previous
            .iter()
            .copied()
            .filter(|m| !removed.contains(m))
            .collect();
        let mut inserted = Vec::with_capacity(change.insert.len());
        for mut draft in change.insert {
            draft.tournament_id = Some(id);
            let m = g.insert_draft(draft);
            tournament.match_schedule.push(m.id);
            inserted.push(m);
        }
        tournament.version += 1;
        g.reindex(&previous, &tournament);
        g.tournaments.insert(id, tournament.clone());
        Ok(Committed {
            tournament,
            inserted,
        })
    }
}
