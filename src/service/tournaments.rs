//! Tournament operations: creation, roster, schedule, withdrawals and standings.

use super::Engine;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::logic::match_state::{self, Outcome};
use crate::logic::progression::{tournament_stage, Stage};
use crate::logic::ranking::tournament_standings;
use crate::logic::schedule::{divide_into_groups, full_schedule, on_registration};
use crate::models::{
    CreateTournamentRequest, Match, MatchId, PlayerId, RankingEntry, Tournament, TournamentId,
    TournamentType, UpdateTournamentRequest, MINIMUM_GROUP_SIZE,
};
use crate::notify::events;
use crate::store::{Committed, MatchFilter, ScheduleChange};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

/// Current table of a tournament.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standings {
    pub tournament_id: TournamentId,
    pub stage: Stage,
    /// One ranking per preliminary group, or a single table for other formats.
    pub groups: Vec<Vec<RankingEntry>>,
}

fn regroup(tournament: &mut Tournament) {
    let preferred = tournament
        .groups_size_preference
        .unwrap_or(MINIMUM_GROUP_SIZE);
    tournament.groups = divide_into_groups(&tournament.players, preferred);
}

/// Matches that go away with a departing player: their byes and anything unfinished.
pub(super) fn abandoned_matches(matches: &[Match], players: &[PlayerId]) -> Vec<MatchId> {
    matches
        .iter()
        .filter(|m| players.iter().any(|&p| m.has_player(p)))
        .filter(|m| m.is_bye() || !m.is_finished())
        .map(|m| m.id)
        .collect()
}

impl Engine {
    pub fn create_tournament(&self, req: CreateTournamentRequest) -> EngineResult<Tournament> {
        req.validate(Utc::now())?;
        let tournament = self
            .store
            .insert_tournament(req.into_tournament(Uuid::new_v4()))?;
        info!("Tournament {} ({:?}) created", tournament.id, tournament.kind);
        Ok(tournament)
    }

    pub fn get_tournament(&self, id: TournamentId) -> EngineResult<Tournament> {
        self.load_tournament(id)
    }

    /// Matches of a tournament, in creation order.
    pub fn tournament_matches(&self, id: TournamentId) -> EngineResult<Vec<Match>> {
        self.load_tournament(id)?;
        Ok(self.store.find_matches(&MatchFilter::Tournament(id))?)
    }

    /// Register a player and extend (or rebuild) the schedule for the format.
    pub fn add_player_to_tournament(
        &self,
        id: TournamentId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        if player.is_nil() {
            return Err(EngineError::bad_request("Player id is required"));
        }
        let committed = self.transact(id, |t, _| {
            if t.has_player(player) {
                return Err(EngineError::bad_request(
                    "Player is already registered in the tournament",
                ));
            }
            if t.has_started(Utc::now()) {
                return Err(EngineError::bad_request(
                    "Registration is closed, the tournament has started",
                ));
            }
            if t.is_full() {
                return Err(EngineError::bad_request("The tournament is full"));
            }
            let mut updated = t.clone();
            updated.players.push(player);
            let rebuild = matches!(
                updated.kind,
                TournamentType::PreliminaryPlayoff | TournamentType::Swiss
            );
            if updated.kind == TournamentType::PreliminaryPlayoff {
                regroup(&mut updated);
            }
            let drafts = on_registration(&updated, player);
            let mut change = ScheduleChange::inserting(updated, drafts);
            change.clear_schedule = rebuild;
            Ok(Some(change))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!(
            "Player {player} registered in tournament {id} ({} matches scheduled)",
            tournament.match_schedule.len()
        );
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// Unregister a player, dropping their byes and unfinished matches.
    pub fn remove_player_from_tournament(
        &self,
        id: TournamentId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        let committed = self.transact(id, |t, matches| {
            if !t.has_player(player) {
                return Err(EngineError::NotFound(EntityKind::Player, player));
            }
            if t.has_started(Utc::now()) {
                return Err(EngineError::bad_request(
                    "Players cannot be removed after the tournament has started",
                ));
            }
            let mut updated = t.clone();
            updated.unregister(&[player]);
            let delete = abandoned_matches(matches, &[player]);
            let change = match updated.kind {
                TournamentType::PreliminaryPlayoff | TournamentType::Swiss => {
                    if updated.kind == TournamentType::PreliminaryPlayoff {
                        regroup(&mut updated);
                    }
                    let drafts = full_schedule(&updated);
                    let mut change = ScheduleChange::inserting(updated, drafts);
                    change.clear_schedule = true;
                    change
                }
                _ => {
                    let mut change = ScheduleChange::new(updated);
                    change.delete = delete;
                    change
                }
            };
            Ok(Some(change))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!("Player {player} removed from tournament {id}");
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// Edit the settings of a tournament that has not started. A new group size
    /// regroups a preliminary tournament and rebuilds its schedule.
    pub fn update_tournament(
        &self,
        id: TournamentId,
        req: UpdateTournamentRequest,
    ) -> EngineResult<Tournament> {
        let committed = self.transact(id, |t, _| {
            let now = Utc::now();
            if t.has_started(now) {
                return Err(EngineError::bad_request(
                    "Cannot update the tournament after it has started.",
                ));
            }
            let settings = req.clone().merge_into(t.settings());
            settings.validate(now)?;
            if settings.effective_max_players() < t.players.len() {
                return Err(EngineError::bad_request(
                    "Maximum players cannot be lower than the number of registered players",
                ));
            }
            let mut updated = t.clone();
            updated.apply_settings(settings);
            if updated.number_of_teams.is_some_and(|n| n < updated.teams.len())
                || updated
                    .players_per_team
                    .is_some_and(|n| updated.teams.iter().any(|team| team.players.len() > n))
            {
                return Err(EngineError::bad_request(
                    "The current teams do not fit the new team settings",
                ));
            }
            let regrouped = updated.kind == TournamentType::PreliminaryPlayoff
                && updated.groups_size_preference != t.groups_size_preference
                && !updated.players.is_empty();
            if !regrouped {
                return Ok(Some(ScheduleChange::new(updated)));
            }
            regroup(&mut updated);
            let drafts = full_schedule(&updated);
            let mut change = ScheduleChange::inserting(updated, drafts);
            change.clear_schedule = true;
            Ok(Some(change))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!("Tournament {id} updated");
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// Remove a tournament together with all of its matches.
    pub fn delete_tournament(&self, id: TournamentId) -> EngineResult<()> {
        match self.store.delete_tournament(id)? {
            Some(removed) => {
                info!(
                    "Tournament {id} deleted with {} scheduled match(es)",
                    removed.match_schedule.len()
                );
                Ok(())
            }
            None => Err(EngineError::NotFound(EntityKind::Tournament, id)),
        }
    }

    /// Build the full schedule once; an already scheduled tournament is returned as is.
    pub fn generate_tournament_schedule(&self, id: TournamentId) -> EngineResult<Tournament> {
        let committed = self.transact(id, |t, _| {
            if !t.match_schedule.is_empty() {
                return Ok(None);
            }
            let mut updated = t.clone();
            if updated.kind == TournamentType::PreliminaryPlayoff && updated.groups.is_empty() {
                regroup(&mut updated);
            }
            let drafts = full_schedule(&updated);
            if drafts.is_empty() && updated.groups == t.groups {
                return Ok(None);
            }
            Ok(Some(ScheduleChange::inserting(updated, drafts)))
        })?;
        match committed {
            Some(committed) => {
                info!(
                    "Tournament {id}: schedule generated with {} matches",
                    committed.inserted.len()
                );
                self.publish_tournament(&committed.tournament);
                Ok(committed.tournament)
            }
            None => self.load_tournament(id),
        }
    }

    /// Resolve every unfinished match of `player` in favour of the opponent and
    /// run progression for each. Returns the resolved matches.
    pub fn mark_user_matches_lost(
        &self,
        id: TournamentId,
        player: PlayerId,
    ) -> EngineResult<Vec<Match>> {
        if player.is_nil() {
            return Err(EngineError::bad_request("Player id is required"));
        }
        let tournament = self.load_tournament(id)?;
        if !tournament.has_player(player) {
            return Err(EngineError::NotFound(EntityKind::Player, player));
        }
        let pending: Vec<Match> = self
            .store
            .find_matches(&MatchFilter::Tournament(id))?
            .into_iter()
            .filter(|m| m.has_player(player) && !m.is_finished() && !m.is_bye())
            .collect();

        let mut resolved = Vec::with_capacity(pending.len());
        for m in &pending {
            let (saved, outcome) = self.update_match(m.id, |m| {
                if m.is_finished() {
                    return Ok(None);
                }
                let opponent = m.opponent_of(player).ok_or_else(|| {
                    EngineError::bad_request("The match has no opponent to award")
                })?;
                match_state::award_walkover(m, opponent, Utc::now()).map(Some)
            })?;
            if let Some(Outcome::Decided(_)) = outcome {
                self.publish_match(events::MATCH_LOST, &saved);
                resolved.push(saved);
            }
        }

        let mut first_error = None;
        for m in &resolved {
            if let Err(e) = self.progress(m) {
                warn!("Progression after match {} was lost failed: {e}", m.id);
                first_error.get_or_insert(e);
            }
        }
        info!(
            "Player {player} lost {} unfinished match(es) in tournament {id}",
            resolved.len()
        );
        self.publish_tournament(&self.load_tournament(id)?);
        match first_error {
            Some(e) => Err(e),
            None => Ok(resolved),
        }
    }

    pub fn tournament_standings(&self, id: TournamentId) -> EngineResult<Standings> {
        let tournament = self.load_tournament(id)?;
        let matches = self.store.find_matches(&MatchFilter::Tournament(id))?;
        Ok(Standings {
            tournament_id: id,
            stage: tournament_stage(&tournament, &matches),
            groups: tournament_standings(&tournament, &matches),
        })
    }

    pub(super) fn committed_or_current(
        &self,
        id: TournamentId,
        committed: Option<Committed>,
    ) -> EngineResult<Tournament> {
        match committed {
            Some(committed) => Ok(committed.tournament),
            None => self.load_tournament(id),
        }
    }
}
