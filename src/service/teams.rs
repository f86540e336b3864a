//! Team roster of a team round robin: teams, joining, leaving and kicks.
//!
//! Team members are registered players of the tournament; joining a team registers
//! the player and leaving it unregisters them, in the same commit.

use super::tournaments::abandoned_matches;
use super::Engine;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::models::{PlayerId, Team, TeamId, Tournament, TournamentId, TournamentType};
use crate::store::ScheduleChange;
use chrono::Utc;
use log::info;
use uuid::Uuid;

/// Roster edits are only allowed on team tournaments that have not started.
fn ensure_roster_open(t: &Tournament) -> EngineResult<()> {
    if t.kind != TournamentType::TeamRoundRobin {
        return Err(EngineError::bad_request(
            "Teams are only used in team round robin tournaments",
        ));
    }
    if t.has_started(Utc::now()) {
        return Err(EngineError::bad_request(
            "Teams cannot be changed after the tournament has started",
        ));
    }
    Ok(())
}

fn find_team(t: &Tournament, team: TeamId) -> EngineResult<&Team> {
    t.team(team)
        .ok_or(EngineError::NotFound(EntityKind::Team, team))
}

impl Engine {
    pub fn add_team_to_tournament(&self, id: TournamentId, name: &str) -> EngineResult<Tournament> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EngineError::bad_request("Team name is required"));
        }
        let committed = self.transact(id, |t, _| {
            ensure_roster_open(t)?;
            if t.teams.iter().any(|team| team.name == name) {
                return Err(EngineError::bad_request(
                    "A team with this name already exists in the tournament",
                ));
            }
            if t.number_of_teams.is_some_and(|n| t.teams.len() >= n) {
                return Err(EngineError::bad_request("The tournament has no room for another team"));
            }
            let mut updated = t.clone();
            updated.teams.push(Team::new(Uuid::new_v4(), name));
            Ok(Some(ScheduleChange::new(updated)))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!("Team {name} added to tournament {id}");
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// Remove a team; its members leave the tournament with it.
    pub fn remove_team_from_tournament(
        &self,
        id: TournamentId,
        team: TeamId,
    ) -> EngineResult<Tournament> {
        let committed = self.transact(id, |t, matches| {
            ensure_roster_open(t)?;
            let members = find_team(t, team)?.players.clone();
            let mut updated = t.clone();
            updated.teams.retain(|existing| existing.id != team);
            updated.unregister(&members);
            let mut change = ScheduleChange::new(updated);
            change.delete = abandoned_matches(matches, &members);
            Ok(Some(change))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!("Team {team} removed from tournament {id}");
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// Put a player in a team, registering them in the tournament if needed.
    pub fn join_team(
        &self,
        id: TournamentId,
        team: TeamId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        if player.is_nil() {
            return Err(EngineError::bad_request("Player id is required"));
        }
        let committed = self.transact(id, |t, _| {
            ensure_roster_open(t)?;
            let joined = find_team(t, team)?;
            if joined.has_player(player) {
                return Err(EngineError::bad_request("User is already a member of this team"));
            }
            if t.team_of(player).is_some() {
                return Err(EngineError::bad_request(
                    "User is already a member of another team",
                ));
            }
            if t.players_per_team.is_some_and(|n| joined.players.len() >= n) {
                return Err(EngineError::bad_request("The team is full"));
            }
            let mut updated = t.clone();
            if !updated.has_player(player) {
                if updated.is_full() {
                    return Err(EngineError::bad_request("The tournament is full"));
                }
                updated.players.push(player);
            }
            if let Some(joined) = updated.team_mut(team) {
                joined.players.push(player);
            }
            Ok(Some(ScheduleChange::new(updated)))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        info!("Player {player} joined team {team} in tournament {id}");
        self.publish_tournament(&tournament);
        Ok(tournament)
    }

    /// A member leaves their team and the tournament.
    pub fn leave_team(
        &self,
        id: TournamentId,
        team: TeamId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        let tournament = self.drop_team_member(id, team, player)?;
        info!("Player {player} left team {team} in tournament {id}");
        Ok(tournament)
    }

    /// The organizer removes a member from a team and the tournament.
    pub fn kick_player_from_team(
        &self,
        id: TournamentId,
        team: TeamId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        let tournament = self.drop_team_member(id, team, player)?;
        info!("Player {player} was removed from team {team} in tournament {id}");
        Ok(tournament)
    }

    fn drop_team_member(
        &self,
        id: TournamentId,
        team: TeamId,
        player: PlayerId,
    ) -> EngineResult<Tournament> {
        let committed = self.transact(id, |t, matches| {
            ensure_roster_open(t)?;
            if !find_team(t, team)?.has_player(player) {
                return Err(EngineError::NotFound(EntityKind::Player, player));
            }
            let mut updated = t.clone();
            updated.unregister(&[player]);
            let mut change = ScheduleChange::new(updated);
            change.delete = abandoned_matches(matches, &[player]);
            Ok(Some(change))
        })?;
        let tournament = self.committed_or_current(id, committed)?;
        self.publish_tournament(&tournament);
        Ok(tournament)
    }
}
