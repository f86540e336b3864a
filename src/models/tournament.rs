//! Tournament aggregate and its creation request.

use crate::error::{EngineError, EngineResult};
use crate::models::game::MatchId;
use crate::models::player::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Unique identifier for a team within a tournament.
pub type TeamId = Uuid;

/// Smallest allowed preliminary group.
pub const MINIMUM_GROUP_SIZE: usize = 3;

/// Tournament format.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum TournamentType {
    RoundRobin,
    TeamRoundRobin,
    Playoff,
    PreliminaryPlayoff,
    Swiss,
}

/// Named roster of players competing together in a team round robin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub players: Vec<PlayerId>,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            players: Vec::new(),
        }
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }
}

/// Full tournament record. Matches are stored separately and joined by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    /// Store-managed revision used for compare-and-swap saves.
    #[serde(default)]
    pub version: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TournamentType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_players: usize,
    /// Regulation match time in milliseconds.
    pub match_time: Option<i64>,
    /// Registered players, in registration order.
    pub players: Vec<PlayerId>,
    /// Preliminary groups; empty for other formats.
    #[serde(default)]
    pub groups: Vec<Vec<PlayerId>>,
    pub groups_size_preference: Option<usize>,
    pub players_to_playoffs_per_group: Option<usize>,
    #[serde(default)]
    pub number_of_teams: Option<usize>,
    #[serde(default)]
    pub players_per_team: Option<usize>,
    /// Team rosters of a team round robin; every member is also in `players`.
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub match_schedule: Vec<MatchId>,
}

impl Tournament {
    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    /// Registration closes once the start date has passed.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now > self.start_date
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Index of the preliminary group containing `player`.
    pub fn group_of(&self, player: PlayerId) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&player))
    }

    /// Players per group that advance from the preliminary stage.
    pub fn advancing_per_group(&self) -> usize {
        self.players_to_playoffs_per_group.unwrap_or(1)
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    /// Team the player belongs to, if any.
    pub fn team_of(&self, player: PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.has_player(player))
    }

    /// Drop players from the roster and from their teams.
    pub fn unregister(&mut self, players: &[PlayerId]) {
        self.players.retain(|p| !players.contains(p));
        for team in &mut self.teams {
            team.players.retain(|p| !players.contains(p));
        }
    }

    /// Current settings in request form, so edits go through the creation checks.
    pub fn settings(&self) -> CreateTournamentRequest {
        CreateTournamentRequest {
            name: self.name.clone(),
            kind: self.kind,
            start_date: self.start_date,
            end_date: self.end_date,
            max_players: self.max_players,
            match_time: self.match_time,
            groups_size_preference: self.groups_size_preference,
            players_to_playoffs_per_group: self.players_to_playoffs_per_group,
            number_of_teams: self.number_of_teams,
            players_per_team: self.players_per_team,
        }
    }

    /// Overwrite the settings; roster, teams and schedule are kept.
    pub fn apply_settings(&mut self, settings: CreateTournamentRequest) {
        self.max_players = settings.effective_max_players();
        self.name = settings.name.trim().to_string();
        self.kind = settings.kind;
        self.start_date = settings.start_date;
        self.end_date = settings.end_date;
        self.match_time = settings.match_time;
        self.groups_size_preference = settings.groups_size_preference;
        self.players_to_playoffs_per_group = settings.players_to_playoffs_per_group;
        self.number_of_teams = settings.number_of_teams;
        self.players_per_team = settings.players_per_team;
    }
}

/// Input for creating a tournament.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTournamentRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TournamentType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_players: usize,
    #[serde(default)]
    pub match_time: Option<i64>,
    #[serde(default)]
    pub groups_size_preference: Option<usize>,
    #[serde(default)]
    pub players_to_playoffs_per_group: Option<usize>,
    #[serde(default)]
    pub number_of_teams: Option<usize>,
    #[serde(default)]
    pub players_per_team: Option<usize>,
}

impl CreateTournamentRequest {
    /// Team round robins are sized by their teams.
    pub fn effective_max_players(&self) -> usize {
        match (self.kind, self.number_of_teams, self.players_per_team) {
            (TournamentType::TeamRoundRobin, Some(teams), Some(per_team)) => teams * per_team,
            _ => self.max_players,
        }
    }

    /// Check dates and format-specific settings.
    pub fn validate(&self, now: DateTime<Utc>) -> EngineResult<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::bad_request("Tournament name is required"));
        }
        if self.start_date >= self.end_date {
            return Err(EngineError::bad_request(
                "Invalid tournament dates. The start date must be before the end date.",
            ));
        }
        if self.start_date < now {
            return Err(EngineError::bad_request(
                "Invalid tournament date. The start date and time cannot be in the past.",
            ));
        }
        if self.kind == TournamentType::RoundRobin && self.max_players < 2 {
            return Err(EngineError::bad_request(
                "At least two players are required for a round robin tournament.",
            ));
        }
        if self.kind == TournamentType::PreliminaryPlayoff {
            match self.groups_size_preference {
                None => {
                    return Err(EngineError::bad_request(
                        "Group size preference is required for Preliminary Playoff tournaments.",
                    ))
                }
                Some(size) if size < MINIMUM_GROUP_SIZE => {
                    return Err(EngineError::bad_request(format!(
                        "Group size needs to be {MINIMUM_GROUP_SIZE} on minimum"
                    )))
                }
                Some(_) => {}
            }
            match self.players_to_playoffs_per_group {
                None | Some(0) => {
                    return Err(EngineError::bad_request(
                        "Players to playoffs per group is required for Preliminary Playoff tournaments.",
                    ))
                }
                Some(_) => {}
            }
        }
        if self.kind == TournamentType::TeamRoundRobin {
            match (self.number_of_teams, self.players_per_team) {
                (Some(teams), Some(per_team)) if teams >= 2 && per_team > 0 => {}
                _ => {
                    return Err(EngineError::bad_request(
                        "Number of teams and players per team are required for Team Round Robin tournaments.",
                    ))
                }
            }
        }
        Ok(())
    }

    /// Build the (empty) tournament record under the given id.
    pub fn into_tournament(self, id: TournamentId) -> Tournament {
        Tournament {
            id,
            version: 0,
            name: self.name.trim().to_string(),
            kind: self.kind,
            start_date: self.start_date,
            end_date: self.end_date,
            max_players: self.effective_max_players(),
            match_time: self.match_time,
            players: Vec::new(),
            groups: Vec::new(),
            groups_size_preference: self.groups_size_preference,
            players_to_playoffs_per_group: self.players_to_playoffs_per_group,
            number_of_teams: self.number_of_teams,
            players_per_team: self.players_per_team,
            teams: Vec::new(),
            match_schedule: Vec::new(),
        }
    }
}

/// Partial edit of a tournament's settings; absent fields are left as they are.
/// The format itself cannot be changed.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTournamentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_players: Option<usize>,
    #[serde(default)]
    pub match_time: Option<i64>,
    #[serde(default)]
    pub groups_size_preference: Option<usize>,
    #[serde(default)]
    pub players_to_playoffs_per_group: Option<usize>,
    #[serde(default)]
    pub number_of_teams: Option<usize>,
    #[serde(default)]
    pub players_per_team: Option<usize>,
}

impl UpdateTournamentRequest {
    /// The given settings with this edit applied.
    pub fn merge_into(self, mut settings: CreateTournamentRequest) -> CreateTournamentRequest {
        if let Some(name) = self.name {
            settings.name = name;
        }
        if let Some(start_date) = self.start_date {
            settings.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            settings.end_date = end_date;
        }
        if let Some(max_players) = self.max_players {
            settings.max_players = max_players;
        }
        if self.match_time.is_some() {
            settings.match_time = self.match_time;
        }
        if self.groups_size_preference.is_some() {
            settings.groups_size_preference = self.groups_size_preference;
        }
        if self.players_to_playoffs_per_group.is_some() {
            settings.players_to_playoffs_per_group = self.players_to_playoffs_per_group;
        }
        if self.number_of_teams.is_some() {
            settings.number_of_teams = self.number_of_teams;
        }
        if self.players_per_team.is_some() {
            settings.players_per_team = self.players_per_team;
        }
        settings
    }
}
