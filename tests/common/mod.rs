//! Shared fixtures for the engine integration tests.
#![allow(dead_code)]

use chrono::{Duration, Utc};
use kendo_tournament_web::{
    AddPointRequest, CreateTournamentRequest, Engine, Match, MemoryStore, Notifier,
    PlayerId, PointType, Tournament, TournamentId, TournamentType,
};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Notifier that keeps every published event for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, String, serde_json::Value)>>,
}

impl RecordingNotifier {
    /// Channels of all events with this name, in publish order.
    pub fn channels(&self, event: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, name, _)| name == event)
            .map(|(channel, _, _)| channel.clone())
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.channels(event).len()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event.to_string(), payload));
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn engine() -> (Engine, Arc<RecordingNotifier>) {
    init_logging();
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Engine::new(Arc::new(MemoryStore::new()), notifier.clone());
    (engine, notifier)
}

/// Creation request for a tournament starting tomorrow.
pub fn tournament_request(kind: TournamentType, max_players: usize) -> CreateTournamentRequest {
    CreateTournamentRequest {
        name: format!("{kind:?} cup"),
        kind,
        start_date: Utc::now() + Duration::days(1),
        end_date: Utc::now() + Duration::days(2),
        max_players,
        match_time: Some(180_000),
        groups_size_preference: None,
        players_to_playoffs_per_group: None,
        number_of_teams: None,
        players_per_team: None,
    }
}

/// Preliminary-playoff tournament with groups of `group_size`, `advancing` per group.
pub fn preliminary_request(group_size: usize, advancing: usize) -> CreateTournamentRequest {
    CreateTournamentRequest {
        groups_size_preference: Some(group_size),
        players_to_playoffs_per_group: Some(advancing),
        ..tournament_request(TournamentType::PreliminaryPlayoff, 32)
    }
}

/// Team round robin for `teams` teams of `per_team` players.
pub fn team_request(teams: usize, per_team: usize) -> CreateTournamentRequest {
    CreateTournamentRequest {
        number_of_teams: Some(teams),
        players_per_team: Some(per_team),
        ..tournament_request(TournamentType::TeamRoundRobin, 0)
    }
}

/// Register `n` fresh players, returning them in registration order.
pub fn register(engine: &Engine, id: TournamentId, n: usize) -> Vec<PlayerId> {
    (0..n)
        .map(|_| {
            let player = Uuid::new_v4();
            engine.add_player_to_tournament(id, player).unwrap();
            player
        })
        .collect()
}

pub fn tournament_with_players(
    engine: &Engine,
    req: CreateTournamentRequest,
    n: usize,
) -> (Tournament, Vec<PlayerId>) {
    let t = engine.create_tournament(req).unwrap();
    let players = register(engine, t.id, n);
    (engine.get_tournament(t.id).unwrap(), players)
}

pub fn point(engine: &Engine, m: &Match, player: PlayerId, point_type: PointType) -> Match {
    let color = m
        .players
        .iter()
        .find(|p| p.id == player)
        .map(|p| p.color)
        .unwrap();
    engine
        .add_point(m.id, AddPointRequest { point_type, color })
        .unwrap()
}

/// Let `winner` score two men; returns the finished match.
pub fn win(engine: &Engine, m: &Match, winner: PlayerId) -> Match {
    point(engine, m, winner, PointType::Men);
    let finished = point(engine, m, winner, PointType::Men);
    assert_eq!(finished.winner, Some(winner));
    finished
}

/// The match between `a` and `b` among `matches`.
pub fn between(matches: &[Match], a: PlayerId, b: PlayerId) -> Match {
    matches
        .iter()
        .find(|m| m.has_player(a) && m.has_player(b))
        .cloned()
        .unwrap()
}
