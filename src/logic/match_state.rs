//! Match life cycle: timer, scoring and outcome decision.
//!
//! `Scheduled → TimerRunning ⇄ TimerStopped → Finished`, with an overtime flag for
//! elimination matches that were level when time ran out. Every function validates
//! before it mutates, so a returned error leaves the match untouched.

use crate::error::{EngineError, EngineResult};
use crate::models::{Match, MatchRole, PlayerColor, PlayerId, Point, PointType, MAXIMUM_POINTS};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a scoring transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Match continues.
    Ongoing,
    /// Match finished with this winner.
    Decided(PlayerId),
    /// Match finished level (round-robin style matches only).
    Draw,
    /// Level at time-out in an elimination match; next decisive point wins.
    Overtime,
}

impl Outcome {
    /// Whether the match reached a terminal state in this transition.
    pub fn is_final(self) -> bool {
        matches!(self, Outcome::Decided(_) | Outcome::Draw)
    }
}

fn ensure_open(m: &Match) -> EngineResult<()> {
    if m.is_finished() {
        return Err(EngineError::bad_request("Finished matches cannot be edited"));
    }
    Ok(())
}

pub fn start_timer(m: &mut Match, now: DateTime<Utc>) -> EngineResult<()> {
    ensure_open(m)?;
    if m.timer_started_timestamp.is_some() {
        return Err(EngineError::bad_request("Timer is already started for the match"));
    }
    if m.start_timestamp.is_none() {
        m.start_timestamp = Some(now);
    }
    m.timer_started_timestamp = Some(now);
    m.is_timer_on = true;
    Ok(())
}

pub fn stop_timer(m: &mut Match, now: DateTime<Utc>) -> EngineResult<()> {
    ensure_open(m)?;
    if m.start_timestamp.is_none() || m.timer_started_timestamp.is_none() {
        return Err(EngineError::bad_request("Timer has not been started for the match"));
    }
    halt_timer(m, now);
    Ok(())
}

/// Fold the running interval into `elapsed_time` and switch the timer off.
fn halt_timer(m: &mut Match, now: DateTime<Utc>) {
    if let Some(started) = m.timer_started_timestamp.take() {
        m.elapsed_time += (now - started).num_milliseconds().max(0);
    }
    m.is_timer_on = false;
}

/// Record a point for the player wearing `color` and settle the outcome.
pub fn add_point(
    m: &mut Match,
    point_type: PointType,
    color: PlayerColor,
    now: DateTime<Utc>,
) -> EngineResult<Outcome> {
    ensure_open(m)?;
    if m.is_bye() {
        return Err(EngineError::bad_request("Points cannot be added to a bye"));
    }
    let player = m
        .players
        .iter_mut()
        .find(|p| p.color == color)
        .ok_or_else(|| EngineError::bad_request("No player with that color in the match"))?;
    player.points.push(Point {
        point_type,
        timestamp: now,
    });
    Ok(settle(m, now))
}

/// Decide the match when time has run out.
///
/// Different floored scores decide the match. Level scores end round-robin style
/// matches as a draw and send elimination matches to overtime.
pub fn check_for_tie(m: &mut Match, now: DateTime<Utc>) -> EngineResult<Outcome> {
    ensure_open(m)?;
    if m.is_bye() {
        return Err(EngineError::bad_request("A bye cannot be tied"));
    }
    let (s1, s2) = m.raw_scores();
    let outcome = if s1.floor() != s2.floor() {
        decide(m, s1, s2, now)
    } else if m.kind.is_elimination() {
        m.is_overtime = true;
        Outcome::Overtime
    } else {
        m.end_timestamp = Some(now);
        halt_timer(m, now);
        Outcome::Draw
    };
    update_scores(m, s1, s2);
    Ok(outcome)
}

/// Remove the most recent point of either player.
pub fn delete_recent_point(m: &mut Match) -> EngineResult<()> {
    ensure_open(m)?;
    let (player, index) = most_recent_point(m)
        .ok_or_else(|| EngineError::bad_request("The match has no points"))?;
    m.players[player].points.remove(index);
    let (s1, s2) = m.raw_scores();
    update_scores(m, s1, s2);
    Ok(())
}

/// Change the type of the most recent point, then settle the outcome again.
pub fn modify_recent_point(
    m: &mut Match,
    point_type: PointType,
    now: DateTime<Utc>,
) -> EngineResult<Outcome> {
    ensure_open(m)?;
    let (player, index) = most_recent_point(m)
        .ok_or_else(|| EngineError::bad_request("The match has no points"))?;
    m.players[player].points[index].point_type = point_type;
    Ok(settle(m, now))
}

/// Finish the match in favour of `winner` without play (opponent withdrew).
pub fn award_walkover(m: &mut Match, winner: PlayerId, now: DateTime<Utc>) -> EngineResult<Outcome> {
    ensure_open(m)?;
    if !m.has_player(winner) {
        return Err(EngineError::bad_request("Winner must be a player of the match"));
    }
    m.winner = Some(winner);
    m.end_timestamp = Some(now);
    halt_timer(m, now);
    Ok(Outcome::Decided(winner))
}

/// Clear points, time and overtime of an unfinished match.
pub fn reset(m: &mut Match) -> EngineResult<()> {
    ensure_open(m)?;
    for p in &mut m.players {
        p.points.clear();
    }
    m.start_timestamp = None;
    m.timer_started_timestamp = None;
    m.elapsed_time = 0;
    m.is_timer_on = false;
    m.is_overtime = false;
    m.player1_score = 0;
    m.player2_score = 0;
    Ok(())
}

/// Put `official` in charge of `role`, replacing whoever held it.
pub fn assign_official(m: &mut Match, role: MatchRole, official: PlayerId) -> EngineResult<()> {
    ensure_open(m)?;
    if official.is_nil() {
        return Err(EngineError::bad_request("Official id is required"));
    }
    *m.official_mut(role) = Some(official);
    Ok(())
}

pub fn clear_official(m: &mut Match, role: MatchRole) -> EngineResult<()> {
    ensure_open(m)?;
    *m.official_mut(role) = None;
    Ok(())
}

/// Release both officials.
pub fn reset_roles(m: &mut Match) -> EngineResult<()> {
    ensure_open(m)?;
    m.time_keeper = None;
    m.point_maker = None;
    Ok(())
}

/// (player index, point index) of the latest point; ties go to the later player.
fn most_recent_point(m: &Match) -> Option<(usize, usize)> {
    m.players
        .iter()
        .enumerate()
        .flat_map(|(pi, p)| p.points.iter().enumerate().map(move |(i, pt)| (pi, i, pt.timestamp)))
        .max_by_key(|&(pi, i, ts)| (ts, pi, i))
        .map(|(pi, i, _)| (pi, i))
}

/// Win check after the point lists changed.
fn settle(m: &mut Match, now: DateTime<Utc>) -> Outcome {
    let (s1, s2) = m.raw_scores();
    let outcome = if s1 >= MAXIMUM_POINTS || s2 >= MAXIMUM_POINTS {
        decide(m, s1, s2, now)
    } else if m.is_overtime && s1.floor() != s2.floor() {
        // sudden death
        decide(m, s1, s2, now)
    } else {
        Outcome::Ongoing
    };
    update_scores(m, s1, s2);
    outcome
}

fn decide(m: &mut Match, s1: f64, s2: f64, now: DateTime<Utc>) -> Outcome {
    let index = if s1 > s2 { 0 } else { 1 };
    let winner = m.players[index].id;
    m.winner = Some(winner);
    m.end_timestamp = Some(now);
    halt_timer(m, now);
    Outcome::Decided(winner)
}

fn update_scores(m: &mut Match, s1: f64, s2: f64) {
    m.player1_score = s1.floor() as u32;
    m.player2_score = s2.floor() as u32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DraftTemplate, MatchType};
    use chrono::Duration;
    use uuid::Uuid;

    fn two_player_match(kind: MatchType) -> Match {
        DraftTemplate::new(None, kind, 1)
            .pair(Uuid::new_v4(), Uuid::new_v4())
            .into_match(Uuid::new_v4())
    }

    #[test]
    fn hansoku_counts_half_for_the_opponent() {
        let mut m = two_player_match(MatchType::Group);
        let now = Utc::now();
        add_point(&mut m, PointType::Men, PlayerColor::White, now).unwrap();
        add_point(&mut m, PointType::Hansoku, PlayerColor::Red, now).unwrap();
        assert_eq!(m.raw_scores(), (1.5, 0.0));
        assert_eq!((m.player1_score, m.player2_score), (1, 0));
        assert!(m.winner.is_none());
    }

    #[test]
    fn two_ippons_win_and_stop_the_clock() {
        let mut m = two_player_match(MatchType::Group);
        let t0 = Utc::now();
        start_timer(&mut m, t0).unwrap();
        add_point(&mut m, PointType::Kote, PlayerColor::Red, t0).unwrap();
        let outcome =
            add_point(&mut m, PointType::Do, PlayerColor::Red, t0 + Duration::seconds(3)).unwrap();
        assert_eq!(outcome, Outcome::Decided(m.players[1].id));
        assert!(!m.is_timer_on);
        assert_eq!(m.elapsed_time, 3000);
        assert!(add_point(&mut m, PointType::Men, PlayerColor::White, t0).is_err());
    }

    #[test]
    fn overtime_is_sudden_death() {
        let mut m = two_player_match(MatchType::Playoff);
        let now = Utc::now();
        assert_eq!(check_for_tie(&mut m, now).unwrap(), Outcome::Overtime);
        let outcome = add_point(&mut m, PointType::Tsuki, PlayerColor::White, now).unwrap();
        assert_eq!(outcome, Outcome::Decided(m.players[0].id));
    }

    #[test]
    fn officials_are_locked_once_the_match_ends() {
        let mut m = two_player_match(MatchType::Group);
        let (keeper, maker) = (Uuid::new_v4(), Uuid::new_v4());
        assign_official(&mut m, MatchRole::TimeKeeper, keeper).unwrap();
        assign_official(&mut m, MatchRole::PointMaker, maker).unwrap();
        assert_eq!((m.time_keeper, m.point_maker), (Some(keeper), Some(maker)));
        clear_official(&mut m, MatchRole::PointMaker).unwrap();
        assert_eq!(m.point_maker, None);
        assert!(assign_official(&mut m, MatchRole::PointMaker, Uuid::nil()).is_err());

        check_for_tie(&mut m, Utc::now()).unwrap();
        assert!(m.is_draw());
        assert!(reset_roles(&mut m).is_err());
        assert!(clear_official(&mut m, MatchRole::TimeKeeper).is_err());
        assert_eq!(m.time_keeper, Some(keeper));
    }

    #[test]
    fn delete_recent_point_removes_the_latest() {
        let mut m = two_player_match(MatchType::Group);
        let t0 = Utc::now();
        add_point(&mut m, PointType::Men, PlayerColor::White, t0).unwrap();
        add_point(&mut m, PointType::Kote, PlayerColor::Red, t0 + Duration::seconds(1)).unwrap();
        delete_recent_point(&mut m).unwrap();
        assert_eq!(m.players[0].points.len(), 1);
        assert!(m.players[1].points.is_empty());
        assert_eq!((m.player1_score, m.player2_score), (1, 0));
    }
}
