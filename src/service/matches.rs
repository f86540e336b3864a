//! Match operations: creation, scoring, timer, and the progression they trigger.

use super::Engine;
use crate::error::{EngineError, EngineResult, EntityKind};
use crate::logic::match_state::{self, Outcome};
use crate::logic::progression::{self, TransitionRules};
use crate::models::{
    Match, MatchDraft, MatchId, MatchPlayer, MatchRole, MatchType, PlayerColor, PlayerId,
    PointType, TournamentId,
};
use crate::notify::events;
use crate::store::{MatchFilter, ScheduleChange};
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Input for creating a single match by hand.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    /// Attach the match to this tournament; its roster must contain both players.
    #[serde(default)]
    pub tournament_id: Option<TournamentId>,
    #[serde(rename = "type")]
    pub kind: MatchType,
    pub players: Vec<MatchPlayer>,
    #[serde(default)]
    pub tournament_round: Option<u32>,
}

impl CreateMatchRequest {
    fn validate(&self) -> EngineResult<()> {
        match self.players.as_slice() {
            [a, b] if a.id == b.id => Err(EngineError::bad_request(
                "A match needs two different players",
            )),
            [a, b] if a.color == b.color => Err(EngineError::bad_request(
                "Players of a match must wear different colors",
            )),
            [_, _] => Ok(()),
            _ => Err(EngineError::bad_request("A match needs exactly two players")),
        }
    }

    fn into_draft(self, match_time: Option<i64>) -> MatchDraft {
        let mut players: Vec<MatchPlayer> = self
            .players
            .into_iter()
            .map(|p| MatchPlayer::new(p.id, p.color))
            .collect();
        players.sort_by_key(|p| p.color != PlayerColor::White);
        MatchDraft {
            tournament_id: self.tournament_id,
            kind: self.kind,
            tournament_round: self.tournament_round.unwrap_or(1).max(1),
            players,
            winner: None,
            match_time,
        }
    }
}

/// Body of an add-point call.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct AddPointRequest {
    #[serde(rename = "type")]
    pub point_type: PointType,
    pub color: PlayerColor,
}

impl Engine {
    pub fn create_match(&self, req: CreateMatchRequest) -> EngineResult<Match> {
        req.validate()?;
        let Some(tournament_id) = req.tournament_id else {
            return Ok(self.store.insert_match(req.into_draft(None))?);
        };

        let committed = self.transact(tournament_id, |t, _| {
            if let Some(p) = req.players.iter().find(|p| !t.has_player(p.id)) {
                return Err(EngineError::bad_request(format!(
                    "Player {} is not registered in the tournament",
                    p.id
                )));
            }
            if t.has_started(Utc::now()) {
                return Err(EngineError::bad_request(
                    "Matches cannot be added after the tournament has started",
                ));
            }
            let draft = req.clone().into_draft(t.match_time);
            Ok(Some(ScheduleChange::inserting(t.clone(), vec![draft])))
        })?;
        let committed = committed.ok_or_else(|| {
            EngineError::bad_request("The match could not be added to the tournament")
        })?;
        self.publish_tournament(&committed.tournament);
        committed
            .inserted
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::bad_request("The match could not be added to the tournament"))
    }

    pub fn get_match(&self, id: MatchId) -> EngineResult<Match> {
        self.load_match(id)
    }

    /// Delete a match, removing it from its tournament's schedule.
    pub fn delete_match(&self, id: MatchId) -> EngineResult<()> {
        let Some(owner) = self.store.find_tournament_by_match(id)? else {
            let removed = self.store.delete_matches(&MatchFilter::Ids(vec![id]))?;
            if removed == 0 {
                return Err(EngineError::NotFound(EntityKind::Match, id));
            }
            return Ok(());
        };
        let committed = self.transact(owner.id, |t, _| {
            if !t.match_schedule.contains(&id) {
                return Err(EngineError::NotFound(EntityKind::Match, id));
            }
            let mut change = ScheduleChange::new(t.clone());
            change.delete.push(id);
            Ok(Some(change))
        })?;
        if let Some(committed) = committed {
            info!("Match {id} deleted from tournament {}", owner.id);
            self.publish_tournament(&committed.tournament);
        }
        Ok(())
    }

    pub fn start_timer(&self, id: MatchId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, |m| match_state::start_timer(m, Utc::now()))?;
        self.publish_match(events::START_TIMER, &m);
        Ok(m)
    }

    pub fn stop_timer(&self, id: MatchId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, |m| match_state::stop_timer(m, Utc::now()))?;
        self.publish_match(events::STOP_TIMER, &m);
        Ok(m)
    }

    /// Score a point; a deciding point of a multi-stage match runs progression.
    pub fn add_point(&self, id: MatchId, point: AddPointRequest) -> EngineResult<Match> {
        let (m, outcome) = self.update_match(id, |m| {
            match_state::add_point(m, point.point_type, point.color, Utc::now())
        })?;
        self.publish_match(events::ADD_POINT, &m);
        self.after_transition(&m, outcome)?;
        Ok(m)
    }

    /// Decide the match when its time is up (winner, draw or overtime).
    pub fn check_for_tie(&self, id: MatchId) -> EngineResult<Match> {
        let (m, outcome) = self.update_match(id, |m| match_state::check_for_tie(m, Utc::now()))?;
        self.publish_match(events::CHECK_TIE, &m);
        self.after_transition(&m, outcome)?;
        Ok(m)
    }

    pub fn delete_recent_point(&self, id: MatchId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, match_state::delete_recent_point)?;
        self.publish_match(events::DELETE_RECENT, &m);
        Ok(m)
    }

    pub fn modify_recent_point(&self, id: MatchId, point_type: PointType) -> EngineResult<Match> {
        let (m, outcome) = self.update_match(id, |m| {
            match_state::modify_recent_point(m, point_type, Utc::now())
        })?;
        self.publish_match(events::MODIFY_RECENT, &m);
        self.after_transition(&m, outcome)?;
        Ok(m)
    }

    pub fn reset_match(&self, id: MatchId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, match_state::reset)?;
        self.publish_match(events::RESET_MATCH, &m);
        Ok(m)
    }

    /// Appoint the time keeper or point maker of an unfinished match.
    pub fn add_official(&self, id: MatchId, role: MatchRole, official: PlayerId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, |m| match_state::assign_official(m, role, official))?;
        let event = match role {
            MatchRole::TimeKeeper => events::ADD_TIME_KEEPER,
            MatchRole::PointMaker => events::ADD_POINT_MAKER,
        };
        self.publish_match(event, &m);
        Ok(m)
    }

    pub fn remove_official(&self, id: MatchId, role: MatchRole) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, |m| match_state::clear_official(m, role))?;
        let event = match role {
            MatchRole::TimeKeeper => events::REMOVE_TIME_KEEPER,
            MatchRole::PointMaker => events::REMOVE_POINT_MAKER,
        };
        self.publish_match(event, &m);
        Ok(m)
    }

    pub fn reset_roles(&self, id: MatchId) -> EngineResult<Match> {
        let (m, ()) = self.update_match(id, match_state::reset_roles)?;
        self.publish_match(events::RESET_ROLES, &m);
        Ok(m)
    }

    /// Re-run progression for a finished match, e.g. after a conflict exhausted the
    /// automatic attempt. Returns the matches it created.
    pub fn progress_match(&self, id: MatchId) -> EngineResult<Vec<Match>> {
        let m = self.load_match(id)?;
        if !m.is_finished() {
            return Err(EngineError::bad_request("The match is not finished"));
        }
        self.progress(&m)
    }

    fn after_transition(&self, m: &Match, outcome: Outcome) -> EngineResult<()> {
        if outcome.is_final() && m.kind.is_multi_stage() {
            self.progress(m)?;
        }
        Ok(())
    }

    /// Create the follow-on matches of a finished match inside one tournament
    /// transaction.
    pub(super) fn progress(&self, finished: &Match) -> EngineResult<Vec<Match>> {
        if !finished.kind.is_multi_stage() {
            return Ok(Vec::new());
        }
        let Some(owner) = self.store.find_tournament_by_match(finished.id)? else {
            debug!("Match {} belongs to no tournament, nothing to progress", finished.id);
            return Ok(Vec::new());
        };
        let rules = TransitionRules {
            max_replay_round: self.config.max_replay_round,
        };
        let mut rng = rand::thread_rng();
        let committed = self.transact(owner.id, |t, matches| {
            let Some(current) = matches.iter().find(|m| m.id == finished.id) else {
                return Ok(None);
            };
            let drafts = progression::plan(t, matches, current, rules, &mut rng);
            if drafts.is_empty() {
                return Ok(None);
            }
            Ok(Some(ScheduleChange::inserting(t.clone(), drafts)))
        })?;
        match committed {
            Some(committed) => {
                self.publish_tournament(&committed.tournament);
                Ok(committed.inserted)
            }
            None => Ok(Vec::new()),
        }
    }
}
