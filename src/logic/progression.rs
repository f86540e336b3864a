//! Follow-on matches after a match finishes: bracket advancement and the
//! preliminary-to-playoff transition (with tie-break rounds).
//!
//! Everything here is pure planning over an already-read tournament and its matches.
//! The service commits the returned drafts atomically with the tournament, so running
//! a plan twice over the committed state yields nothing new.

use crate::logic::ranking::{compute_scores, cutoff_tie, rank_group, ScoreMap};
use crate::logic::schedule::{full_round_robin, sequential_pairs};
use crate::models::{
    DraftTemplate, Match, MatchDraft, MatchType, PlayerId, Tournament, TournamentType,
};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Derived stage of a tournament.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// No matches scheduled yet.
    Registration,
    /// Single-stage formats while matches remain.
    InProgress,
    Preliminary,
    /// Preliminary groups are being replayed or tie-break matches are running.
    TieBreak,
    Playoff,
    Complete,
}

pub fn highest_round(matches: &[Match]) -> u32 {
    matches
        .iter()
        .map(|m| m.tournament_round)
        .max()
        .unwrap_or(1)
        .max(1)
}

/// The bracket is decided once every playoff match is finished and the last round
/// is a single decided match. A pool of one player ends with its lone bye.
fn bracket_complete(matches: &[Match]) -> bool {
    let playoff: Vec<&Match> = matches.iter().filter(|m| m.kind == MatchType::Playoff).collect();
    let Some(last_round) = playoff.iter().map(|m| m.tournament_round).max() else {
        return false;
    };
    if !playoff.iter().all(|m| m.is_finished()) {
        return false;
    }
    let last: Vec<&&Match> = playoff
        .iter()
        .filter(|m| m.tournament_round == last_round)
        .collect();
    match last.as_slice() {
        [m] if m.is_bye() => playoff.len() == 1,
        [m] => m.winner.is_some(),
        _ => false,
    }
}

pub fn tournament_stage(tournament: &Tournament, matches: &[Match]) -> Stage {
    if matches.is_empty() {
        return Stage::Registration;
    }
    match tournament.kind {
        TournamentType::Playoff => {
            if bracket_complete(matches) {
                Stage::Complete
            } else {
                Stage::Playoff
            }
        }
        TournamentType::PreliminaryPlayoff => {
            if matches.iter().any(|m| m.kind == MatchType::Playoff) {
                if bracket_complete(matches) {
                    Stage::Complete
                } else {
                    Stage::Playoff
                }
            } else if matches.iter().any(|m| m.tournament_round > 1) {
                Stage::TieBreak
            } else {
                Stage::Preliminary
            }
        }
        TournamentType::RoundRobin | TournamentType::TeamRoundRobin | TournamentType::Swiss => {
            if matches.iter().all(Match::is_finished) {
                Stage::Complete
            } else {
                Stage::InProgress
            }
        }
    }
}

/// Knobs of the preliminary transition.
#[derive(Clone, Copy, Debug)]
pub struct TransitionRules {
    /// Last round at which a fully tied group is replayed instead of drawn at random.
    pub max_replay_round: u32,
}

impl Default for TransitionRules {
    fn default() -> Self {
        Self { max_replay_round: 3 }
    }
}

/// New matches caused by `finished`, given the tournament's current matches
/// (which already include `finished` in its final state).
pub fn plan<R: Rng + ?Sized>(
    tournament: &Tournament,
    matches: &[Match],
    finished: &Match,
    rules: TransitionRules,
    rng: &mut R,
) -> Vec<MatchDraft> {
    match finished.kind {
        MatchType::Playoff => advance_bracket(tournament, matches, finished),
        MatchType::Preliminary | MatchType::PrePlayoff => {
            advance_preliminary(tournament, matches, rules, rng)
        }
        MatchType::Group | MatchType::Swiss => Vec::new(),
    }
}

/// Pair the winner of `finished` into the next bracket round.
///
/// Winners of the same round that are not yet placed in the next round are paired
/// two at a time, the triggering winner first. Once the round is complete a single
/// leftover winner gets a bye so odd pools keep moving. The bye winner is advanced
/// in turn, since its partner in the next round may already have finished.
pub fn advance_bracket(tournament: &Tournament, matches: &[Match], finished: &Match) -> Vec<MatchDraft> {
    let Some(trigger) = finished.winner else {
        return Vec::new();
    };
    let round = finished.tournament_round;
    match tournament.kind {
        TournamentType::RoundRobin => return Vec::new(),
        TournamentType::PreliminaryPlayoff if round == 1 => return Vec::new(),
        _ => {}
    }
    let next_round = round + 1;
    let placed = |player: PlayerId| {
        matches.iter().any(|m| {
            m.kind == MatchType::Playoff && m.tournament_round == next_round && m.has_player(player)
        })
    };
    if placed(trigger) {
        return Vec::new();
    }

    let current: Vec<&Match> = matches
        .iter()
        .filter(|m| m.kind == MatchType::Playoff && m.tournament_round == round)
        .collect();
    let mut eligible = vec![trigger];
    for winner in current.iter().filter_map(|m| m.winner) {
        if !eligible.contains(&winner) && !placed(winner) {
            eligible.push(winner);
        }
    }

    let template = DraftTemplate::new(Some(tournament.id), MatchType::Playoff, next_round)
        .with_match_time(tournament.match_time);
    let mut drafts: Vec<MatchDraft> = eligible
        .chunks_exact(2)
        .map(|pair| template.pair(pair[0], pair[1]))
        .collect();

    let round_complete = current.iter().all(|m| m.is_finished());
    let winners_in_round = current.iter().filter(|m| m.winner.is_some()).count();
    let mut bye = None;
    if eligible.len() % 2 == 1 && round_complete && winners_in_round > 1 {
        if let Some(&leftover) = eligible.last() {
            let draft = template.bye(leftover);
            bye = Some(draft.clone().into_match(Uuid::nil()));
            drafts.push(draft);
        }
    }
    if !drafts.is_empty() {
        info!(
            "Tournament {}: {} playoff match(es) created for round {}",
            tournament.id,
            drafts.len(),
            next_round
        );
    }
    if let Some(bye) = bye {
        let mut projected = matches.to_vec();
        projected.extend(drafts.iter().cloned().map(|d| d.into_match(Uuid::nil())));
        drafts.extend(advance_bracket(tournament, &projected, &bye));
    }
    drafts
}

/// Outcome of resolving one preliminary group.
#[derive(Clone, Debug, PartialEq)]
enum GroupResolution {
    /// Players that advance to the playoff, best first.
    Advancing(Vec<PlayerId>),
    /// More matches are needed before the group is decided.
    Pending(Vec<MatchDraft>),
}

/// Build the playoff (or the next tie-break round) once every preliminary-stage
/// match is finished.
pub fn advance_preliminary<R: Rng + ?Sized>(
    tournament: &Tournament,
    matches: &[Match],
    rules: TransitionRules,
    rng: &mut R,
) -> Vec<MatchDraft> {
    if tournament.kind != TournamentType::PreliminaryPlayoff {
        return Vec::new();
    }
    if matches.iter().any(|m| m.kind == MatchType::Playoff) {
        return Vec::new();
    }
    let mut stage = matches.iter().filter(|m| m.kind.is_preliminary_stage()).peekable();
    if stage.peek().is_none() || !stage.all(Match::is_finished) {
        return Vec::new();
    }

    let next_round = highest_round(matches) + 1;
    let template = DraftTemplate::new(Some(tournament.id), MatchType::Preliminary, next_round)
        .with_match_time(tournament.match_time);
    let scores = compute_scores(matches, Some(MatchType::Preliminary));
    let k = tournament.advancing_per_group();

    let mut advancing = Vec::new();
    let mut pending = Vec::new();
    for (index, group) in tournament.groups.iter().enumerate() {
        match resolve_group(group, &scores, matches, k, &template, rules, rng) {
            GroupResolution::Advancing(players) => advancing.extend(players),
            GroupResolution::Pending(drafts) => {
                info!(
                    "Tournament {}: group {} is tied, {} tie-break match(es) at round {}",
                    tournament.id,
                    index + 1,
                    drafts.len(),
                    next_round
                );
                pending.extend(drafts);
            }
        }
    }
    if !pending.is_empty() {
        return pending;
    }

    info!(
        "Tournament {}: {} player(s) advance to the playoff at round {}",
        tournament.id,
        advancing.len(),
        next_round
    );
    sequential_pairs(&advancing, &template.with_kind(MatchType::Playoff))
}

fn resolve_group<R: Rng + ?Sized>(
    group: &[PlayerId],
    scores: &ScoreMap,
    matches: &[Match],
    k: usize,
    template: &DraftTemplate,
    rules: TransitionRules,
    rng: &mut R,
) -> GroupResolution {
    let ranking = rank_group(scores, group);
    let Some(tie) = cutoff_tie(&ranking, k) else {
        return GroupResolution::Advancing(ranking.iter().take(k).map(|e| e.player_id).collect());
    };
    let mut confirmed: Vec<PlayerId> = ranking[..tie.first_index]
        .iter()
        .map(|e| e.player_id)
        .collect();

    if tie.tied.len() == group.len() {
        if template.round <= rules.max_replay_round {
            return GroupResolution::Pending(full_round_robin(group, template));
        }
        // still deadlocked after the replays: draw lots
        let mut pool = tie.tied;
        pool.shuffle(rng);
        confirmed.extend(pool.into_iter().take(k));
        return GroupResolution::Advancing(confirmed);
    }

    let mut contenders = tie.tied.clone();
    let mut spots = tie.open_spots;
    for round_matches in tie_break_rounds(matches, &tie.tied).values() {
        let played: Vec<&&Match> = round_matches
            .iter()
            .filter(|m| m.player_ids().any(|p| contenders.contains(&p)))
            .collect();
        if played.is_empty() {
            continue;
        }
        let winners: Vec<PlayerId> = played.iter().filter_map(|m| m.winner).collect();
        let losers: Vec<PlayerId> = played.iter().flat_map(|m| m.losers()).collect();
        if winners.len() >= spots {
            if winners.len() == spots {
                confirmed.extend(winners);
                spots = 0;
                break;
            }
            contenders = winners;
        } else {
            spots -= winners.len();
            confirmed.extend(winners);
            contenders = losers;
        }
    }

    if spots == 0 || contenders.len() <= spots {
        confirmed.extend(contenders.into_iter().take(spots));
        return GroupResolution::Advancing(confirmed);
    }
    GroupResolution::Pending(sequential_pairs(
        &contenders,
        &template.with_kind(MatchType::PrePlayoff),
    ))
}

/// Pre-playoff matches among `tied` players, by round.
fn tie_break_rounds<'a>(matches: &'a [Match], tied: &[PlayerId]) -> BTreeMap<u32, Vec<&'a Match>> {
    let mut rounds: BTreeMap<u32, Vec<&Match>> = BTreeMap::new();
    for m in matches
        .iter()
        .filter(|m| m.kind == MatchType::PrePlayoff && m.player_ids().all(|p| tied.contains(&p)))
    {
        rounds.entry(m.tournament_round).or_default().push(m);
    }
    rounds
}
