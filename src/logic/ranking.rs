//! Standings: per-player win/ippon scores, group rankings and cutoff tie detection.

use crate::models::{
    raw_scores, Match, MatchType, PlayerId, RankingEntry, Tournament, TournamentType,
};
use std::cmp::Ordering;
use std::collections::HashMap;

pub type ScoreMap = HashMap<PlayerId, RankingEntry>;

/// Win points and scored points of every player over matches of `filter` type
/// (all matches when `None`).
pub fn compute_scores<'a>(
    matches: impl IntoIterator<Item = &'a Match>,
    filter: Option<MatchType>,
) -> ScoreMap {
    let mut scores = ScoreMap::new();
    for m in matches {
        if filter.is_some_and(|kind| kind != m.kind) {
            continue;
        }
        let per_player = raw_scores(&m.players);
        for (player, scored) in m.players.iter().zip(per_player) {
            let entry = scores
                .entry(player.id)
                .or_insert_with(|| RankingEntry::new(player.id));
            entry.add_scored(scored);
            if m.winner == Some(player.id) {
                entry.add_win();
            } else if m.is_draw() {
                entry.add_draw();
            }
        }
    }
    scores
}

fn by_standing(a: &RankingEntry, b: &RankingEntry) -> Ordering {
    b.win_points
        .cmp(&a.win_points)
        .then_with(|| b.scored_points.total_cmp(&a.scored_points))
}

/// Ranking of one group, best first. Players without matches are left out.
pub fn rank_group(scores: &ScoreMap, group: &[PlayerId]) -> Vec<RankingEntry> {
    let mut ranking: Vec<RankingEntry> = group
        .iter()
        .filter_map(|p| scores.get(p).copied())
        .collect();
    ranking.sort_by(by_standing);
    ranking
}

pub fn rank_groups(scores: &ScoreMap, groups: &[Vec<PlayerId>]) -> Vec<Vec<RankingEntry>> {
    groups.iter().map(|g| rank_group(scores, g)).collect()
}

/// Players level on both criteria across an advancement cutoff.
#[derive(Clone, Debug, PartialEq)]
pub struct CutoffTie {
    /// Every player sharing the cutoff score, in ranking order.
    pub tied: Vec<PlayerId>,
    /// Ranking index of the first tied player; everyone above advances outright.
    pub first_index: usize,
    /// Advancement spots left for the tied players.
    pub open_spots: usize,
}

/// Detect a tie between the `k`-th and `(k+1)`-th ranked players.
pub fn cutoff_tie(ranking: &[RankingEntry], k: usize) -> Option<CutoffTie> {
    if k == 0 || ranking.len() <= k {
        return None;
    }
    let last_in = &ranking[k - 1];
    if !last_in.same_score(&ranking[k]) {
        return None;
    }
    let first_index = ranking.iter().position(|e| e.same_score(last_in))?;
    let tied = ranking
        .iter()
        .filter(|e| e.same_score(last_in))
        .map(|e| e.player_id)
        .collect();
    Some(CutoffTie {
        tied,
        first_index,
        open_spots: k - first_index,
    })
}

/// Match type whose results make up the table of a tournament format.
pub fn standings_kind(kind: TournamentType) -> MatchType {
    match kind {
        TournamentType::RoundRobin | TournamentType::TeamRoundRobin => MatchType::Group,
        TournamentType::Playoff => MatchType::Playoff,
        TournamentType::PreliminaryPlayoff => MatchType::Preliminary,
        TournamentType::Swiss => MatchType::Swiss,
    }
}

/// Current standings: one ranking per preliminary group, or a single table.
pub fn tournament_standings(tournament: &Tournament, matches: &[Match]) -> Vec<Vec<RankingEntry>> {
    let scores = compute_scores(matches, Some(standings_kind(tournament.kind)));
    if tournament.kind == TournamentType::PreliminaryPlayoff {
        rank_groups(&scores, &tournament.groups)
    } else {
        vec![rank_group(&scores, &tournament.players)]
    }
}
