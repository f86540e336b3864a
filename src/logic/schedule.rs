//! Schedule generation per tournament format. Pure: returns drafts, stores nothing.

use crate::models::{DraftTemplate, MatchDraft, MatchType, PlayerId, Tournament, TournamentType};

/// Incremental round robin: one match between `new_player` and every existing player.
pub fn round_robin(
    existing: &[PlayerId],
    new_player: PlayerId,
    template: &DraftTemplate,
) -> Vec<MatchDraft> {
    existing
        .iter()
        .filter(|&&p| p != new_player)
        .map(|&p| template.pair(new_player, p))
        .collect()
}

/// Full round robin, built by registering the players one at a time.
pub fn full_round_robin(players: &[PlayerId], template: &DraftTemplate) -> Vec<MatchDraft> {
    let mut added: Vec<PlayerId> = Vec::with_capacity(players.len());
    let mut matches = Vec::new();
    for &player in players {
        matches.extend(round_robin(&added, player, template));
        added.push(player);
    }
    matches
}

/// Smallest power of two that is `>= n` (1 for 0).
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Round one of a single-elimination bracket.
///
/// The first `bracket_size - n` registrants get byes; the rest are paired in order.
pub fn playoff_bracket(players: &[PlayerId], template: &DraftTemplate) -> Vec<MatchDraft> {
    if players.len() < 2 {
        return Vec::new();
    }
    let byes_needed = next_power_of_two(players.len()) - players.len();
    let (bye_players, paired) = players.split_at(byes_needed);

    let mut matches: Vec<MatchDraft> = paired
        .chunks_exact(2)
        .map(|pair| template.pair(pair[0], pair[1]))
        .collect();
    matches.extend(bye_players.iter().map(|&p| template.bye(p)));
    matches
}

/// Consecutive pairs; an odd last player gets a bye.
pub fn sequential_pairs(players: &[PlayerId], template: &DraftTemplate) -> Vec<MatchDraft> {
    players
        .chunks(2)
        .map(|chunk| match chunk {
            [a, b] => template.pair(*a, *b),
            _ => template.bye(chunk[0]),
        })
        .collect()
}

/// Naive Swiss round: consecutive pairing, no score-based re-pairing.
pub fn swiss(players: &[PlayerId], template: &DraftTemplate) -> Vec<MatchDraft> {
    if players.len() < 2 {
        return Vec::new();
    }
    sequential_pairs(players, template)
}

/// Partition players by `index mod group_count`, with
/// `group_count = ceil(n / preferred_size)`.
pub fn divide_into_groups(players: &[PlayerId], preferred_size: usize) -> Vec<Vec<PlayerId>> {
    if players.is_empty() {
        return Vec::new();
    }
    let group_count = players.len().div_ceil(preferred_size.max(1));
    let mut groups = vec![Vec::new(); group_count];
    for (i, &player) in players.iter().enumerate() {
        groups[i % group_count].push(player);
    }
    groups
}

/// Round robin inside every preliminary group.
pub fn preliminary_groups(groups: &[Vec<PlayerId>], template: &DraftTemplate) -> Vec<MatchDraft> {
    groups
        .iter()
        .flat_map(|group| full_round_robin(group, template))
        .collect()
}

fn tournament_template(tournament: &Tournament, kind: MatchType) -> DraftTemplate {
    DraftTemplate::new(Some(tournament.id), kind, 1).with_match_time(tournament.match_time)
}

/// Matches created when `new_player` registers into `tournament`.
///
/// `tournament.players` must already contain the new player and, for preliminary
/// tournaments, `tournament.groups` must already be recomputed. Formats that rebuild
/// their schedule return the full schedule; Playoff brackets and team tournaments
/// are never built on registration.
pub fn on_registration(tournament: &Tournament, new_player: PlayerId) -> Vec<MatchDraft> {
    match tournament.kind {
        TournamentType::RoundRobin => round_robin(
            &tournament.players,
            new_player,
            &tournament_template(tournament, MatchType::Group),
        ),
        TournamentType::PreliminaryPlayoff | TournamentType::Swiss => full_schedule(tournament),
        TournamentType::Playoff | TournamentType::TeamRoundRobin => Vec::new(),
    }
}

/// The complete initial schedule of a tournament.
pub fn full_schedule(tournament: &Tournament) -> Vec<MatchDraft> {
    match tournament.kind {
        TournamentType::RoundRobin => full_round_robin(
            &tournament.players,
            &tournament_template(tournament, MatchType::Group),
        ),
        TournamentType::Playoff => playoff_bracket(
            &tournament.players,
            &tournament_template(tournament, MatchType::Playoff),
        ),
        TournamentType::PreliminaryPlayoff => preliminary_groups(
            &tournament.groups,
            &tournament_template(tournament, MatchType::Preliminary),
        ),
        TournamentType::Swiss => swiss(
            &tournament.players,
            &tournament_template(tournament, MatchType::Swiss),
        ),
        // team pairings are arranged by the organizer
        TournamentType::TeamRoundRobin => Vec::new(),
    }
}
