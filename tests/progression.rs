//! Integration tests for bracket advancement and the preliminary-to-playoff transition.

mod common;

use common::{between, engine, point, preliminary_request, tournament_request, tournament_with_players, win};
use kendo_tournament_web::notify::events;
use kendo_tournament_web::{Match, MatchType, PlayerId, PointType, Stage, TournamentType};

fn of_kind(matches: &[Match], kind: MatchType, round: u32) -> Vec<Match> {
    matches
        .iter()
        .filter(|m| m.kind == kind && m.tournament_round == round)
        .cloned()
        .collect()
}

fn same_players(m: &Match, expected: &[PlayerId]) -> bool {
    m.players.len() == expected.len() && expected.iter().all(|&p| m.has_player(p))
}

#[test]
fn bracket_pairs_winners_in_either_order_exactly_once() {
    let (engine, notifier) = engine();
    let (t, p) = tournament_with_players(&engine, tournament_request(TournamentType::Playoff, 8), 4);
    engine.generate_tournament_schedule(t.id).unwrap();
    let matches = engine.tournament_matches(t.id).unwrap();
    let first = between(&matches, p[0], p[1]);
    let second = between(&matches, p[2], p[3]);

    // the second match finishes first
    win(&engine, &second, p[3]);
    assert!(of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 2).is_empty());
    win(&engine, &first, p[0]);

    let next = of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 2);
    assert_eq!(next.len(), 1);
    assert!(same_players(&next[0], &[p[0], p[3]]));
    // triggering winner goes first
    assert_eq!(next[0].players[0].id, p[0]);

    assert!(engine.progress_match(first.id).unwrap().is_empty());
    assert!(engine.progress_match(second.id).unwrap().is_empty());
    assert_eq!(engine.tournament_matches(t.id).unwrap().len(), 3);
    assert!(notifier.count(events::TOURNAMENT_UPDATED) > 0);
}

#[test]
fn bye_winners_join_the_second_round() {
    let (engine, _) = engine();
    let (t, p) = tournament_with_players(&engine, tournament_request(TournamentType::Playoff, 8), 5);
    engine.generate_tournament_schedule(t.id).unwrap();
    let matches = engine.tournament_matches(t.id).unwrap();
    let played = between(&matches, p[3], p[4]);
    win(&engine, &played, p[4]);

    let second = of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 2);
    assert_eq!(second.len(), 2);
    assert!(second.iter().any(|m| same_players(m, &[p[4], p[0]])));
    assert!(second.iter().any(|m| same_players(m, &[p[1], p[2]])));

    let a = second.iter().find(|m| m.has_player(p[4])).unwrap();
    let b = second.iter().find(|m| m.has_player(p[1])).unwrap();
    win(&engine, a, p[4]);
    win(&engine, b, p[2]);
    let matches = engine.tournament_matches(t.id).unwrap();
    let last = of_kind(&matches, MatchType::Playoff, 3);
    assert_eq!(last.len(), 1);
    assert!(same_players(&last[0], &[p[4], p[2]]));

    win(&engine, &last[0], p[2]);
    let standings = engine.tournament_standings(t.id).unwrap();
    assert_eq!(standings.stage, Stage::Complete);
    // 4 first-round, 2 second-round and the final
    assert_eq!(engine.tournament_matches(t.id).unwrap().len(), 7);
}

/// Group `[a, b, c]`: `a` beats both, `b` beats `c`.
fn play_clear_group(engine: &kendo_tournament_web::Engine, matches: &[Match], group: &[PlayerId]) {
    let (a, b, c) = (group[0], group[1], group[2]);
    win(engine, &between(matches, a, b), a);
    win(engine, &between(matches, a, c), a);
    win(engine, &between(matches, b, c), b);
}

#[test]
fn group_winners_meet_in_the_playoff() {
    let (engine, _) = engine();
    let (t, _) = tournament_with_players(&engine, preliminary_request(3, 1), 6);
    let matches = engine.tournament_matches(t.id).unwrap();
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::Preliminary);

    play_clear_group(&engine, &matches, &t.groups[0]);
    assert!(of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 2).is_empty());
    play_clear_group(&engine, &matches, &t.groups[1]);

    let all = engine.tournament_matches(t.id).unwrap();
    let playoff = of_kind(&all, MatchType::Playoff, 2);
    assert_eq!(playoff.len(), 1);
    assert!(same_players(&playoff[0], &[t.groups[0][0], t.groups[1][0]]));
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::Playoff);

    let champion = t.groups[1][0];
    win(&engine, &playoff[0], champion);
    let standings = engine.tournament_standings(t.id).unwrap();
    assert_eq!(standings.stage, Stage::Complete);
    assert_eq!(standings.groups.len(), 2);
    assert_eq!(standings.groups[0][0].player_id, t.groups[0][0]);
    assert_eq!(standings.groups[0][0].win_points, 6);
    // the final creates nothing further
    assert_eq!(engine.tournament_matches(t.id).unwrap().len(), 7);
}

#[test]
fn late_finish_in_an_odd_round_still_reaches_the_final() {
    let (engine, _) = engine();
    let (t, _) = tournament_with_players(&engine, preliminary_request(3, 3), 6);
    let matches = engine.tournament_matches(t.id).unwrap();
    for group in &t.groups {
        play_clear_group(&engine, &matches, group);
    }
    let (g0, g1) = (&t.groups[0], &t.groups[1]);

    let round_two = of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 2);
    assert_eq!(round_two.len(), 3);
    let a = between(&round_two, g0[0], g0[1]);
    let b = between(&round_two, g0[2], g1[0]);
    let c = between(&round_two, g1[1], g1[2]);

    // the third court is slow: round three is played before it finishes
    win(&engine, &a, g0[0]);
    win(&engine, &b, g1[0]);
    let semi = of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 3);
    assert_eq!(semi.len(), 1);
    win(&engine, &semi[0], g1[0]);
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::Playoff);

    win(&engine, &c, g1[1]);
    let all = engine.tournament_matches(t.id).unwrap();
    let round_three = of_kind(&all, MatchType::Playoff, 3);
    assert_eq!(round_three.len(), 2);
    assert!(round_three
        .iter()
        .any(|m| m.is_bye() && m.winner == Some(g1[1])));
    let last = of_kind(&all, MatchType::Playoff, 4);
    assert_eq!(last.len(), 1);
    assert!(same_players(&last[0], &[g1[1], g1[0]]));
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::Playoff);

    win(&engine, &last[0], g1[0]);
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::Complete);
    // six group matches, then 3 + 2 + 1 playoff matches
    assert_eq!(engine.tournament_matches(t.id).unwrap().len(), 12);
}

#[test]
fn partial_tie_is_settled_by_a_pre_playoff_match() {
    let (engine, _) = engine();
    let (t, _) = tournament_with_players(&engine, preliminary_request(3, 1), 6);
    let matches = engine.tournament_matches(t.id).unwrap();
    play_clear_group(&engine, &matches, &t.groups[1]);

    // a and b both beat c and draw each other
    let (a, b, c) = (t.groups[0][0], t.groups[0][1], t.groups[0][2]);
    win(&engine, &between(&matches, a, c), a);
    win(&engine, &between(&matches, b, c), b);
    let draw = engine.check_for_tie(between(&matches, a, b).id).unwrap();
    assert!(draw.is_draw());

    let all = engine.tournament_matches(t.id).unwrap();
    assert!(of_kind(&all, MatchType::Playoff, 2).is_empty());
    let tie_break = of_kind(&all, MatchType::PrePlayoff, 2);
    assert_eq!(tie_break.len(), 1);
    assert!(same_players(&tie_break[0], &[a, b]));
    assert_eq!(engine.tournament_standings(t.id).unwrap().stage, Stage::TieBreak);

    // a level pre-playoff goes to overtime; the next point settles it
    let overtime = engine.check_for_tie(tie_break[0].id).unwrap();
    assert!(overtime.is_overtime);
    let decided = point(&engine, &tie_break[0], b, PointType::Kote);
    assert_eq!(decided.winner, Some(b));

    let all = engine.tournament_matches(t.id).unwrap();
    let playoff = of_kind(&all, MatchType::Playoff, 3);
    assert_eq!(playoff.len(), 1);
    assert!(same_players(&playoff[0], &[b, t.groups[1][0]]));
}

#[test]
fn fully_tied_group_is_replayed() {
    let (engine, _) = engine();
    let (t, _) = tournament_with_players(&engine, preliminary_request(3, 1), 3);
    assert_eq!(t.groups.len(), 1);
    let matches = engine.tournament_matches(t.id).unwrap();
    for m in &matches {
        engine.check_for_tie(m.id).unwrap();
    }

    let all = engine.tournament_matches(t.id).unwrap();
    let replay = of_kind(&all, MatchType::Preliminary, 2);
    assert_eq!(replay.len(), 3);
    assert!(of_kind(&all, MatchType::Playoff, 2).is_empty());
    assert!(replay
        .iter()
        .all(|m| m.players.iter().all(|p| t.groups[0].contains(&p.id))));
}

#[test]
fn odd_number_of_group_winners_gives_a_playoff_bye() {
    let (engine, _) = engine();
    let (t, _) = tournament_with_players(&engine, preliminary_request(3, 1), 9);
    assert_eq!(t.groups.len(), 3);
    let matches = engine.tournament_matches(t.id).unwrap();
    for group in &t.groups {
        play_clear_group(&engine, &matches, group);
    }

    let all = engine.tournament_matches(t.id).unwrap();
    let playoff = of_kind(&all, MatchType::Playoff, 2);
    assert_eq!(playoff.len(), 2);
    let bye = playoff.iter().find(|m| m.is_bye()).unwrap();
    assert_eq!(bye.winner, Some(t.groups[2][0]));
    let pair = playoff.iter().find(|m| !m.is_bye()).unwrap();
    assert!(same_players(pair, &[t.groups[0][0], t.groups[1][0]]));

    win(&engine, pair, t.groups[1][0]);
    let last = of_kind(&engine.tournament_matches(t.id).unwrap(), MatchType::Playoff, 3);
    assert_eq!(last.len(), 1);
    assert!(same_players(&last[0], &[t.groups[1][0], t.groups[2][0]]));
}
