//! Integration tests for scoring, timer and tie handling of single matches.

mod common;

use common::{engine, point, win};
use kendo_tournament_web::notify::events;
use kendo_tournament_web::{
    AddPointRequest, CreateMatchRequest, EngineError, EntityKind, MatchPlayer, MatchRole,
    MatchType, PlayerColor, PointType,
};
use uuid::Uuid;

fn standalone(kind: MatchType) -> CreateMatchRequest {
    CreateMatchRequest {
        tournament_id: None,
        kind,
        players: vec![
            MatchPlayer::new(Uuid::new_v4(), PlayerColor::White),
            MatchPlayer::new(Uuid::new_v4(), PlayerColor::Red),
        ],
        tournament_round: None,
    }
}

#[test]
fn men_against_hansoku_is_one_and_a_half_to_nothing() {
    let (engine, notifier) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    let white = m.players[0].id;
    let red = m.players[1].id;

    point(&engine, &m, white, PointType::Men);
    let m = point(&engine, &m, red, PointType::Hansoku);

    assert_eq!(m.raw_scores(), (1.5, 0.0));
    assert_eq!((m.player1_score, m.player2_score), (1, 0));
    assert!(m.winner.is_none());
    assert!(!m.is_finished());
    assert_eq!(notifier.channels(events::ADD_POINT), vec![m.id.to_string(); 2]);
}

#[test]
fn two_hansoku_decide_nothing_but_two_ippons_do() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    let red = m.players[1].id;
    let white = m.players[0].id;

    point(&engine, &m, white, PointType::Hansoku);
    let m2 = point(&engine, &m, white, PointType::Hansoku);
    assert_eq!(m2.raw_scores(), (0.0, 1.0));
    assert!(m2.winner.is_none());

    let finished = point(&engine, &m, red, PointType::Kote);
    assert_eq!(finished.winner, Some(red));
    assert!(finished.end_timestamp.is_some());
}

#[test]
fn level_group_match_ends_as_a_draw() {
    let (engine, notifier) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    point(&engine, &m, m.players[0].id, PointType::Men);
    point(&engine, &m, m.players[1].id, PointType::Do);

    let m = engine.check_for_tie(m.id).unwrap();
    assert!(m.is_draw());
    assert!(m.winner.is_none());
    assert!(!m.is_overtime);
    assert_eq!(notifier.count(events::CHECK_TIE), 1);

    let err = engine.start_timer(m.id).unwrap_err();
    assert!(matches!(err, EngineError::BadRequest(_)));
}

#[test]
fn level_playoff_match_goes_to_overtime_until_a_point() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Playoff)).unwrap();
    let red = m.players[1].id;

    let tied = engine.check_for_tie(m.id).unwrap();
    assert!(tied.is_overtime);
    assert!(!tied.is_finished());

    let finished = point(&engine, &m, red, PointType::Tsuki);
    assert_eq!(finished.winner, Some(red));
    assert_eq!((finished.player1_score, finished.player2_score), (0, 1));
}

#[test]
fn check_for_tie_with_different_scores_picks_the_leader() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Playoff)).unwrap();
    let white = m.players[0].id;
    point(&engine, &m, white, PointType::Men);

    let decided = engine.check_for_tie(m.id).unwrap();
    assert_eq!(decided.winner, Some(white));
    assert!(!decided.is_overtime);
}

#[test]
fn timer_accumulates_and_rejects_invalid_transitions() {
    let (engine, notifier) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();

    assert!(matches!(engine.stop_timer(m.id), Err(EngineError::BadRequest(_))));

    let running = engine.start_timer(m.id).unwrap();
    assert!(running.is_timer_on);
    assert!(running.start_timestamp.is_some());
    assert!(matches!(engine.start_timer(m.id), Err(EngineError::BadRequest(_))));

    let stopped = engine.stop_timer(m.id).unwrap();
    assert!(!stopped.is_timer_on);
    assert!(stopped.timer_started_timestamp.is_none());
    assert!(stopped.elapsed_time >= 0);

    let restarted = engine.start_timer(m.id).unwrap();
    assert_eq!(restarted.start_timestamp, running.start_timestamp);
    assert_eq!(notifier.count(events::START_TIMER), 2);
    assert_eq!(notifier.count(events::STOP_TIMER), 1);
}

#[test]
fn finished_match_rejects_every_edit() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    let white = m.players[0].id;
    win(&engine, &m, white);

    let extra = engine.add_point(
        m.id,
        AddPointRequest {
            point_type: PointType::Men,
            color: PlayerColor::Red,
        },
    );
    assert!(matches!(extra, Err(EngineError::BadRequest(_))));
    assert!(matches!(engine.reset_match(m.id), Err(EngineError::BadRequest(_))));
    assert!(matches!(engine.delete_recent_point(m.id), Err(EngineError::BadRequest(_))));
    assert!(matches!(engine.check_for_tie(m.id), Err(EngineError::BadRequest(_))));
    assert_eq!(engine.get_match(m.id).unwrap().winner, Some(white));
}

#[test]
fn officials_can_be_changed_until_the_match_ends() {
    let (engine, notifier) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    let (keeper, maker) = (Uuid::new_v4(), Uuid::new_v4());

    engine.add_official(m.id, MatchRole::TimeKeeper, keeper).unwrap();
    let staffed = engine.add_official(m.id, MatchRole::PointMaker, maker).unwrap();
    assert_eq!(staffed.time_keeper, Some(keeper));
    assert_eq!(staffed.point_maker, Some(maker));
    assert_eq!(notifier.channels(events::ADD_TIME_KEEPER), vec![m.id.to_string()]);
    assert_eq!(notifier.count(events::ADD_POINT_MAKER), 1);

    let without_keeper = engine.remove_official(m.id, MatchRole::TimeKeeper).unwrap();
    assert_eq!(without_keeper.time_keeper, None);
    assert_eq!(without_keeper.point_maker, Some(maker));
    assert_eq!(notifier.count(events::REMOVE_TIME_KEEPER), 1);

    let cleared = engine.reset_roles(m.id).unwrap();
    assert_eq!((cleared.time_keeper, cleared.point_maker), (None, None));
    assert_eq!(notifier.count(events::RESET_ROLES), 1);

    engine.add_official(m.id, MatchRole::PointMaker, maker).unwrap();
    win(&engine, &m, m.players[0].id);
    let late = engine.add_official(m.id, MatchRole::TimeKeeper, keeper);
    assert!(matches!(late, Err(EngineError::BadRequest(_))));
    assert!(matches!(engine.reset_roles(m.id), Err(EngineError::BadRequest(_))));
    assert!(matches!(
        engine.remove_official(m.id, MatchRole::PointMaker),
        Err(EngineError::BadRequest(_))
    ));
    assert_eq!(engine.get_match(m.id).unwrap().point_maker, Some(maker));
    assert!(matches!(
        engine.reset_roles(Uuid::new_v4()),
        Err(EngineError::NotFound(EntityKind::Match, _))
    ));
}

#[test]
fn recent_point_can_be_removed_or_changed() {
    let (engine, notifier) = engine();
    let m = engine.create_match(standalone(MatchType::Group)).unwrap();
    let white = m.players[0].id;

    assert!(matches!(engine.delete_recent_point(m.id), Err(EngineError::BadRequest(_))));

    point(&engine, &m, white, PointType::Men);
    point(&engine, &m, white, PointType::Hansoku);
    let removed = engine.delete_recent_point(m.id).unwrap();
    assert_eq!(removed.players[0].points.len(), 1);
    assert_eq!(removed.raw_scores(), (1.0, 0.0));

    point(&engine, &m, white, PointType::Hansoku);
    let changed = engine.modify_recent_point(m.id, PointType::Kote).unwrap();
    assert_eq!(changed.winner, Some(white));
    assert_eq!(notifier.count(events::DELETE_RECENT), 1);
    assert_eq!(notifier.count(events::MODIFY_RECENT), 1);
}

#[test]
fn reset_clears_points_time_and_overtime() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Playoff)).unwrap();
    engine.start_timer(m.id).unwrap();
    engine.check_for_tie(m.id).unwrap();
    point(&engine, &m, m.players[0].id, PointType::Hansoku);

    let reset = engine.reset_match(m.id).unwrap();
    assert!(reset.players.iter().all(|p| p.points.is_empty()));
    assert!(!reset.is_overtime);
    assert!(!reset.is_timer_on);
    assert_eq!(reset.elapsed_time, 0);
    assert!(reset.start_timestamp.is_none());
}

#[test]
fn match_creation_is_validated() {
    let (engine, _) = engine();
    let player = Uuid::new_v4();

    let mut same_player = standalone(MatchType::Group);
    same_player.players[1].id = player;
    same_player.players[0].id = player;
    assert!(matches!(engine.create_match(same_player), Err(EngineError::BadRequest(_))));

    let mut same_color = standalone(MatchType::Group);
    same_color.players[1].color = PlayerColor::White;
    assert!(matches!(engine.create_match(same_color), Err(EngineError::BadRequest(_))));

    let mut single = standalone(MatchType::Group);
    single.players.pop();
    assert!(matches!(engine.create_match(single), Err(EngineError::BadRequest(_))));

    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.get_match(missing),
        Err(EngineError::NotFound(EntityKind::Match, id)) if id == missing
    ));
}

#[test]
fn standalone_matches_do_not_progress() {
    let (engine, _) = engine();
    let m = engine.create_match(standalone(MatchType::Playoff)).unwrap();
    assert!(matches!(engine.progress_match(m.id), Err(EngineError::BadRequest(_))));

    let winner = m.players[0].id;
    win(&engine, &m, winner);
    assert!(engine.progress_match(m.id).unwrap().is_empty());

    engine.delete_match(m.id).unwrap();
    assert!(matches!(engine.delete_match(m.id), Err(EngineError::NotFound(..))));
}
