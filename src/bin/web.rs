//! JSON API over the tournament engine, backed by the in-memory store.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT.
//! Engine knobs: KENDO_ENGINE_CONFIG (JSON), KENDO_MAX_COMMIT_ATTEMPTS, KENDO_MAX_REPLAY_ROUND.

use actix_web::{
    delete, error::BlockingError, get, post, put,
    web::{self, Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use kendo_tournament_web::{
    AddPointRequest, CreateMatchRequest, CreateTournamentRequest, Engine, EngineConfig,
    EngineError, EngineResult, LogNotifier, MatchId, MatchRole, MemoryStore, PlayerId, PointType,
    TeamId, TournamentId, UpdateTournamentRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type AppState = Data<Engine>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPlayerBody {
    player_id: PlayerId,
}

#[derive(Deserialize)]
struct ModifyPointBody {
    #[serde(rename = "type")]
    point_type: PointType,
}

#[derive(Deserialize)]
struct AddTeamBody {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfficialBody {
    official_id: PlayerId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and player id (e.g. /api/tournaments/{id}/players/{player_id})
#[derive(Deserialize)]
struct TournamentPlayerPath {
    id: TournamentId,
    player_id: PlayerId,
}

/// Path segments: tournament id and team id (e.g. /api/tournaments/{id}/teams/{team_id})
#[derive(Deserialize)]
struct TeamPath {
    id: TournamentId,
    team_id: TeamId,
}

/// Path segments: tournament, team and member (e.g. .../teams/{team_id}/players/{player_id})
#[derive(Deserialize)]
struct TeamMemberPath {
    id: TournamentId,
    team_id: TeamId,
    player_id: PlayerId,
}

/// Path segments: match id and official role (e.g. /api/matches/{id}/officials/time-keeper)
#[derive(Deserialize)]
struct OfficialPath {
    id: MatchId,
    role: MatchRole,
}

/// Path segment: match id (e.g. /api/matches/{id})
#[derive(Deserialize)]
struct MatchPath {
    id: MatchId,
}

fn error_response(e: &EngineError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        EngineError::NotFound(..) => HttpResponse::NotFound().json(body),
        EngineError::BadRequest(_) => HttpResponse::BadRequest().json(body),
        // the client may repeat the call
        e if e.is_transient() => HttpResponse::Conflict().json(body),
        _ => {
            log::error!("Store failure: {e}");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Like [`run`] for operations without a body to return.
async fn run_no_content<F>(state: &AppState, op: F) -> HttpResponse
where
    F: FnOnce(&Engine) -> EngineResult<()> + Send + 'static,
{
    let engine = state.clone();
    match web::block(move || op(engine.get_ref())).await {
        Ok(Ok(())) => HttpResponse::NoContent().finish(),
        other => respond(other),
    }
}

fn respond<T: Serialize>(result: Result<EngineResult<T>, BlockingError>) -> HttpResponse {
    match result {
        Ok(Ok(value)) => HttpResponse::Ok().json(value),
        Ok(Err(e)) => error_response(&e),
        Err(e) => HttpResponse::InternalServerError().json(serde_json::json!({ "error": e.to_string() })),
    }
}

/// Run an engine operation on the blocking pool and map its result to a response.
async fn run<T, F>(state: &AppState, op: F) -> HttpResponse
where
    T: Serialize + Send + 'static,
    F: FnOnce(&Engine) -> EngineResult<T> + Send + 'static,
{
    let engine = state.clone();
    respond(web::block(move || op(engine.get_ref())).await)
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "kendo-tournament-web",
    })
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentRequest>) -> HttpResponse {
    let req = body.into_inner();
    run(&state, move |e| e.create_tournament(req)).await
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.get_tournament(id)).await
}

/// Edit settings (before the start date only).
#[put("/api/tournaments/{id}")]
async fn api_update_tournament(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<UpdateTournamentRequest>,
) -> HttpResponse {
    let (id, req) = (path.id, body.into_inner());
    run(&state, move |e| e.update_tournament(id, req)).await
}

#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    run_no_content(&state, move |e| e.delete_tournament(id)).await
}

#[get("/api/tournaments/{id}/matches")]
async fn api_tournament_matches(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.tournament_matches(id)).await
}

/// Register a player (before the start date only).
#[post("/api/tournaments/{id}/players")]
async fn api_add_player(state: AppState, path: Path<TournamentPath>, body: Json<AddPlayerBody>) -> HttpResponse {
    let (id, player) = (path.id, body.player_id);
    run(&state, move |e| e.add_player_to_tournament(id, player)).await
}

#[delete("/api/tournaments/{id}/players/{player_id}")]
async fn api_remove_player(state: AppState, path: Path<TournamentPlayerPath>) -> HttpResponse {
    let (id, player) = (path.id, path.player_id);
    run(&state, move |e| e.remove_player_from_tournament(id, player)).await
}

/// Build the full schedule if none exists yet.
#[post("/api/tournaments/{id}/schedule")]
async fn api_generate_schedule(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.generate_tournament_schedule(id)).await
}

/// Withdraw a player: every unfinished match of theirs is lost.
#[post("/api/tournaments/{id}/players/{player_id}/withdraw")]
async fn api_withdraw_player(state: AppState, path: Path<TournamentPlayerPath>) -> HttpResponse {
    let (id, player) = (path.id, path.player_id);
    run(&state, move |e| e.mark_user_matches_lost(id, player)).await
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.tournament_standings(id)).await
}

#[post("/api/tournaments/{id}/teams")]
async fn api_add_team(state: AppState, path: Path<TournamentPath>, body: Json<AddTeamBody>) -> HttpResponse {
    let (id, name) = (path.id, body.into_inner().name);
    run(&state, move |e| e.add_team_to_tournament(id, &name)).await
}

#[delete("/api/tournaments/{id}/teams/{team_id}")]
async fn api_remove_team(state: AppState, path: Path<TeamPath>) -> HttpResponse {
    let (id, team) = (path.id, path.team_id);
    run(&state, move |e| e.remove_team_from_tournament(id, team)).await
}

#[post("/api/tournaments/{id}/teams/{team_id}/players")]
async fn api_join_team(state: AppState, path: Path<TeamPath>, body: Json<AddPlayerBody>) -> HttpResponse {
    let (id, team, player) = (path.id, path.team_id, body.player_id);
    run(&state, move |e| e.join_team(id, team, player)).await
}

#[post("/api/tournaments/{id}/teams/{team_id}/players/{player_id}/leave")]
async fn api_leave_team(state: AppState, path: Path<TeamMemberPath>) -> HttpResponse {
    let (id, team, player) = (path.id, path.team_id, path.player_id);
    run(&state, move |e| e.leave_team(id, team, player)).await
}

#[delete("/api/tournaments/{id}/teams/{team_id}/players/{player_id}")]
async fn api_kick_from_team(state: AppState, path: Path<TeamMemberPath>) -> HttpResponse {
    let (id, team, player) = (path.id, path.team_id, path.player_id);
    run(&state, move |e| e.kick_player_from_team(id, team, player)).await
}

#[post("/api/matches")]
async fn api_create_match(state: AppState, body: Json<CreateMatchRequest>) -> HttpResponse {
    let req = body.into_inner();
    run(&state, move |e| e.create_match(req)).await
}

#[get("/api/matches/{id}")]
async fn api_get_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.get_match(id)).await
}

#[delete("/api/matches/{id}")]
async fn api_delete_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run_no_content(&state, move |e| e.delete_match(id)).await
}

#[put("/api/matches/{id}/officials/{role}")]
async fn api_add_official(state: AppState, path: Path<OfficialPath>, body: Json<OfficialBody>) -> HttpResponse {
    let (id, role, official) = (path.id, path.role, body.official_id);
    run(&state, move |e| e.add_official(id, role, official)).await
}

#[delete("/api/matches/{id}/officials/{role}")]
async fn api_remove_official(state: AppState, path: Path<OfficialPath>) -> HttpResponse {
    let (id, role) = (path.id, path.role);
    run(&state, move |e| e.remove_official(id, role)).await
}

#[post("/api/matches/{id}/reset-roles")]
async fn api_reset_roles(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.reset_roles(id)).await
}

#[post("/api/matches/{id}/points")]
async fn api_add_point(state: AppState, path: Path<MatchPath>, body: Json<AddPointRequest>) -> HttpResponse {
    let (id, point) = (path.id, body.into_inner());
    run(&state, move |e| e.add_point(id, point)).await
}

#[post("/api/matches/{id}/start-timer")]
async fn api_start_timer(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.start_timer(id)).await
}

#[post("/api/matches/{id}/stop-timer")]
async fn api_stop_timer(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.stop_timer(id)).await
}

/// Called by the scoreboard when match time runs out.
#[post("/api/matches/{id}/check-tie")]
async fn api_check_tie(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.check_for_tie(id)).await
}

#[delete("/api/matches/{id}/points/recent")]
async fn api_delete_recent_point(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.delete_recent_point(id)).await
}

#[put("/api/matches/{id}/points/recent")]
async fn api_modify_recent_point(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<ModifyPointBody>,
) -> HttpResponse {
    let (id, point_type) = (path.id, body.point_type);
    run(&state, move |e| e.modify_recent_point(id, point_type)).await
}

#[post("/api/matches/{id}/reset")]
async fn api_reset_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.reset_match(id)).await
}

/// Retry progression for a finished match (after a 409 on the scoring call).
#[post("/api/matches/{id}/progress")]
async fn api_progress_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    let id = path.id;
    run(&state, move |e| e.progress_match(id)).await
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);

    let config = EngineConfig::from_env();
    log::info!(
        "Starting server at http://{}:{} (commit attempts: {}, replay rounds: {})",
        bind.0,
        bind.1,
        config.max_commit_attempts,
        config.max_replay_round
    );
    let engine = Engine::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier)).with_config(config);
    let state = Data::new(engine);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_update_tournament)
            .service(api_delete_tournament)
            .service(api_tournament_matches)
            .service(api_add_player)
            .service(api_remove_player)
            .service(api_generate_schedule)
            .service(api_withdraw_player)
            .service(api_standings)
            .service(api_add_team)
            .service(api_remove_team)
            .service(api_join_team)
            .service(api_leave_team)
            .service(api_kick_from_team)
            .service(api_create_match)
            .service(api_get_match)
            .service(api_delete_match)
            .service(api_add_official)
            .service(api_remove_official)
            .service(api_reset_roles)
            .service(api_add_point)
            .service(api_start_timer)
            .service(api_stop_timer)
            .service(api_check_tie)
            .service(api_delete_recent_point)
            .service(api_modify_recent_point)
            .service(api_reset_match)
            .service(api_progress_match)
    })
    .bind(bind)?
    .run()
    .await
}
