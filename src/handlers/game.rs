use actix_web::{web, HttpResponse, Responder};
use chrono::NaiveDate;

use super::{HandlerError, Result};
use crate::data::{self, GameId, NewGame, Ruleset, TournamentId};
use crate::AppState;

pub async fn create(
    path: web::Path<Ruleset>,
    form: web::Json<NewGame>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let mut db = state.db.lock().unwrap();
    let id = data::game::add_game(&mut db, *path, &form)?;
    let game = data::game::get_game(&db, *path, id)?
        .ok_or(HandlerError::NotFound("game"))?;
    Ok(HttpResponse::Created().json(game))
}

pub async fn get(
    path: web::Path<(Ruleset, GameId)>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let (ruleset, id) = path.into_inner();
    let db = state.db.lock().unwrap();
    match data::game::get_game(&db, ruleset, id)? {
        Some(game) => Ok(web::Json(game)),
        None => Err(HandlerError::NotFound("game")),
    }
}

pub async fn delete(
    path: web::Path<(Ruleset, GameId)>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let (ruleset, id) = path.into_inner();
    let db = state.db.lock().unwrap();
    data::game::delete_game(&db, ruleset, id)?;
    Ok(HttpResponse::NoContent().finish())
}

#[derive(Debug, Deserialize)]
pub struct TournamentQuery {
    pub tournament: TournamentId,
}

pub async fn years(
    path: web::Path<Ruleset>,
    query: web::Query<TournamentQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::game::years(&db, *path, query.tournament)?))
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub tournament: TournamentId,
    pub year: i32,
    pub month: u32,
}

pub async fn days(
    path: web::Path<Ruleset>,
    query: web::Query<DaysQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::game::days(
        &db,
        *path,
        query.tournament,
        query.year,
        query.month,
    )?))
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    pub tournament: TournamentId,
    pub date: NaiveDate,
}

pub async fn ids(
    path: web::Path<Ruleset>,
    query: web::Query<IdsQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::game::game_ids(
        &db,
        *path,
        query.tournament,
        query.date,
    )?))
}
