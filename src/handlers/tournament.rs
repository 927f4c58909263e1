use actix_web::{web, HttpResponse, Responder};

use super::Result;
use crate::data::{self, Ruleset, Tournament, TournamentId};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TournamentForm {
    pub name: String,
}

pub async fn list(
    path: web::Path<Ruleset>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::tournament::list(&db, *path)?))
}

pub async fn create(
    path: web::Path<Ruleset>,
    form: web::Json<TournamentForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    let id = data::tournament::add(&db, *path, &form.name)?;
    Ok(HttpResponse::Created().json(Tournament {
        id,
        name: form.name.clone(),
    }))
}

pub async fn update(
    path: web::Path<(Ruleset, TournamentId)>,
    form: web::Json<TournamentForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let (ruleset, id) = path.into_inner();
    let db = state.db.lock().unwrap();
    data::tournament::modify(&db, ruleset, id, &form.name)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete(
    path: web::Path<(Ruleset, TournamentId)>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let (ruleset, id) = path.into_inner();
    let db = state.db.lock().unwrap();
    data::tournament::delete(&db, ruleset, id)?;
    Ok(HttpResponse::NoContent().finish())
}
