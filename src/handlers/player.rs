use actix_web::{web, HttpResponse, Responder};

use super::Result;
use crate::data::{self, Player, PlayerId, Ruleset};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlayerForm {
    pub name: String,
    pub display_name: String,
}

pub async fn list(state: web::Data<AppState>) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::player::list_all(&db)?))
}

pub async fn list_active(
    path: web::Path<Ruleset>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    Ok(web::Json(data::player::list_active(&db, *path)?))
}

pub async fn create(
    form: web::Json<PlayerForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    let id = data::player::add_player(&db, &form.name, &form.display_name)?;
    Ok(HttpResponse::Created().json(Player {
        id,
        name: form.name.clone(),
        display_name: form.display_name.clone(),
    }))
}

pub async fn update(
    path: web::Path<PlayerId>,
    form: web::Json<PlayerForm>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    data::player::modify_player(&db, *path, &form.name, &form.display_name)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete(
    path: web::Path<PlayerId>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let db = state.db.lock().unwrap();
    data::player::delete_player(&db, *path)?;
    Ok(HttpResponse::NoContent().finish())
}
