use actix_web::{web, Responder};

use super::{HandlerError, Result};
use crate::data::stats::{self, RankingMode, ScoreMode, SortOrder};
use crate::data::{Period, PlayerId, Ruleset, TournamentId};
use crate::AppState;

/// Period selection shared by the stats endpoints. `period=year` needs
/// `year=`, `trimester` and `month` additionally need their own parameter.
/// serde_urlencoded cannot flatten, so every query struct repeats these
/// fields and resolves them here.
fn resolve_period(
    period: Option<&str>,
    year: Option<i32>,
    trimester: Option<u32>,
    month: Option<u32>,
) -> Result<Period> {
    let missing = |what: &str| HandlerError::BadRequest(format!("missing {} parameter", what));
    match period.unwrap_or("all") {
        "all" => Ok(Period::All),
        "year" => Ok(Period::year(year.ok_or_else(|| missing("year"))?)?),
        "trimester" => Ok(Period::trimester(
            year.ok_or_else(|| missing("year"))?,
            trimester.ok_or_else(|| missing("trimester"))?,
        )?),
        "month" => Ok(Period::month(
            year.ok_or_else(|| missing("year"))?,
            month.ok_or_else(|| missing("month"))?,
        )?),
        other => Err(HandlerError::BadRequest(format!(
            "unknown period: {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeQuery {
    pub tournament: TournamentId,
    pub player: PlayerId,
    pub score_mode: Option<ScoreMode>,
    pub period: Option<String>,
    pub year: Option<i32>,
    pub trimester: Option<u32>,
    pub month: Option<u32>,
}

pub async fn analyze(
    path: web::Path<Ruleset>,
    query: web::Query<AnalyzeQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let period = resolve_period(
        query.period.as_deref(),
        query.year,
        query.trimester,
        query.month,
    )?;
    let db = state.db.lock().unwrap();
    Ok(web::Json(stats::analyze(
        &db,
        *path,
        query.tournament,
        query.player,
        query.score_mode.unwrap_or(ScoreMode::Final),
        period,
    )?))
}

#[derive(Debug, Deserialize)]
pub struct RankingQuery {
    pub tournament: TournamentId,
    pub mode: RankingMode,
    pub order: Option<SortOrder>,
    pub min_games: Option<bool>,
    pub period: Option<String>,
    pub year: Option<i32>,
    pub trimester: Option<u32>,
    pub month: Option<u32>,
}

pub async fn ranking(
    path: web::Path<Ruleset>,
    query: web::Query<RankingQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let period = resolve_period(
        query.period.as_deref(),
        query.year,
        query.trimester,
        query.month,
    )?;
    let db = state.db.lock().unwrap();
    Ok(web::Json(stats::ranking(
        &db,
        *path,
        query.tournament,
        query.mode,
        query.order.unwrap_or(SortOrder::Descending),
        period,
        query.min_games.unwrap_or(false),
    )?))
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub tournament: TournamentId,
    pub period: Option<String>,
    pub year: Option<i32>,
    pub trimester: Option<u32>,
    pub month: Option<u32>,
}

pub async fn trend(
    path: web::Path<Ruleset>,
    query: web::Query<TrendQuery>,
    state: web::Data<AppState>,
) -> Result<impl Responder> {
    let period = resolve_period(
        query.period.as_deref(),
        query.year,
        query.trimester,
        query.month,
    )?;
    let db = state.db.lock().unwrap();
    Ok(web::Json(stats::trend(&db, *path, query.tournament, period)?))
}
