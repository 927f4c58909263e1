use std::fmt;

use actix_web::{error, HttpResponse};

use crate::data::DataError;

pub mod game;
pub mod player;
pub mod stats;
pub mod tournament;

pub type Result<T> = std::result::Result<T, HandlerError>;

#[derive(Debug)]
pub enum HandlerError {
    NotFound(&'static str),
    BadRequest(String),
    Conflict(String),
    DatabaseError,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::NotFound(what) => write!(f, "{} not found", what),
            HandlerError::BadRequest(msg) => f.write_str(msg),
            HandlerError::Conflict(msg) => f.write_str(msg),
            HandlerError::DatabaseError => f.write_str("database error"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl error::ResponseError for HandlerError {
    fn error_response(&self) -> HttpResponse {
        let mut builder = match self {
            HandlerError::NotFound(_) => HttpResponse::NotFound(),
            HandlerError::BadRequest(_) => HttpResponse::BadRequest(),
            HandlerError::Conflict(_) => HttpResponse::Conflict(),
            HandlerError::DatabaseError => HttpResponse::InternalServerError(),
        };
        builder.content_type("text/plain").body(self.to_string())
    }
}

impl From<DataError> for HandlerError {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Sqlite(e) => {
                error!("database error: {}", e);
                HandlerError::DatabaseError
            }
            DataError::NotFound(what) => HandlerError::NotFound(what),
            DataError::NameTaken(_) | DataError::InUse(_) => HandlerError::Conflict(e.to_string()),
            DataError::EmptyName
            | DataError::UnknownRuleset(_)
            | DataError::UnsupportedScoreMode { .. }
            | DataError::InvalidPeriod(_)
            | DataError::InvalidGame(_) => HandlerError::BadRequest(e.to_string()),
        }
    }
}
