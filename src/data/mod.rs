use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::Connection;

pub mod game;
pub mod game_id;
pub mod period;
pub mod player;
pub mod schema;
pub mod stats;
pub mod tournament;

pub use game::{Game, GameScore, NewGame, NewScore};
pub use game_id::GameId;
pub use period::Period;
pub use player::{Player, PlayerId};
pub use tournament::{Tournament, TournamentId};

pub type DbConn = Mutex<Connection>;

pub type Result<T> = std::result::Result<T, DataError>;

pub fn make_conn(path: &Path) -> DbConn {
    let conn = Connection::open(path).expect("sqlite db");
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .expect("enable foreign keys");
    Mutex::new(conn)
}

/// The two rulesets the club records. Each has its own tournament and game
/// tables; players are shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ruleset {
    Rcr,
    Mcr,
}

impl Ruleset {
    pub fn prefix(self) -> &'static str {
        match self {
            Ruleset::Rcr => "rcr",
            Ruleset::Mcr => "mcr",
        }
    }

    pub fn tournament_table(self) -> String {
        format!("{}_tournament", self.prefix())
    }

    pub fn game_table(self) -> String {
        format!("{}_game_id", self.prefix())
    }

    pub fn score_table(self) -> String {
        format!("{}_game_score", self.prefix())
    }

    /// RCR records a placement bonus per score row; MCR has none.
    pub fn has_uma(self) -> bool {
        matches!(self, Ruleset::Rcr)
    }
}

impl fmt::Display for Ruleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Ruleset {
    type Err = DataError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rcr" => Ok(Ruleset::Rcr),
            "mcr" => Ok(Ruleset::Mcr),
            _ => Err(DataError::UnknownRuleset(s.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum DataError {
    Sqlite(rusqlite::Error),
    /// Unique constraint hit while inserting or renaming.
    NameTaken(String),
    /// Delete refused because other rows still reference the entity.
    InUse(&'static str),
    NotFound(&'static str),
    EmptyName,
    UnknownRuleset(String),
    /// Net score only exists for RCR.
    UnsupportedScoreMode { ruleset: Ruleset, mode: stats::ScoreMode },
    InvalidPeriod(String),
    InvalidGame(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Sqlite(e) => write!(f, "database error: {}", e),
            DataError::NameTaken(name) => write!(f, "name already in use: {}", name),
            DataError::InUse(what) => write!(f, "{} still has recorded scores", what),
            DataError::NotFound(what) => write!(f, "{} not found", what),
            DataError::EmptyName => write!(f, "name cannot be empty"),
            DataError::UnknownRuleset(s) => write!(f, "unknown ruleset: {}", s),
            DataError::UnsupportedScoreMode { ruleset, mode } => {
                write!(f, "score mode {:?} is not defined for {}", mode, ruleset)
            }
            DataError::InvalidPeriod(msg) => write!(f, "invalid period: {}", msg),
            DataError::InvalidGame(msg) => write!(f, "invalid game: {}", msg),
        }
    }
}

impl std::error::Error for DataError {}

impl From<rusqlite::Error> for DataError {
    fn from(e: rusqlite::Error) -> Self {
        DataError::Sqlite(e)
    }
}

impl DataError {
    /// Maps a unique-constraint failure to `NameTaken`, anything else to
    /// `Sqlite`. Used by inserts whose only expected failure is a dup name.
    pub(crate) fn on_insert(e: rusqlite::Error, name: &str) -> Self {
        if is_constraint_violation(&e) {
            DataError::NameTaken(name.to_string())
        } else {
            DataError::Sqlite(e)
        }
    }
}

pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
