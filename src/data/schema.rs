use rusqlite::Connection;

use super::{Result, Ruleset};

/// Creates the full schema on a fresh database. Used by `db_init` and by
/// the in-memory test databases.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "
        CREATE TABLE IF NOT EXISTS player (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL UNIQUE,
            display_name    TEXT NOT NULL
        )",
        [],
    )?;

    for ruleset in [Ruleset::Rcr, Ruleset::Mcr] {
        create_ruleset_tables(conn, ruleset)?;
    }
    Ok(())
}

fn create_ruleset_tables(conn: &Connection, ruleset: Ruleset) -> Result<()> {
    let tournament = ruleset.tournament_table();
    let game = ruleset.game_table();
    let score = ruleset.score_table();

    // Tournament ids are gap-scanned by the data layer, not autoincremented.
    conn.execute(
        &format!(
            "
            CREATE TABLE IF NOT EXISTS {tournament} (
                id              INTEGER PRIMARY KEY,
                name            TEXT NOT NULL UNIQUE
            )"
        ),
        [],
    )?;

    // Game ids encode date and per-date sequence as YYMMDDSS.
    conn.execute(
        &format!(
            "
            CREATE TABLE IF NOT EXISTS {game} (
                id                  INTEGER PRIMARY KEY,
                {tournament}_id     INTEGER NOT NULL REFERENCES {tournament}(id),
                date                TEXT NOT NULL,
                nb_players          INTEGER NOT NULL,
                nb_rounds           INTEGER NOT NULL
            )"
        ),
        [],
    )?;

    let uma_column = if ruleset.has_uma() {
        "uma_score       INTEGER NOT NULL,"
    } else {
        ""
    };
    conn.execute(
        &format!(
            "
            CREATE TABLE IF NOT EXISTS {score} (
                {game}          INTEGER NOT NULL REFERENCES {game}(id) ON DELETE CASCADE,
                player_id       INTEGER NOT NULL REFERENCES player(id),
                ranking         INTEGER NOT NULL,
                game_score      INTEGER NOT NULL,
                {uma_column}
                final_score     INTEGER NOT NULL,

                PRIMARY KEY ({game}, player_id)
            )"
        ),
        [],
    )?;

    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS {game}_date ON {game} (date)"),
        [],
    )?;
    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS {score}_player ON {score} (player_id)"),
        [],
    )?;
    Ok(())
}

#[cfg(test)]
pub fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory db");
    create_schema(&conn).expect("create schema");
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = test_conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('player', 'rcr_tournament', 'rcr_game_id', 'rcr_game_score',
                  'mcr_tournament', 'mcr_game_id', 'mcr_game_score')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = test_conn();
        create_schema(&conn).expect("second run");
    }
}
