use chrono::NaiveDate;
use rusqlite::{params, Connection};

use super::game_id::GameId;
use super::player::PlayerId;
use super::tournament::TournamentId;
use super::{is_constraint_violation, DataError, Result, Ruleset};

/// Score sheet entry for one participant of a game to be recorded.
#[derive(Debug, Clone, Deserialize)]
pub struct NewScore {
    pub player_id: PlayerId,
    pub place: u32,
    pub game_score: i64,
    /// Placement bonus; required for RCR, absent for MCR.
    #[serde(default)]
    pub uma_score: Option<i64>,
    pub final_score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGame {
    pub tournament_id: TournamentId,
    pub date: NaiveDate,
    pub nb_rounds: u32,
    pub scores: Vec<NewScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameScore {
    pub player_id: PlayerId,
    pub name: String,
    pub display_name: String,
    pub place: u32,
    pub game_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uma_score: Option<i64>,
    pub final_score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Game {
    pub id: GameId,
    pub tournament_id: TournamentId,
    pub date: NaiveDate,
    pub nb_players: u32,
    pub nb_rounds: u32,
    pub scores: Vec<GameScore>,
}

/// Records a game and its score rows in one transaction, returning the
/// allocated id.
pub fn add_game(db: &mut Connection, ruleset: Ruleset, game: &NewGame) -> Result<GameId> {
    validate(ruleset, game)?;

    let txn = db.transaction()?;
    let id = next_game_id(&txn, ruleset, game.date)?;

    txn.execute(
        &format!(
            "INSERT INTO {game} (id, {tournament}_id, date, nb_players, nb_rounds)
             VALUES (?, ?, ?, ?, ?)",
            game = ruleset.game_table(),
            tournament = ruleset.tournament_table(),
        ),
        params![
            id,
            game.tournament_id,
            game.date,
            game.scores.len() as u32,
            game.nb_rounds
        ],
    )
    // the only constraint on the game row is the tournament FK
    .map_err(|e| {
        if is_constraint_violation(&e) {
            DataError::NotFound("tournament")
        } else {
            DataError::Sqlite(e)
        }
    })?;

    for score in &game.scores {
        let inserted = if ruleset.has_uma() {
            txn.execute(
                &format!(
                    "INSERT INTO {score} ({game}, player_id, ranking, game_score, uma_score, final_score)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    score = ruleset.score_table(),
                    game = ruleset.game_table(),
                ),
                params![
                    id,
                    score.player_id,
                    score.place,
                    score.game_score,
                    score.uma_score,
                    score.final_score
                ],
            )
        } else {
            txn.execute(
                &format!(
                    "INSERT INTO {score} ({game}, player_id, ranking, game_score, final_score)
                     VALUES (?, ?, ?, ?, ?)",
                    score = ruleset.score_table(),
                    game = ruleset.game_table(),
                ),
                params![id, score.player_id, score.place, score.game_score, score.final_score],
            )
        };
        // duplicate players are rejected by validate, so a constraint here
        // is the player FK
        inserted.map_err(|e| {
            if is_constraint_violation(&e) {
                DataError::NotFound("player")
            } else {
                DataError::Sqlite(e)
            }
        })?;
    }

    txn.commit()?;
    info!("recorded {} game {} with {} players", ruleset, id, game.scores.len());
    Ok(id)
}

fn validate(ruleset: Ruleset, game: &NewGame) -> Result<()> {
    let n = game.scores.len();
    let allowed = match ruleset {
        Ruleset::Rcr => (4..=5).contains(&n),
        Ruleset::Mcr => n == 4,
    };
    if !allowed {
        return Err(DataError::InvalidGame(format!(
            "{} games take {} players, got {}",
            ruleset,
            if ruleset.has_uma() { "4 or 5" } else { "4" },
            n
        )));
    }

    let mut seen = vec![false; n];
    let mut players = Vec::with_capacity(n);
    for score in &game.scores {
        if score.place == 0 || score.place > n as u32 {
            return Err(DataError::InvalidGame(format!("invalid place {}", score.place)));
        }
        let slot = &mut seen[(score.place - 1) as usize];
        if *slot {
            return Err(DataError::InvalidGame(format!("duplicate place {}", score.place)));
        }
        *slot = true;

        if players.contains(&score.player_id) {
            return Err(DataError::InvalidGame(format!(
                "player {} listed twice",
                score.player_id
            )));
        }
        players.push(score.player_id);

        if ruleset.has_uma() && score.uma_score.is_none() {
            return Err(DataError::InvalidGame("rcr scores need an uma_score".to_string()));
        }
    }
    Ok(())
}

/// Smallest free id for the date, scanning like the tournament allocator.
/// The first game of a day gets sequence 01.
fn next_game_id(db: &Connection, ruleset: Ruleset, date: NaiveDate) -> Result<GameId> {
    let ids = db
        .prepare(&format!(
            "SELECT id FROM {} WHERE date = ? ORDER BY id",
            ruleset.game_table()
        ))?
        .query_map(params![date], |row| row.get::<_, GameId>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut next = GameId::first_of_day(date);
    for id in ids {
        if id == next {
            next = next.next_seq();
        } else {
            break;
        }
    }
    Ok(next)
}

pub fn get_game(db: &Connection, ruleset: Ruleset, id: GameId) -> Result<Option<Game>> {
    use rusqlite::OptionalExtension;

    let header = db
        .query_row(
            &format!(
                "SELECT {tournament}_id, date, nb_players, nb_rounds FROM {game} WHERE id = ?",
                tournament = ruleset.tournament_table(),
                game = ruleset.game_table(),
            ),
            params![id],
            |row| {
                Ok((
                    row.get::<_, TournamentId>(0)?,
                    row.get::<_, NaiveDate>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            },
        )
        .optional()?;

    let (tournament_id, date, nb_players, nb_rounds) = match header {
        Some(header) => header,
        None => return Ok(None),
    };

    let uma_expr = if ruleset.has_uma() { "s.uma_score" } else { "NULL" };
    let scores = db
        .prepare(&format!(
            "
            SELECT p.id, p.name, p.display_name,
                   s.ranking, s.game_score, {uma_expr} AS uma_score, s.final_score
            FROM {score} AS s
            JOIN player AS p ON p.id = s.player_id
            WHERE s.{game} = ?
            ORDER BY s.ranking
            ",
            score = ruleset.score_table(),
            game = ruleset.game_table(),
        ))?
        .query_map(params![id], |row| {
            Ok(GameScore {
                player_id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                place: row.get(3)?,
                game_score: row.get(4)?,
                uma_score: row.get(5)?,
                final_score: row.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(Game {
        id,
        tournament_id,
        date,
        nb_players,
        nb_rounds,
        scores,
    }))
}

/// Deletes a game; its score rows go with it (cascade).
pub fn delete_game(db: &Connection, ruleset: Ruleset, id: GameId) -> Result<()> {
    let deleted = db.execute(
        &format!("DELETE FROM {} WHERE id = ?", ruleset.game_table()),
        params![id],
    )?;
    if deleted == 1 {
        Ok(())
    } else {
        Err(DataError::NotFound("game"))
    }
}

/// Distinct years with recorded games, most recent first.
pub fn years(db: &Connection, ruleset: Ruleset, tournament_id: TournamentId) -> Result<Vec<i32>> {
    let years = db
        .prepare(&format!(
            "
            SELECT DISTINCT CAST(strftime('%Y', date) AS INTEGER) AS y
            FROM {game}
            WHERE {tournament}_id = ?
            ORDER BY y DESC
            ",
            game = ruleset.game_table(),
            tournament = ruleset.tournament_table(),
        ))?
        .query_map(params![tournament_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(years)
}

/// Distinct days of a month with recorded games, ascending.
pub fn days(
    db: &Connection,
    ruleset: Ruleset,
    tournament_id: TournamentId,
    year: i32,
    month: u32,
) -> Result<Vec<u32>> {
    let days = db
        .prepare(&format!(
            "
            SELECT DISTINCT CAST(strftime('%d', date) AS INTEGER) AS d
            FROM {game}
            WHERE {tournament}_id = ?
              AND CAST(strftime('%Y', date) AS INTEGER) = ?
              AND CAST(strftime('%m', date) AS INTEGER) = ?
            ORDER BY d
            ",
            game = ruleset.game_table(),
            tournament = ruleset.tournament_table(),
        ))?
        .query_map(params![tournament_id, year, month], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(days)
}

/// Ids of the games recorded on one date, ascending.
pub fn game_ids(
    db: &Connection,
    ruleset: Ruleset,
    tournament_id: TournamentId,
    date: NaiveDate,
) -> Result<Vec<GameId>> {
    let ids = db
        .prepare(&format!(
            "
            SELECT id FROM {game}
            WHERE {tournament}_id = ? AND date = ?
            ORDER BY id
            ",
            game = ruleset.game_table(),
            tournament = ruleset.tournament_table(),
        ))?
        .query_map(params![tournament_id, date], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::schema::test_conn;
    use crate::data::{player, tournament};

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Four players and one tournament per ruleset; returns the player ids.
    pub(crate) fn seed_club(conn: &Connection) -> Vec<PlayerId> {
        let names = [
            ("Anna Martin", "Anna"),
            ("Brieuc Le Gall", "Brieuc"),
            ("Chen Wei", "Chen"),
            ("Dominique Roux", "Dom"),
            ("Erwan Quéré", "Erwan"),
        ];
        let ids = names
            .iter()
            .map(|(name, display)| player::add_player(conn, name, display).unwrap())
            .collect();
        tournament::add(conn, Ruleset::Rcr, "Club").unwrap();
        tournament::add(conn, Ruleset::Mcr, "Club").unwrap();
        ids
    }

    /// RCR game on `date` placing `players` in the given order. Final score
    /// is spread as +30/+10/-10/-30 (then -40 for a fifth player).
    pub(crate) fn rcr_game(players: &[PlayerId], on: NaiveDate) -> NewGame {
        let finals = [30, 10, -10, -30, -40];
        NewGame {
            tournament_id: 1,
            date: on,
            nb_rounds: 8,
            scores: players
                .iter()
                .enumerate()
                .map(|(i, &player_id)| NewScore {
                    player_id,
                    place: i as u32 + 1,
                    game_score: 30000 + finals[i] * 1000,
                    uma_score: Some(finals[i]),
                    final_score: finals[i],
                })
                .collect(),
        }
    }

    #[test]
    fn game_ids_encode_date_and_sequence() {
        let mut conn = test_conn();
        let players = seed_club(&conn);
        let day = date(2024, 3, 9);

        let first = add_game(&mut conn, Ruleset::Rcr, &rcr_game(&players[..4], day)).unwrap();
        let second = add_game(&mut conn, Ruleset::Rcr, &rcr_game(&players[1..5], day)).unwrap();
        assert_eq!(first.as_i64(), 24030901);
        assert_eq!(second.as_i64(), 24030902);

        delete_game(&conn, Ruleset::Rcr, first).unwrap();
        let reused = add_game(&mut conn, Ruleset::Rcr, &rcr_game(&players[..4], day)).unwrap();
        assert_eq!(reused, first);
    }

    #[test]
    fn get_game_joins_player_names_in_place_order() {
        let mut conn = test_conn();
        let players = seed_club(&conn);
        let id = add_game(
            &mut conn,
            Ruleset::Rcr,
            &rcr_game(&players[..4], date(2024, 3, 9)),
        )
        .unwrap();

        let game = get_game(&conn, Ruleset::Rcr, id).unwrap().expect("game");
        assert_eq!(game.nb_players, 4);
        assert_eq!(game.nb_rounds, 8);
        assert_eq!(game.scores.len(), 4);
        assert_eq!(game.scores[0].display_name, "Anna");
        assert_eq!(game.scores[0].place, 1);
        assert_eq!(game.scores[0].uma_score, Some(30));
        assert_eq!(game.scores[3].final_score, -30);
    }

    #[test]
    fn missing_game_is_none() {
        let conn = test_conn();
        assert!(get_game(&conn, Ruleset::Rcr, GameId::from(24030901)).unwrap().is_none());
    }

    #[test]
    fn deleting_a_game_cascades_to_scores() {
        let mut conn = test_conn();
        let players = seed_club(&conn);
        let id = add_game(
            &mut conn,
            Ruleset::Rcr,
            &rcr_game(&players[..4], date(2024, 3, 9)),
        )
        .unwrap();

        delete_game(&conn, Ruleset::Rcr, id).unwrap();
        let scores: i64 = conn
            .query_row("SELECT COUNT(*) FROM rcr_game_score", [], |row| row.get(0))
            .unwrap();
        assert_eq!(scores, 0);
    }

    #[test]
    fn referenced_players_and_tournaments_cannot_be_deleted() {
        let mut conn = test_conn();
        let players = seed_club(&conn);
        add_game(&mut conn, Ruleset::Rcr, &rcr_game(&players[..4], date(2024, 3, 9))).unwrap();

        assert!(matches!(
            player::delete_player(&conn, players[0]),
            Err(DataError::InUse("player"))
        ));
        assert!(matches!(
            tournament::delete(&conn, Ruleset::Rcr, 1),
            Err(DataError::InUse("tournament"))
        ));
        // The fifth player never played and can go.
        player::delete_player(&conn, players[4]).unwrap();
    }

    #[test]
    fn mcr_games_take_exactly_four_players_without_uma() {
        let mut conn = test_conn();
        let players = seed_club(&conn);

        let mut game = rcr_game(&players[..4], date(2024, 3, 9));
        for score in &mut game.scores {
            score.uma_score = None;
        }
        let id = add_game(&mut conn, Ruleset::Mcr, &game).unwrap();
        let fetched = get_game(&conn, Ruleset::Mcr, id).unwrap().expect("game");
        assert!(fetched.scores.iter().all(|s| s.uma_score.is_none()));

        let five = rcr_game(&players[..5], date(2024, 3, 9));
        assert!(matches!(
            add_game(&mut conn, Ruleset::Mcr, &five),
            Err(DataError::InvalidGame(_))
        ));
    }

    #[test]
    fn unknown_tournament_is_not_found() {
        let mut conn = test_conn();
        let players = seed_club(&conn);

        let mut game = rcr_game(&players[..4], date(2024, 3, 9));
        game.tournament_id = 99;
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &game),
            Err(DataError::NotFound("tournament"))
        ));
    }

    #[test]
    fn unknown_player_is_not_found() {
        let mut conn = test_conn();
        let players = seed_club(&conn);

        let mut game = rcr_game(&players[..4], date(2024, 3, 9));
        game.scores[2].player_id = 99;
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &game),
            Err(DataError::NotFound("player"))
        ));
        // the failed transaction leaves no partial game behind
        assert!(game_ids(&conn, Ruleset::Rcr, 1, date(2024, 3, 9)).unwrap().is_empty());
    }

    #[test]
    fn player_listed_twice_is_invalid() {
        let mut conn = test_conn();
        let players = seed_club(&conn);

        let mut game = rcr_game(&players[..4], date(2024, 3, 9));
        game.scores[1].player_id = players[0];
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &game),
            Err(DataError::InvalidGame(_))
        ));
    }

    #[test]
    fn rcr_scores_require_uma_and_valid_places() {
        let mut conn = test_conn();
        let players = seed_club(&conn);

        let mut missing_uma = rcr_game(&players[..4], date(2024, 3, 9));
        missing_uma.scores[2].uma_score = None;
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &missing_uma),
            Err(DataError::InvalidGame(_))
        ));

        let mut duplicate_place = rcr_game(&players[..4], date(2024, 3, 9));
        duplicate_place.scores[1].place = 1;
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &duplicate_place),
            Err(DataError::InvalidGame(_))
        ));

        let mut out_of_range = rcr_game(&players[..4], date(2024, 3, 9));
        out_of_range.scores[1].place = 5;
        assert!(matches!(
            add_game(&mut conn, Ruleset::Rcr, &out_of_range),
            Err(DataError::InvalidGame(_))
        ));
    }

    #[test]
    fn browse_years_days_and_ids() {
        let mut conn = test_conn();
        let players = seed_club(&conn);
        for on in [date(2023, 11, 4), date(2024, 3, 9), date(2024, 3, 23)] {
            add_game(&mut conn, Ruleset::Rcr, &rcr_game(&players[..4], on)).unwrap();
        }

        assert_eq!(years(&conn, Ruleset::Rcr, 1).unwrap(), vec![2024, 2023]);
        assert_eq!(days(&conn, Ruleset::Rcr, 1, 2024, 3).unwrap(), vec![9, 23]);
        assert_eq!(
            game_ids(&conn, Ruleset::Rcr, 1, date(2024, 3, 9)).unwrap(),
            vec![GameId::from(24030901)]
        );
        assert!(days(&conn, Ruleset::Rcr, 1, 2022, 1).unwrap().is_empty());
    }
}
