extern crate chombo;

use chombo::data::{game, player, schema, tournament, Ruleset};
use chombo::data::{NewGame, NewScore};
use chrono::NaiveDate;
use rusqlite::Connection;

fn main() -> anyhow::Result<()> {
    let config = chombo::init_env()?;
    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    println!("initializing db at {:?}", config.db_path);
    let conn = Connection::open(&config.db_path)?;
    schema::create_schema(&conn)?;

    if config.is_dev() {
        populate_dummy_data(conn)?;
    }
    Ok(())
}

/// A handful of players and one recorded game per ruleset, enough to click
/// through the API against a fresh dev database.
fn populate_dummy_data(mut conn: Connection) -> anyhow::Result<()> {
    let players: Vec<_> = [
        ("Anna Martin", "Anna"),
        ("Brieuc Le Gall", "Brieuc"),
        ("Chen Wei", "Chen"),
        ("Dominique Roux", "Dom"),
    ]
    .iter()
    .map(|(name, display)| player::add_player(&conn, name, display))
    .collect::<Result<_, _>>()?;

    let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let finals = [30i64, 10, -10, -30];

    let rcr = tournament::add(&conn, Ruleset::Rcr, "Club league")?;
    game::add_game(
        &mut conn,
        Ruleset::Rcr,
        &NewGame {
            tournament_id: rcr,
            date,
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
        },
    )?;

    let mcr = tournament::add(&conn, Ruleset::Mcr, "Club league")?;
    game::add_game(
        &mut conn,
        Ruleset::Mcr,
        &NewGame {
            tournament_id: mcr,
            date,
            nb_rounds: 16,
            scores: players
                .iter()
                .enumerate()
                .map(|(i, &player_id)| NewScore {
                    player_id,
                    place: i as u32 + 1,
                    game_score: finals[i] * 8,
                    uma_score: None,
                    final_score: 4 - i as i64,
                })
                .collect(),
        },
    )?;

    println!("seeded {} players and one game per ruleset", players.len());
    Ok(())
}
