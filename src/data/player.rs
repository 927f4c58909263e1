use rusqlite::{params, Connection, Row};

use super::{is_constraint_violation, DataError, Result, Ruleset};

pub type PlayerId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub display_name: String,
}

impl Player {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Player {
            id: row.get("id")?,
            name: row.get("name")?,
            display_name: row.get("display_name")?,
        })
    }
}

/// All registered players, whether or not they have recorded games.
pub fn list_all(db: &Connection) -> Result<Vec<Player>> {
    let players = db
        .prepare("SELECT id, name, display_name FROM player ORDER BY id")?
        .query_map([], Player::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(players)
}

/// Players with at least one recorded score under the given ruleset.
pub fn list_active(db: &Connection, ruleset: Ruleset) -> Result<Vec<Player>> {
    let players = db
        .prepare(&format!(
            "
            SELECT DISTINCT p.id, p.name, p.display_name
            FROM player AS p
            JOIN {score} AS s ON s.player_id = p.id
            ORDER BY p.id
            ",
            score = ruleset.score_table(),
        ))?
        .query_map([], Player::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(players)
}

pub fn add_player(db: &Connection, name: &str, display_name: &str) -> Result<PlayerId> {
    if name.trim().is_empty() || display_name.trim().is_empty() {
        return Err(DataError::EmptyName);
    }
    db.execute(
        "INSERT INTO player (name, display_name) VALUES (?, ?)",
        params![name, display_name],
    )
    .map_err(|e| DataError::on_insert(e, name))?;
    Ok(db.last_insert_rowid())
}

pub fn modify_player(
    db: &Connection,
    id: PlayerId,
    name: &str,
    display_name: &str,
) -> Result<()> {
    if name.trim().is_empty() || display_name.trim().is_empty() {
        return Err(DataError::EmptyName);
    }
    let updated = db
        .execute(
            "UPDATE player SET name = ?, display_name = ? WHERE id = ?",
            params![name, display_name, id],
        )
        .map_err(|e| DataError::on_insert(e, name))?;
    if updated == 1 {
        Ok(())
    } else {
        Err(DataError::NotFound("player"))
    }
}

/// Fails with `InUse` while any score row still references the player.
pub fn delete_player(db: &Connection, id: PlayerId) -> Result<()> {
    let deleted = db
        .execute("DELETE FROM player WHERE id = ?", params![id])
        .map_err(|e| {
            if is_constraint_violation(&e) {
                DataError::InUse("player")
            } else {
                DataError::Sqlite(e)
            }
        })?;
    if deleted == 1 {
        Ok(())
    } else {
        Err(DataError::NotFound("player"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::test_conn;

    #[test]
    fn add_and_list_players() {
        let conn = test_conn();
        let anna = add_player(&conn, "Anna Martin", "Anna").unwrap();
        let brieuc = add_player(&conn, "Brieuc Le Gall", "Brieuc").unwrap();
        assert_ne!(anna, brieuc);

        let players = list_all(&conn).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].name, "Anna Martin");
        assert_eq!(players[1].display_name, "Brieuc");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let conn = test_conn();
        add_player(&conn, "Anna Martin", "Anna").unwrap();
        match add_player(&conn, "Anna Martin", "Anna M.") {
            Err(DataError::NameTaken(name)) => assert_eq!(name, "Anna Martin"),
            other => panic!("expected NameTaken, got {:?}", other),
        }
    }

    #[test]
    fn empty_name_is_rejected() {
        let conn = test_conn();
        assert!(matches!(
            add_player(&conn, "  ", "Anna"),
            Err(DataError::EmptyName)
        ));
        assert!(matches!(
            add_player(&conn, "Anna Martin", ""),
            Err(DataError::EmptyName)
        ));
    }

    #[test]
    fn modify_updates_both_names() {
        let conn = test_conn();
        let id = add_player(&conn, "Anna Martin", "Anna").unwrap();
        modify_player(&conn, id, "Anna Martin-Kerber", "AMK").unwrap();

        let players = list_all(&conn).unwrap();
        assert_eq!(players[0].name, "Anna Martin-Kerber");
        assert_eq!(players[0].display_name, "AMK");
    }

    #[test]
    fn modify_unknown_player_is_not_found() {
        let conn = test_conn();
        assert!(matches!(
            modify_player(&conn, 42, "Nobody", "nb"),
            Err(DataError::NotFound("player"))
        ));
    }

    #[test]
    fn delete_unreferenced_player() {
        let conn = test_conn();
        let id = add_player(&conn, "Anna Martin", "Anna").unwrap();
        delete_player(&conn, id).unwrap();
        assert!(list_all(&conn).unwrap().is_empty());
        assert!(matches!(
            delete_player(&conn, id),
            Err(DataError::NotFound("player"))
        ));
    }

    #[test]
    fn no_active_players_without_scores() {
        let conn = test_conn();
        add_player(&conn, "Anna Martin", "Anna").unwrap();
        assert!(list_active(&conn, Ruleset::Rcr).unwrap().is_empty());
        assert!(list_active(&conn, Ruleset::Mcr).unwrap().is_empty());
    }
}
