use rusqlite::{params, Connection, Row};

use super::{is_constraint_violation, DataError, Result, Ruleset};

pub type TournamentId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
}

impl Tournament {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Tournament {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }
}

/// Tournaments of a ruleset, most recently created first.
pub fn list(db: &Connection, ruleset: Ruleset) -> Result<Vec<Tournament>> {
    let tournaments = db
        .prepare(&format!(
            "SELECT id, name FROM {} ORDER BY id DESC",
            ruleset.tournament_table()
        ))?
        .query_map([], Tournament::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tournaments)
}

pub fn add(db: &Connection, ruleset: Ruleset, name: &str) -> Result<TournamentId> {
    if name.trim().is_empty() {
        return Err(DataError::EmptyName);
    }
    let id = next_free_id(db, ruleset)?;
    db.execute(
        &format!(
            "INSERT INTO {} (id, name) VALUES (?, ?)",
            ruleset.tournament_table()
        ),
        params![id, name],
    )
    .map_err(|e| DataError::on_insert(e, name))?;
    Ok(id)
}

pub fn modify(db: &Connection, ruleset: Ruleset, id: TournamentId, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(DataError::EmptyName);
    }
    let updated = db
        .execute(
            &format!("UPDATE {} SET name = ? WHERE id = ?", ruleset.tournament_table()),
            params![name, id],
        )
        .map_err(|e| DataError::on_insert(e, name))?;
    if updated == 1 {
        Ok(())
    } else {
        Err(DataError::NotFound("tournament"))
    }
}

/// Fails with `InUse` while games still reference the tournament.
pub fn delete(db: &Connection, ruleset: Ruleset, id: TournamentId) -> Result<()> {
    let deleted = db
        .execute(
            &format!("DELETE FROM {} WHERE id = ?", ruleset.tournament_table()),
            params![id],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                DataError::InUse("tournament")
            } else {
                DataError::Sqlite(e)
            }
        })?;
    if deleted == 1 {
        Ok(())
    } else {
        Err(DataError::NotFound("tournament"))
    }
}

/// Smallest positive id not yet taken. Deleted tournaments free their id
/// for reuse, which keeps the ids small enough to type into a score sheet.
fn next_free_id(db: &Connection, ruleset: Ruleset) -> Result<TournamentId> {
    let ids = db
        .prepare(&format!("SELECT id FROM {} ORDER BY id", ruleset.tournament_table()))?
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut next = 1;
    for id in ids {
        if id == next {
            next += 1;
        } else {
            break;
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::test_conn;

    #[test]
    fn ids_start_at_one_and_fill_gaps() {
        let conn = test_conn();
        assert_eq!(add(&conn, Ruleset::Rcr, "Club 2023").unwrap(), 1);
        assert_eq!(add(&conn, Ruleset::Rcr, "Club 2024").unwrap(), 2);
        assert_eq!(add(&conn, Ruleset::Rcr, "Interclub").unwrap(), 3);

        delete(&conn, Ruleset::Rcr, 2).unwrap();
        assert_eq!(add(&conn, Ruleset::Rcr, "Club 2025").unwrap(), 2);
    }

    #[test]
    fn rulesets_have_independent_id_spaces() {
        let conn = test_conn();
        assert_eq!(add(&conn, Ruleset::Rcr, "Riichi league").unwrap(), 1);
        assert_eq!(add(&conn, Ruleset::Mcr, "MCR league").unwrap(), 1);
        assert_eq!(list(&conn, Ruleset::Rcr).unwrap().len(), 1);
        assert_eq!(list(&conn, Ruleset::Mcr).unwrap().len(), 1);
    }

    #[test]
    fn list_is_most_recent_first() {
        let conn = test_conn();
        add(&conn, Ruleset::Rcr, "Club 2023").unwrap();
        add(&conn, Ruleset::Rcr, "Club 2024").unwrap();
        let names: Vec<String> = list(&conn, Ruleset::Rcr)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Club 2024", "Club 2023"]);
    }

    #[test]
    fn duplicate_and_empty_names_rejected() {
        let conn = test_conn();
        add(&conn, Ruleset::Rcr, "Club 2023").unwrap();
        assert!(matches!(
            add(&conn, Ruleset::Rcr, "Club 2023"),
            Err(DataError::NameTaken(_))
        ));
        assert!(matches!(add(&conn, Ruleset::Rcr, ""), Err(DataError::EmptyName)));
    }

    #[test]
    fn rename_tournament() {
        let conn = test_conn();
        let id = add(&conn, Ruleset::Mcr, "Club 2023").unwrap();
        modify(&conn, Ruleset::Mcr, id, "Club 2023-2024").unwrap();
        assert_eq!(list(&conn, Ruleset::Mcr).unwrap()[0].name, "Club 2023-2024");

        assert!(matches!(
            modify(&conn, Ruleset::Mcr, 99, "Nope"),
            Err(DataError::NotFound("tournament"))
        ));
    }
}
