use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::Staff;

use super::StoreError;

/// Retrieve every staff account, ordered by id for stable display. No screen
/// renders staff records today; the operations exist because the staff
/// collection is part of the store.
pub fn fetch_all_staff(conn: &Connection) -> Result<Vec<Staff>> {
    let mut stmt = conn
        .prepare("SELECT staff_id, username, password FROM staff ORDER BY staff_id, rowid")
        .context("failed to prepare staff query")?;

    let staff = stmt
        .query_map([], |row| {
            Ok(Staff {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
            })
        })
        .context("failed to load staff")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect staff")?;

    Ok(staff)
}

/// Insert a new staff account record.
pub fn insert_staff(conn: &Connection, staff: &Staff) -> Result<()> {
    conn.execute(
        "INSERT INTO staff (staff_id, username, password) VALUES (?1, ?2, ?3)",
        params![staff.id, staff.username, staff.password],
    )
    .context("failed to insert staff")?;
    Ok(())
}

/// Rewrite the credentials for an existing staff record, surfacing
/// `NotFound` when the id matched nothing.
pub fn update_staff(conn: &Connection, id: &str, username: &str, password: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE staff SET username = ?1, password = ?2 WHERE staff_id = ?3",
            params![username, password, id],
        )
        .context("failed to update staff")?;

    if updated == 0 {
        Err(StoreError::not_found("staff", id).into())
    } else {
        Ok(())
    }
}

/// Remove a staff account record.
pub fn delete_staff(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM staff WHERE staff_id = ?1", params![id])
        .context("failed to delete staff")?;

    if deleted == 0 {
        Err(StoreError::not_found("staff", id).into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::open_memory_store;
    use super::super::StoreError;
    use super::*;

    #[test]
    fn crud_round_trip() {
        let conn = open_memory_store();
        let record = Staff {
            id: "S1".to_string(),
            username: "shelver".to_string(),
            password: "letmein".to_string(),
        };
        insert_staff(&conn, &record).unwrap();
        assert_eq!(fetch_all_staff(&conn).unwrap(), vec![record]);

        update_staff(&conn, "S1", "circulation", "changed").unwrap();
        assert_eq!(fetch_all_staff(&conn).unwrap()[0].username, "circulation");

        delete_staff(&conn, "S1").unwrap();
        assert!(fetch_all_staff(&conn).unwrap().is_empty());
    }

    #[test]
    fn mutations_flag_missing_ids() {
        let conn = open_memory_store();
        let err = update_staff(&conn, "S9", "user", "pass").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("staff", "S9"))
        );
    }
}
