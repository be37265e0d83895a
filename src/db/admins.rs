use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::Admin;

use super::StoreError;

/// Retrieve every admin account, ordered by id for stable display.
pub fn fetch_all_admins(conn: &Connection) -> Result<Vec<Admin>> {
    let mut stmt = conn
        .prepare("SELECT admin_id, username, password FROM admins ORDER BY admin_id, rowid")
        .context("failed to prepare admin query")?;

    let admins = stmt
        .query_map([], |row| {
            Ok(Admin {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
            })
        })
        .context("failed to load admins")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect admins")?;

    Ok(admins)
}

/// Insert a new admin account record.
pub fn insert_admin(conn: &Connection, admin: &Admin) -> Result<()> {
    conn.execute(
        "INSERT INTO admins (admin_id, username, password) VALUES (?1, ?2, ?3)",
        params![admin.id, admin.username, admin.password],
    )
    .context("failed to insert admin")?;
    Ok(())
}

/// Rewrite the credentials for an existing admin, surfacing `NotFound` when
/// the id matched nothing.
pub fn update_admin(conn: &Connection, id: &str, username: &str, password: &str) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE admins SET username = ?1, password = ?2 WHERE admin_id = ?3",
            params![username, password, id],
        )
        .context("failed to update admin")?;

    if updated == 0 {
        Err(StoreError::not_found("admin", id).into())
    } else {
        Ok(())
    }
}

/// Remove an admin account record.
pub fn delete_admin(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM admins WHERE admin_id = ?1", params![id])
        .context("failed to delete admin")?;

    if deleted == 0 {
        Err(StoreError::not_found("admin", id).into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::open_memory_store;
    use super::super::StoreError;
    use super::*;

    fn sample_admin(id: &str) -> Admin {
        Admin {
            id: id.to_string(),
            username: "head-librarian".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[test]
    fn crud_round_trip() {
        let conn = open_memory_store();
        insert_admin(&conn, &sample_admin("A1")).unwrap();

        assert_eq!(fetch_all_admins(&conn).unwrap(), vec![sample_admin("A1")]);

        update_admin(&conn, "A1", "desk-admin", "swordfish").unwrap();
        let updated = &fetch_all_admins(&conn).unwrap()[0];
        assert_eq!(updated.username, "desk-admin");
        assert_eq!(updated.password, "swordfish");

        delete_admin(&conn, "A1").unwrap();
        assert!(fetch_all_admins(&conn).unwrap().is_empty());
    }

    #[test]
    fn mutations_flag_missing_ids() {
        let conn = open_memory_store();

        let err = update_admin(&conn, "A9", "user", "pass").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("admin", "A9"))
        );

        let err = delete_admin(&conn, "A9").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("admin", "A9"))
        );
    }
}
