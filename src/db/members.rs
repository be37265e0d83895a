use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::Member;

use super::StoreError;

/// Retrieve every registered member, ordered by id for stable display.
pub fn fetch_all_members(conn: &Connection) -> Result<Vec<Member>> {
    let mut stmt = conn
        .prepare(
            "SELECT member_id, name, membership_number, password
             FROM members
             ORDER BY member_id, rowid",
        )
        .context("failed to prepare member query")?;

    let members = stmt
        .query_map([], |row| {
            Ok(Member {
                id: row.get(0)?,
                name: row.get(1)?,
                membership_number: row.get(2)?,
                password: row.get(3)?,
            })
        })
        .context("failed to load members")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect members")?;

    Ok(members)
}

/// Register a new member record.
pub fn insert_member(conn: &Connection, member: &Member) -> Result<()> {
    conn.execute(
        "INSERT INTO members (member_id, name, membership_number, password)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            member.id,
            member.name,
            member.membership_number,
            member.password
        ],
    )
    .context("failed to insert member")?;
    Ok(())
}

/// Rewrite every non-id field of an existing member, surfacing `NotFound`
/// when the id matched nothing.
pub fn update_member(
    conn: &Connection,
    id: &str,
    name: &str,
    membership_number: &str,
    password: &str,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE members SET name = ?1, membership_number = ?2, password = ?3
             WHERE member_id = ?4",
            params![name, membership_number, password, id],
        )
        .context("failed to update member")?;

    if updated == 0 {
        Err(StoreError::not_found("member", id).into())
    } else {
        Ok(())
    }
}

/// Remove a member record.
pub fn delete_member(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM members WHERE member_id = ?1", params![id])
        .context("failed to delete member")?;

    if deleted == 0 {
        Err(StoreError::not_found("member", id).into())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::connection::open_memory_store;
    use super::super::StoreError;
    use super::*;

    fn sample_member() -> Member {
        Member {
            id: "M1".to_string(),
            name: "Ada".to_string(),
            membership_number: "0042".to_string(),
            password: "pw".to_string(),
        }
    }

    #[test]
    fn crud_round_trip() {
        let conn = open_memory_store();
        insert_member(&conn, &sample_member()).unwrap();
        assert_eq!(fetch_all_members(&conn).unwrap(), vec![sample_member()]);

        update_member(&conn, "M1", "Ada L.", "0043", "pw2").unwrap();
        let updated = &fetch_all_members(&conn).unwrap()[0];
        assert_eq!(updated.name, "Ada L.");
        assert_eq!(updated.membership_number, "0043");

        delete_member(&conn, "M1").unwrap();
        assert!(fetch_all_members(&conn).unwrap().is_empty());
    }

    #[test]
    fn mutations_flag_missing_ids() {
        let conn = open_memory_store();
        let err = delete_member(&conn, "M9").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("member", "M9"))
        );
    }
}
