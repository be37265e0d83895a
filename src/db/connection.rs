use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".library-desk-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";

/// Ensure the database file exists, apply the schema, and return a live
/// connection. `main` owns the returned handle and threads it through every
/// screen, so there is exactly one connection per process.
pub fn open_store() -> Result<Connection> {
    let db_path = db_path()?;

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(&db_path).context("failed to open SQLite database")?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Create the four collections if they are missing. Kept separate from
/// `open_store` so tests can run the production schema against in-memory
/// connections.
///
/// The application-assigned ids are deliberately not UNIQUE: the desk may
/// enter the same id twice and the store keeps both records.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            book_id TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            published_date TEXT NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity >= 0)
        )",
        [],
    )
    .context("failed to create books table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS admins (
            admin_id TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create admins table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS staff (
            staff_id TEXT NOT NULL,
            username TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create staff table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members (
            member_id TEXT NOT NULL,
            name TEXT NOT NULL,
            membership_number TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create members table")?;

    Ok(())
}

/// Resolve the absolute path to the SQLite database inside the user's home.
fn db_path() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME).join(DB_FILE_NAME))
}

#[cfg(test)]
pub(crate) fn open_memory_store() -> Connection {
    let conn = Connection::open_in_memory().expect("failed to open in-memory store");
    apply_schema(&conn).expect("failed to apply schema");
    conn
}
