//! Binary entry point that glues the SQLite-backed catalog to the TUI: open
//! the store, hydrate the initial app state, and drive the Ratatui event loop
//! until the user exits.
use library_desk_manager::{open_store, run_app, App};

/// Initialize persistence and launch the event loop. Fatal initialization
/// problems (for example an unwritable data directory) bubble up to the
/// terminal instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let conn = open_store()?;
    let mut app = App::new(conn)?;
    run_app(&mut app)
}
