//! Core library surface for the Library Desk Manager TUI application.
//!
//! The modules exposed here keep the API small: the `bin` target (and tests)
//! open the embedded SQLite store, build the application state, and hand it to
//! the Ratatui event loop.
pub mod db;
pub mod models;
pub mod ui;

/// Convenience re-export for the persistence layer; `main.rs` uses it to
/// initialize the embedded SQLite store.
pub use db::open_store;

/// The domain types that other layers manipulate.
pub use models::{Admin, Book, Member, Staff};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
