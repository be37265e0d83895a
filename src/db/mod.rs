//! Persistence module split across logical submodules, one per collection.
//! Every function takes an explicit `&Connection`; the lifecycle of the
//! handle is owned by the process entry point, never by global state.

mod admins;
mod books;
mod connection;
mod members;
mod staff;

use thiserror::Error;

pub use admins::{delete_admin, fetch_all_admins, insert_admin, update_admin};
pub use books::{
    borrow_book, count_books, delete_book, fetch_all_books, fetch_book_page, insert_book,
    return_book, search_books_by_title, total_quantity, update_book,
};
pub use connection::{apply_schema, open_store};

#[cfg(test)]
pub(crate) use connection::open_memory_store;
pub use members::{delete_member, fetch_all_members, insert_member, update_member};
pub use staff::{delete_staff, fetch_all_staff, insert_staff, update_staff};

/// Persistence failure that callers may want to react to, as opposed to
/// connectivity problems that simply bubble up. Updates and deletes raise
/// `NotFound` when zero rows matched the given id instead of silently
/// reporting success.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no {entity} record matches id '{id}'")]
    NotFound { entity: &'static str, id: String },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
