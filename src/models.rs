//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. These types stay light-weight data holders so the persistence and
//! presentation layers can focus on their own concerns. Every record carries
//! an application-assigned string id that is distinct from the store's
//! internal rowid.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A title held by the library, together with how many copies remain on the
/// shelf. Circulation mutates `quantity`; everything else is catalog data.
pub struct Book {
    /// Librarian-assigned identifier (e.g. "B1"). Uniqueness is not enforced
    /// by the store, so duplicates are possible.
    pub id: String,
    /// Title displayed in listings and matched by the search screen.
    pub title: String,
    pub author: String,
    /// Publication date as entered on the form (`YYYY-MM-DD`).
    pub published_date: NaiveDate,
    /// Copies currently available. Never below zero: borrowing refuses at 0
    /// and the schema carries a matching CHECK.
    pub quantity: i64,
}

impl Book {
    /// Compose a `Title by Author` string that gracefully omits the byline if
    /// the author is blank. List views rely on this ready-to-use formatting.
    pub fn display_title(&self) -> String {
        if self.author.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} by {}", self.title, self.author)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// An administrator account record. Stored as entered; there is no role
/// logic beyond keeping the record.
pub struct Admin {
    pub id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A staff account record. Defined in the store but not surfaced by any
/// screen; the circulation workflow identifies books, not staff.
pub struct Staff {
    pub id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A registered library member. No borrowing history is modeled; membership
/// is a standalone record.
pub struct Member {
    pub id: String,
    pub name: String,
    pub membership_number: String,
    pub password: String,
}
