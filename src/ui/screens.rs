use anyhow::Result;
use rusqlite::Connection;

use crate::db::{
    count_books, fetch_all_admins, fetch_all_books, fetch_all_members, fetch_book_page,
    search_books_by_title, total_quantity,
};
use crate::models::{Admin, Book, Member};

/// Books shown per page on the catalog screen.
pub(crate) const PAGE_SIZE: i64 = 10;

/// Which listing the catalog screen is showing. Entering a non-empty search
/// pattern switches to search results (pagination controls inert); clearing
/// the pattern returns to paginated mode at page 0.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum BookView {
    Paginated,
    Search { pattern: String },
}

/// State for the main catalog screen: the visible window of books plus the
/// aggregates shown alongside it. The screen holds no data the store does not
/// have; every mutation triggers a re-fetch.
pub(crate) struct BookScreen {
    pub(crate) books: Vec<Book>,
    pub(crate) selected: usize,
    pub(crate) page: i64,
    pub(crate) total_books: i64,
    pub(crate) total_quantity: i64,
    pub(crate) view: BookView,
}

impl BookScreen {
    /// Load page 0 of the catalog.
    pub(crate) fn load(conn: &Connection) -> Result<Self> {
        let mut screen = Self {
            books: Vec::new(),
            selected: 0,
            page: 0,
            total_books: 0,
            total_quantity: 0,
            view: BookView::Paginated,
        };
        screen.refresh(conn)?;
        Ok(screen)
    }

    /// Re-fetch the visible window and the aggregates from the store. Clamps
    /// the page when deletions shrink the listing underneath us.
    pub(crate) fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.total_books = count_books(conn)?;
        self.total_quantity = total_quantity(conn)?;

        self.books = match &self.view {
            BookView::Paginated => {
                let last_page = self.page_count().saturating_sub(1);
                if self.page > last_page {
                    self.page = last_page;
                }
                fetch_book_page(conn, self.page * PAGE_SIZE, PAGE_SIZE)?
            }
            BookView::Search { pattern } => search_books_by_title(conn, pattern)?,
        };

        self.ensure_in_bounds();
        Ok(())
    }

    /// Apply a search pattern. An empty pattern leaves search mode and
    /// returns to page 0.
    pub(crate) fn set_search(&mut self, conn: &Connection, pattern: &str) -> Result<()> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            self.view = BookView::Paginated;
            self.page = 0;
        } else {
            self.view = BookView::Search {
                pattern: trimmed.to_string(),
            };
        }
        self.selected = 0;
        self.refresh(conn)
    }

    /// Pattern currently applied, if the screen is in search mode.
    pub(crate) fn search_pattern(&self) -> Option<&str> {
        match &self.view {
            BookView::Paginated => None,
            BookView::Search { pattern } => Some(pattern),
        }
    }

    /// Number of pages implied by the record count; at least 1 so the page
    /// indicator stays meaningful on an empty store.
    pub(crate) fn page_count(&self) -> i64 {
        let pages = (self.total_books + PAGE_SIZE - 1) / PAGE_SIZE;
        pages.max(1)
    }

    /// Move to the next page, if one exists and pagination is active.
    pub(crate) fn next_page(&mut self, conn: &Connection) -> Result<bool> {
        if self.view != BookView::Paginated || self.page + 1 >= self.page_count() {
            return Ok(false);
        }
        self.page += 1;
        self.selected = 0;
        self.refresh(conn)?;
        Ok(true)
    }

    /// Move to the previous page, if one exists and pagination is active.
    pub(crate) fn previous_page(&mut self, conn: &Connection) -> Result<bool> {
        if self.view != BookView::Paginated || self.page == 0 {
            return Ok(false);
        }
        self.page -= 1;
        self.selected = 0;
        self.refresh(conn)?;
        Ok(true)
    }

    pub(crate) fn current_book(&self) -> Option<&Book> {
        self.books.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.books.len(), offset);
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.books.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.selected >= self.books.len() {
            self.selected = self.books.len().saturating_sub(1);
        }
    }
}

/// State for the admin accounts screen.
pub(crate) struct AdminScreen {
    pub(crate) admins: Vec<Admin>,
    pub(crate) selected: usize,
}

impl AdminScreen {
    pub(crate) fn load(conn: &Connection) -> Result<Self> {
        Ok(Self {
            admins: fetch_all_admins(conn)?,
            selected: 0,
        })
    }

    pub(crate) fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.admins = fetch_all_admins(conn)?;
        if self.selected >= self.admins.len() {
            self.selected = self.admins.len().saturating_sub(1);
        }
        Ok(())
    }

    pub(crate) fn current_admin(&self) -> Option<&Admin> {
        self.admins.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.admins.len(), offset);
    }
}

/// State for the member registry screen, with an optional side pane listing
/// every book on the shelf (the registry's "available books" view).
pub(crate) struct MemberScreen {
    pub(crate) members: Vec<Member>,
    pub(crate) selected: usize,
    pub(crate) available_books: Option<Vec<Book>>,
}

impl MemberScreen {
    pub(crate) fn load(conn: &Connection) -> Result<Self> {
        Ok(Self {
            members: fetch_all_members(conn)?,
            selected: 0,
            available_books: None,
        })
    }

    pub(crate) fn refresh(&mut self, conn: &Connection) -> Result<()> {
        self.members = fetch_all_members(conn)?;
        if self.selected >= self.members.len() {
            self.selected = self.members.len().saturating_sub(1);
        }
        if self.available_books.is_some() {
            self.available_books = Some(fetch_all_books(conn)?);
        }
        Ok(())
    }

    /// Show or hide the available-books pane, fetching fresh data each time
    /// it opens.
    pub(crate) fn toggle_available_books(&mut self, conn: &Connection) -> Result<bool> {
        if self.available_books.is_some() {
            self.available_books = None;
            Ok(false)
        } else {
            self.available_books = Some(fetch_all_books(conn)?);
            Ok(true)
        }
    }

    pub(crate) fn current_member(&self) -> Option<&Member> {
        self.members.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        move_within(&mut self.selected, self.members.len(), offset);
    }
}

/// State for the circulation screen: a free-typed book id and the outcome of
/// the last borrow/return action lives in the app footer.
#[derive(Default)]
pub(crate) struct CirculationScreen {
    pub(crate) book_id: String,
}

impl CirculationScreen {
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() || (ch == ' ' && self.book_id.is_empty()) {
            return false;
        }
        self.book_id.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.book_id.pop();
    }

    pub(crate) fn clear(&mut self) {
        self.book_id.clear();
    }

    /// The id to operate on, if one has been typed.
    pub(crate) fn target_id(&self) -> Option<&str> {
        let trimmed = self.book_id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Clamp-style selection movement shared by the list screens.
fn move_within(selected: &mut usize, len: usize, offset: isize) {
    if len == 0 {
        *selected = 0;
        return;
    }
    let max = len as isize - 1;
    let mut new = *selected as isize + offset;
    if new < 0 {
        new = 0;
    }
    if new > max {
        new = max;
    }
    *selected = new as usize;
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::db::{insert_book, open_memory_store};

    use super::*;

    fn seeded_conn(titles: &[&str]) -> Connection {
        let conn = open_memory_store();
        for (idx, title) in titles.iter().enumerate() {
            insert_book(
                &conn,
                &Book {
                    id: format!("B{idx:02}"),
                    title: title.to_string(),
                    author: String::new(),
                    published_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                    quantity: 1,
                },
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn pagination_windows_and_page_count() {
        let titles: Vec<String> = (0..23).map(|n| format!("Title {n}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let conn = seeded_conn(&refs);

        let mut screen = BookScreen::load(&conn).unwrap();
        assert_eq!(screen.page_count(), 3);
        assert_eq!(screen.books.len(), 10);

        assert!(screen.next_page(&conn).unwrap());
        assert!(screen.next_page(&conn).unwrap());
        assert_eq!(screen.books.len(), 3);
        assert!(!screen.next_page(&conn).unwrap());

        assert!(screen.previous_page(&conn).unwrap());
        assert_eq!(screen.page, 1);
    }

    #[test]
    fn search_mode_disables_pagination_and_clearing_returns_to_page_zero() {
        let titles: Vec<String> = (0..15).map(|n| format!("Title {n}")).collect();
        let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
        let conn = seeded_conn(&refs);

        let mut screen = BookScreen::load(&conn).unwrap();
        assert!(screen.next_page(&conn).unwrap());

        screen.set_search(&conn, "Title 1").unwrap();
        assert!(screen.search_pattern().is_some());
        // "Title 1" and "Title 10"–"Title 14".
        assert_eq!(screen.books.len(), 6);
        assert!(!screen.next_page(&conn).unwrap());
        assert!(!screen.previous_page(&conn).unwrap());

        screen.set_search(&conn, "  ").unwrap();
        assert_eq!(screen.search_pattern(), None);
        assert_eq!(screen.page, 0);
        assert_eq!(screen.books.len(), 10);
    }

    #[test]
    fn page_count_is_one_on_empty_store() {
        let conn = seeded_conn(&[]);
        let screen = BookScreen::load(&conn).unwrap();
        assert_eq!(screen.page_count(), 1);
        assert!(screen.current_book().is_none());
    }

    #[test]
    fn circulation_input_filters_leading_whitespace() {
        let mut screen = CirculationScreen::default();
        assert!(!screen.push_char(' '));
        assert!(screen.push_char('B'));
        assert!(screen.push_char('1'));
        assert_eq!(screen.target_id(), Some("B1"));
        screen.clear();
        assert_eq!(screen.target_id(), None);
    }
}
