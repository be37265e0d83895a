use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row};

use crate::models::Book;

use super::StoreError;

/// Shared row mapper so every book query hydrates records the same way.
fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        published_date: row.get(3)?,
        quantity: row.get(4)?,
    })
}

/// Write a new book record. There is no uniqueness check on the id; the desk
/// is trusted to assign identifiers and duplicates are stored as-is.
pub fn insert_book(conn: &Connection, book: &Book) -> Result<()> {
    conn.execute(
        "INSERT INTO books (book_id, title, author, published_date, quantity)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            book.id,
            book.title,
            book.author,
            book.published_date,
            book.quantity
        ],
    )
    .context("failed to insert book")?;
    Ok(())
}

/// Rewrite every non-id field of the book with the given id. Raises
/// `StoreError::NotFound` when no record matched so the caller can tell an
/// applied update apart from a no-op.
pub fn update_book(
    conn: &Connection,
    id: &str,
    title: &str,
    author: &str,
    published_date: chrono::NaiveDate,
    quantity: i64,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE books SET title = ?1, author = ?2, published_date = ?3, quantity = ?4
             WHERE book_id = ?5",
            params![title, author, published_date, quantity, id],
        )
        .context("failed to update book")?;

    if updated == 0 {
        Err(StoreError::not_found("book", id).into())
    } else {
        Ok(())
    }
}

/// Remove the book record with the given id, surfacing a descriptive error
/// when the id matched nothing.
pub fn delete_book(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM books WHERE book_id = ?1", params![id])
        .context("failed to delete book")?;

    if deleted == 0 {
        Err(StoreError::not_found("book", id).into())
    } else {
        Ok(())
    }
}

/// Retrieve every book. Ordered by id (rowid tiebreak) so listings and pages
/// share one stable ordering.
pub fn fetch_all_books(conn: &Connection) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(
            "SELECT book_id, title, author, published_date, quantity
             FROM books
             ORDER BY book_id, rowid",
        )
        .context("failed to prepare book query")?;

    let books = stmt
        .query_map([], book_from_row)
        .context("failed to load books")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect books")?;

    Ok(books)
}

/// Retrieve one window of the book listing. The ordering matches
/// `fetch_all_books`, so consecutive windows are disjoint and reproducible
/// as long as no writes land in between.
pub fn fetch_book_page(conn: &Connection, offset: i64, limit: i64) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(
            "SELECT book_id, title, author, published_date, quantity
             FROM books
             ORDER BY book_id, rowid
             LIMIT ?1 OFFSET ?2",
        )
        .context("failed to prepare paginated book query")?;

    let books = stmt
        .query_map(params![limit, offset], book_from_row)
        .context("failed to load book page")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect book page")?;

    Ok(books)
}

/// Total number of book records, used to derive the page count.
pub fn count_books(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
        .context("failed to count books")
}

/// Sum of the quantity counter across every book record; 0 when the shelf
/// is empty.
pub fn total_quantity(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(quantity), 0) FROM books",
        [],
        |row| row.get(0),
    )
    .context("failed to sum book quantities")
}

/// Case-insensitive substring search over titles. The pattern is bound as a
/// parameter with LIKE metacharacters escaped, so user input never changes
/// the match semantics.
pub fn search_books_by_title(conn: &Connection, pattern: &str) -> Result<Vec<Book>> {
    let mut stmt = conn
        .prepare(
            "SELECT book_id, title, author, published_date, quantity
             FROM books
             WHERE title LIKE '%' || ?1 || '%' ESCAPE '\\'
             ORDER BY book_id, rowid",
        )
        .context("failed to prepare title search")?;

    let books = stmt
        .query_map(params![escape_like_pattern(pattern)], book_from_row)
        .context("failed to run title search")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect search results")?;

    Ok(books)
}

/// Escape LIKE metacharacters so they match literally under `ESCAPE '\'`.
fn escape_like_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Borrow one copy: a single conditional decrement that only fires while
/// stock remains, so concurrent borrowers can never drive the counter below
/// zero. Returns `false` when the id is unknown or the quantity is already 0.
///
/// The rowid subselect pins the decrement to one record even when the same
/// id was entered twice.
pub fn borrow_book(conn: &Connection, id: &str) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE books SET quantity = quantity - 1
             WHERE rowid = (
                 SELECT rowid FROM books WHERE book_id = ?1 AND quantity > 0 LIMIT 1
             )",
            params![id],
        )
        .context("failed to borrow book")?;
    Ok(updated > 0)
}

/// Return one copy: an unconditional increment on one matching record.
/// Returns `false` only when the id matches nothing; there is no check that
/// the copy was actually borrowed.
pub fn return_book(conn: &Connection, id: &str) -> Result<bool> {
    let updated = conn
        .execute(
            "UPDATE books SET quantity = quantity + 1
             WHERE rowid = (
                 SELECT rowid FROM books WHERE book_id = ?1 LIMIT 1
             )",
            params![id],
        )
        .context("failed to return book")?;
    Ok(updated > 0)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rusqlite::Connection;

    use super::super::connection::open_memory_store;
    use super::super::StoreError;
    use super::*;

    fn sample_book(id: &str, title: &str, quantity: i64) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            author: "X".to_string(),
            published_date: NaiveDate::from_ymd_opt(2019, 8, 12).unwrap(),
            quantity,
        }
    }

    fn quantity_of(conn: &Connection, id: &str) -> i64 {
        fetch_all_books(conn)
            .unwrap()
            .into_iter()
            .find(|book| book.id == id)
            .map(|book| book.quantity)
            .expect("book should exist")
    }

    #[test]
    fn insert_then_fetch_preserves_fields() {
        let conn = open_memory_store();
        let book = Book {
            id: "B7".to_string(),
            title: "The Rust Programming Language".to_string(),
            author: "Steve Klabnik".to_string(),
            published_date: NaiveDate::from_ymd_opt(2019, 8, 12).unwrap(),
            quantity: 3,
        };

        insert_book(&conn, &book).unwrap();

        let all = fetch_all_books(&conn).unwrap();
        assert_eq!(all, vec![book]);
    }

    #[test]
    fn borrow_and_return_walk_the_counter() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 2)).unwrap();

        assert!(borrow_book(&conn, "B1").unwrap());
        assert_eq!(quantity_of(&conn, "B1"), 1);
        assert!(borrow_book(&conn, "B1").unwrap());
        assert_eq!(quantity_of(&conn, "B1"), 0);
        assert!(!borrow_book(&conn, "B1").unwrap());
        assert_eq!(quantity_of(&conn, "B1"), 0);
        assert!(return_book(&conn, "B1").unwrap());
        assert_eq!(quantity_of(&conn, "B1"), 1);
    }

    #[test]
    fn borrow_fails_for_unknown_id() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 1)).unwrap();

        assert!(!borrow_book(&conn, "missing").unwrap());
        assert_eq!(quantity_of(&conn, "B1"), 1);
    }

    #[test]
    fn return_fails_for_unknown_id() {
        let conn = open_memory_store();
        assert!(!return_book(&conn, "missing").unwrap());
    }

    #[test]
    fn borrow_then_return_restores_quantity() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B2", "Ada", 5)).unwrap();

        assert!(borrow_book(&conn, "B2").unwrap());
        assert!(return_book(&conn, "B2").unwrap());
        assert_eq!(quantity_of(&conn, "B2"), 5);
    }

    #[test]
    fn total_quantity_matches_listing_sum() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 2)).unwrap();
        insert_book(&conn, &sample_book("B2", "Ada", 0)).unwrap();
        insert_book(&conn, &sample_book("B3", "C", 7)).unwrap();

        let listed: i64 = fetch_all_books(&conn)
            .unwrap()
            .iter()
            .map(|book| book.quantity)
            .sum();
        assert_eq!(total_quantity(&conn).unwrap(), listed);
        assert_eq!(total_quantity(&conn).unwrap(), 9);
    }

    #[test]
    fn total_quantity_is_zero_on_empty_store() {
        let conn = open_memory_store();
        assert_eq!(total_quantity(&conn).unwrap(), 0);
    }

    #[test]
    fn consecutive_pages_are_disjoint() {
        let conn = open_memory_store();
        for n in 0..25 {
            insert_book(&conn, &sample_book(&format!("B{n:02}"), "Title", 1)).unwrap();
        }

        let first = fetch_book_page(&conn, 0, 10).unwrap();
        let second = fetch_book_page(&conn, 10, 10).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 10);
        assert!(first
            .iter()
            .all(|book| second.iter().all(|other| other.id != book.id)));
        assert_eq!(count_books(&conn).unwrap(), 25);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Golang Basics", 1)).unwrap();
        insert_book(&conn, &sample_book("B2", "Rust in Action", 1)).unwrap();

        let hits = search_books_by_title(&conn, "go").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Golang Basics");
    }

    #[test]
    fn search_treats_like_metacharacters_literally() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "100% Pure SQL", 1)).unwrap();
        insert_book(&conn, &sample_book("B2", "Plain Prose", 1)).unwrap();

        let hits = search_books_by_title(&conn, "100%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "B1");

        // A bare "%" must not match everything.
        let underscore = search_books_by_title(&conn, "_").unwrap();
        assert!(underscore.is_empty());
    }

    #[test]
    fn update_applies_fields_and_flags_missing_ids() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 2)).unwrap();

        update_book(
            &conn,
            "B1",
            "Go, Second Edition",
            "Y",
            NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
            4,
        )
        .unwrap();
        let updated = &fetch_all_books(&conn).unwrap()[0];
        assert_eq!(updated.title, "Go, Second Edition");
        assert_eq!(updated.quantity, 4);

        let err = update_book(
            &conn,
            "missing",
            "T",
            "A",
            NaiveDate::from_ymd_opt(2021, 1, 2).unwrap(),
            1,
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("book", "missing"))
        );
    }

    #[test]
    fn delete_flags_missing_ids() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 2)).unwrap();

        delete_book(&conn, "B1").unwrap();
        assert!(fetch_all_books(&conn).unwrap().is_empty());

        let err = delete_book(&conn, "B1").unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::not_found("book", "B1"))
        );
    }

    #[test]
    fn borrow_touches_one_record_when_ids_collide() {
        let conn = open_memory_store();
        insert_book(&conn, &sample_book("B1", "Go", 1)).unwrap();
        insert_book(&conn, &sample_book("B1", "Go (second copy record)", 1)).unwrap();

        assert!(borrow_book(&conn, "B1").unwrap());
        assert_eq!(total_quantity(&conn).unwrap(), 1);
    }
}
