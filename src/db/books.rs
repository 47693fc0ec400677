use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::authors::{find_or_insert_author, link_author, split_author_name, unlink_authors};
use super::cancel::{self, CancellationSignal};
use super::sort::SortOrder;
use crate::error::{Error, Result, SqlContext};
use crate::models::{BookRecord, NewBook};

/// Map one row of the aggregated-authors view to a record. Queries that
/// list a view's books also select `view_id`.
fn book_from_row(row: &Row<'_>, view_id: Option<i64>) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        id: row.get("id")?,
        volume_id: row.get("volume_id")?,
        isbn: row.get("isbn")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        description: row.get("description")?,
        small_thumbnail: row.get("small_thumb")?,
        large_thumbnail: row.get("large_thumb")?,
        page_count: row.get("page_count")?,
        all_authors: row.get::<_, Option<String>>("all_authors")?.unwrap_or_default(),
        view_id,
    })
}

/// Blank identifiers are stored as NULL so they never trip the uniqueness
/// constraint.
fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Insert a book and its authors in one transaction. A duplicate ISBN or
/// volume id, or the same author listed twice, fails the whole insert.
pub fn add_book(conn: &Connection, book: &NewBook) -> Result<i64> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin add book transaction")?;

    tx.execute(
        "INSERT INTO books (volume_id, isbn, title, subtitle, description, small_thumb, large_thumb, page_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            non_blank(&book.volume_id),
            non_blank(&book.isbn),
            book.title,
            book.subtitle,
            book.description,
            book.small_thumbnail,
            book.large_thumbnail,
            book.page_count,
        ],
    )
    .context("failed to insert book")?;
    let book_id = tx.last_insert_rowid();

    for author in &book.authors {
        if author.trim().is_empty() {
            continue;
        }
        let author_id = find_or_insert_author(&tx, &split_author_name(author))?;
        link_author(&tx, book_id, author_id)?;
    }

    tx.commit().context("failed to commit new book")?;
    debug!("added book {book_id} with {} author(s)", book.authors.len());
    Ok(book_id)
}

/// Delete a book: author links, orphaned authors, view memberships, then
/// the book row itself. An unknown id is `Error::NotFound` and changes
/// nothing.
pub fn remove_book(conn: &Connection, book_id: i64) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin remove book transaction")?;

    unlink_authors(&tx, book_id)?;
    tx.execute("DELETE FROM book_views WHERE book_id = ?1", [book_id])
        .context("failed to remove book from views")?;
    let deleted = tx
        .execute("DELETE FROM books WHERE id = ?1", [book_id])
        .context("failed to delete book")?;

    if deleted == 0 {
        return Err(Error::NotFound("book"));
    }

    tx.commit().context("failed to commit book removal")?;
    debug!("removed book {book_id}");
    Ok(())
}

/// One book with its authors, independent of any view.
pub fn fetch_book(
    conn: &Connection,
    book_id: i64,
    signal: Option<&CancellationSignal>,
) -> Result<Option<BookRecord>> {
    cancel::check(signal)?;

    conn.query_row(
        "SELECT * FROM book_authors_view WHERE id = ?1",
        [book_id],
        |row| book_from_row(row, None),
    )
    .optional()
    .context("failed to load book")
}

/// Every book linked to a view, in the view's sort order. Memberships whose
/// book row is gone are skipped.
pub fn fetch_books_for_view(
    conn: &Connection,
    view_id: i64,
    sort: &SortOrder,
    signal: Option<&CancellationSignal>,
) -> Result<Vec<BookRecord>> {
    cancel::check(signal)?;

    let sql = format!(
        "SELECT b.*
         FROM book_views bv
         INNER JOIN book_authors_view b ON b.id = bv.book_id
         WHERE bv.view_id = ?1
         ORDER BY {}",
        sort.to_sql()
    );
    let mut stmt = conn
        .prepare(&sql)
        .context("failed to prepare book list query")?;
    let mut rows = stmt
        .query([view_id])
        .context("failed to execute book list query")?;

    let mut books = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch book row")? {
        cancel::check(signal)?;
        books.push(book_from_row(row, Some(view_id)).context("failed to read book row")?);
    }

    Ok(books)
}
