use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use super::cancel::{self, CancellationSignal};
use super::sort::SortOrder;
use crate::error::{Error, Result, SqlContext};
use crate::models::View;

/// Every view in tab order.
pub fn fetch_views(conn: &Connection, signal: Option<&CancellationSignal>) -> Result<Vec<View>> {
    cancel::check(signal)?;

    let mut stmt = conn
        .prepare("SELECT id, name, display_order, sort FROM views ORDER BY display_order, id")
        .context("failed to prepare view query")?;
    let mut rows = stmt.query([]).context("failed to execute view query")?;

    let mut views = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch view row")? {
        cancel::check(signal)?;
        views.push(View {
            id: row.get(0).context("failed to read view id")?,
            name: row.get(1).context("failed to read view name")?,
            order: row.get(2).context("failed to read view order")?,
            sort: row.get(3).context("failed to read view sort")?,
        });
    }

    Ok(views)
}

/// Insert a view with its normalized sort and return it.
pub fn create_view(conn: &Connection, name: &str, order: i64, sort: &SortOrder) -> Result<View> {
    let sort = sort.to_string();
    conn.execute(
        "INSERT INTO views (name, display_order, sort) VALUES (?1, ?2, ?3)",
        params![name, order, sort],
    )
    .context("failed to insert view")?;

    let id = conn.last_insert_rowid();
    debug!("created view {id} ({name})");
    Ok(View {
        id,
        name: name.to_string(),
        order,
        sort,
    })
}

/// Put a book in a view. Adding a book that is already there returns the
/// existing membership id and changes nothing.
pub fn add_book_to_view(conn: &Connection, view_id: i64, book_id: i64) -> Result<i64> {
    let existing = conn
        .query_row(
            "SELECT id FROM book_views WHERE view_id = ?1 AND book_id = ?2",
            params![view_id, book_id],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up book view")?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO book_views (view_id, book_id, is_selected, is_open) VALUES (?1, ?2, 0, 0)",
        params![view_id, book_id],
    )
    .context("failed to add book to view")?;
    Ok(conn.last_insert_rowid())
}

/// Drop one membership. `Error::NotFound` when the book was not in the view.
pub fn remove_book_from_view(conn: &Connection, view_id: i64, book_id: i64) -> Result<()> {
    let deleted = conn
        .execute(
            "DELETE FROM book_views WHERE view_id = ?1 AND book_id = ?2",
            params![view_id, book_id],
        )
        .context("failed to remove book from view")?;

    if deleted == 0 {
        Err(Error::NotFound("book view"))
    } else {
        Ok(())
    }
}

/// Whether the book has any membership left.
pub fn is_book_in_any_view(conn: &Connection, book_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM book_views WHERE book_id = ?1)",
        [book_id],
        |row| row.get(0),
    )
    .context("failed to check book views")
}

/// The two per-membership flags kept on `book_views`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ViewFlag {
    Selected,
    Open,
}

impl ViewFlag {
    fn column(self) -> &'static str {
        match self {
            ViewFlag::Selected => "is_selected",
            ViewFlag::Open => "is_open",
        }
    }
}

pub(crate) fn read_flag(conn: &Connection, view_id: i64, book_id: i64, flag: ViewFlag) -> Result<bool> {
    conn.query_row(
        &format!(
            "SELECT {} FROM book_views WHERE view_id = ?1 AND book_id = ?2",
            flag.column()
        ),
        params![view_id, book_id],
        |row| row.get(0),
    )
    .optional()
    .context("failed to read book view flag")?
    .ok_or(Error::NotFound("book view"))
}

pub(crate) fn write_flag(
    conn: &Connection,
    view_id: i64,
    book_id: i64,
    flag: ViewFlag,
    value: bool,
) -> Result<()> {
    let updated = conn
        .execute(
            &format!(
                "UPDATE book_views SET {} = ?1 WHERE view_id = ?2 AND book_id = ?3",
                flag.column()
            ),
            params![value, view_id, book_id],
        )
        .context("failed to write book view flag")?;

    if updated == 0 {
        Err(Error::NotFound("book view"))
    } else {
        Ok(())
    }
}
