use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, SqlContext};
use crate::models::{Author, AuthorName};

/// Split a catalog author string into last name and remainder.
///
/// `"Le Guin, Ursula K."` splits at the last comma, `"Ursula K. Le Guin"`
/// at the last space, and a single word is all last name. A separator in
/// the first position does not count as one.
pub fn split_author_name(name: &str) -> AuthorName {
    let name = name.trim();

    if let Some(i) = name.rfind(',').filter(|&i| i > 0) {
        return AuthorName {
            last_name: name[..i].trim().to_string(),
            remainder: name[i + 1..].trim().to_string(),
        };
    }

    if let Some(i) = name.rfind(' ').filter(|&i| i > 0) {
        return AuthorName {
            last_name: name[i + 1..].trim().to_string(),
            remainder: name[..i].trim().to_string(),
        };
    }

    AuthorName {
        last_name: name.to_string(),
        remainder: String::new(),
    }
}

/// Find the author row for an exact name, inserting it when missing.
pub(crate) fn find_or_insert_author(conn: &Connection, name: &AuthorName) -> Result<i64> {
    let existing = conn
        .query_row(
            "SELECT id FROM authors WHERE last_name = ?1 AND remainder = ?2",
            params![name.last_name, name.remainder],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up author")?;

    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO authors (last_name, remainder) VALUES (?1, ?2)",
        params![name.last_name, name.remainder],
    )
    .context("failed to insert author")?;
    Ok(conn.last_insert_rowid())
}

/// Link an author to a book. A second link for the same pair is rejected
/// by the store.
pub(crate) fn link_author(conn: &Connection, book_id: i64, author_id: i64) -> Result<i64> {
    conn.execute(
        "INSERT INTO book_authors (book_id, author_id) VALUES (?1, ?2)",
        params![book_id, author_id],
    )
    .context("failed to link author to book")?;
    Ok(conn.last_insert_rowid())
}

/// Remove a book's author links, then any author nobody references anymore.
pub(crate) fn unlink_authors(conn: &Connection, book_id: i64) -> Result<()> {
    let author_ids = {
        let mut stmt = conn
            .prepare("SELECT author_id FROM book_authors WHERE book_id = ?1")
            .context("failed to prepare book author query")?;
        let ids = stmt
            .query_map([book_id], |row| row.get::<_, i64>(0))
            .context("failed to load book authors")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to collect book authors")?;
        ids
    };

    conn.execute("DELETE FROM book_authors WHERE book_id = ?1", [book_id])
        .context("failed to unlink book authors")?;

    for author_id in author_ids {
        let deleted = conn
            .execute(
                "DELETE FROM authors
                 WHERE id = ?1
                   AND NOT EXISTS (SELECT 1 FROM book_authors WHERE author_id = ?1)",
                [author_id],
            )
            .context("failed to delete orphaned author")?;
        if deleted > 0 {
            debug!("deleted orphaned author {author_id}");
        }
    }

    Ok(())
}

/// A book's authors in the order they were linked.
pub fn fetch_book_authors(conn: &Connection, book_id: i64) -> Result<Vec<Author>> {
    let mut stmt = conn
        .prepare(
            "SELECT a.id, a.last_name, a.remainder
             FROM authors a
             INNER JOIN book_authors ba ON ba.author_id = a.id
             WHERE ba.book_id = ?1
             ORDER BY ba.id",
        )
        .context("failed to prepare author query")?;

    let authors = stmt
        .query_map([book_id], |row| {
            Ok(Author {
                id: row.get(0)?,
                last_name: row.get(1)?,
                remainder: row.get(2)?,
            })
        })
        .context("failed to load authors")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to collect authors")?;

    Ok(authors)
}
