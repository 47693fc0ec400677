//! Records that flow in and out of the repository. These stay plain data
//! holders; anything that needs the store goes through `BookDatabase`.

use std::fmt;

use crate::db::BookDatabase;
use crate::error::{Error, Result};

/// A book as accepted from a lookup, before it has a row in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    /// Catalog identifier from the lookup service. Blank means none.
    pub volume_id: String,
    /// Blank when the catalog had no ISBN for this volume.
    pub isbn: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub small_thumbnail: String,
    pub large_thumbnail: String,
    pub page_count: i64,
    /// Author names exactly as the catalog reported them.
    pub authors: Vec<String>,
}

/// A book row joined with its aggregated author string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: i64,
    pub volume_id: Option<String>,
    pub isbn: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub small_thumbnail: String,
    pub large_thumbnail: String,
    pub page_count: i64,
    /// `"Last, Remainder"` entries separated by `",\n"`, empty when the book
    /// has no authors.
    pub all_authors: String,
    /// The view this record was listed from. `None` for `get_book`.
    pub view_id: Option<i64>,
}

impl BookRecord {
    /// `Title: Subtitle`, or just the title when there is no subtitle.
    pub fn display_title(&self) -> String {
        if self.subtitle.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}: {}", self.title, self.subtitle)
        }
    }

    fn listed_view(&self) -> Result<i64> {
        self.view_id.ok_or(Error::NotFound("view membership"))
    }

    /// Checkbox state for this book in the view it was listed from. Always
    /// read from the store, never cached on the record.
    pub fn is_selected(&self, db: &BookDatabase) -> Result<bool> {
        db.is_selected(self.listed_view()?, self.id)
    }

    pub fn set_selected(&self, db: &BookDatabase, selected: bool) -> Result<()> {
        db.set_selected(self.listed_view()?, self.id, selected)
    }

    /// Expanded/collapsed row state for this book in its listed view.
    pub fn is_open(&self, db: &BookDatabase) -> Result<bool> {
        db.is_open(self.listed_view()?, self.id)
    }

    pub fn set_open(&self, db: &BookDatabase, open: bool) -> Result<()> {
        db.set_open(self.listed_view()?, self.id, open)
    }
}

/// A named list of books shown as one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub id: i64,
    pub name: String,
    /// Tab position, ascending.
    pub order: i64,
    /// Sort expression applied when listing the view's books.
    pub sort: String,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub last_name: String,
    pub remainder: String,
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.remainder.is_empty() {
            write!(f, "{}", self.last_name)
        } else {
            write!(f, "{}, {}", self.last_name, self.remainder)
        }
    }
}

/// An author name split into the two columns the `authors` table keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub last_name: String,
    /// Given names and anything else that is not the last name.
    pub remainder: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, subtitle: &str) -> BookRecord {
        BookRecord {
            id: 1,
            volume_id: None,
            isbn: None,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            description: String::new(),
            small_thumbnail: String::new(),
            large_thumbnail: String::new(),
            page_count: 0,
            all_authors: String::new(),
            view_id: None,
        }
    }

    #[test]
    fn display_title_omits_blank_subtitle() {
        assert_eq!(record("Dune", "  ").display_title(), "Dune");
        assert_eq!(record("Dune", "Messiah").display_title(), "Dune: Messiah");
    }

    #[test]
    fn author_display_drops_empty_remainder() {
        let plato = Author { id: 1, last_name: "Plato".into(), remainder: String::new() };
        let le_guin = Author { id: 2, last_name: "Le Guin".into(), remainder: "Ursula K.".into() };
        assert_eq!(plato.to_string(), "Plato");
        assert_eq!(le_guin.to_string(), "Le Guin, Ursula K.");
    }

    #[test]
    fn flags_need_a_listed_view() {
        let db = BookDatabase::open_in_memory(&crate::DatabaseConfig::default()).unwrap();
        let err = record("Dune", "").is_selected(&db).unwrap_err();
        assert!(matches!(err, Error::NotFound("view membership")));
    }
}
