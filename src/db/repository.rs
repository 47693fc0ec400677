//! The operations UI code calls. Each one is a thin wrapper over the query
//! helpers in the sibling modules, bound to the store's single connection.

use super::authors::fetch_book_authors;
use super::books::{add_book, fetch_book, fetch_books_for_view, remove_book};
use super::cancel::CancellationSignal;
use super::connection::BookDatabase;
use super::sort::SortOrder;
use super::views::{
    add_book_to_view, create_view, fetch_views, is_book_in_any_view, read_flag,
    remove_book_from_view, write_flag, ViewFlag,
};
use crate::error::Result;
use crate::models::{Author, BookRecord, NewBook, View};

impl BookDatabase {
    /// Store a looked-up book and its authors. Returns the new book id.
    pub fn add_book(&self, book: &NewBook) -> Result<i64> {
        add_book(self.connection(), book)
    }

    /// Put a book in a view. Idempotent; returns the membership id, and a
    /// repeat call leaves the row's flags as they were.
    pub fn add_book_to_view(&self, view_id: i64, book_id: i64) -> Result<i64> {
        add_book_to_view(self.connection(), view_id, book_id)
    }

    /// Delete a book with its author links, its view memberships and any
    /// author left without books. Fails with `Error::NotFound` for an
    /// unknown id.
    pub fn remove_book(&self, book_id: i64) -> Result<()> {
        remove_book(self.connection(), book_id)
    }

    /// Take a book out of one view. Fails with `Error::NotFound` when the
    /// book was not in that view.
    pub fn remove_book_from_view(&self, view_id: i64, book_id: i64) -> Result<()> {
        remove_book_from_view(self.connection(), view_id, book_id)
    }

    /// Whether any view still holds the book.
    pub fn is_book_in_any_view(&self, book_id: i64) -> Result<bool> {
        is_book_in_any_view(self.connection(), book_id)
    }

    /// Create a view. `order` places its tab; views sharing an order fall
    /// back to creation order.
    pub fn add_view(&self, name: &str, order: i64, sort: &SortOrder) -> Result<View> {
        create_view(self.connection(), name, order, sort)
    }

    /// Every view in tab order.
    pub fn get_view_list(&self, signal: Option<&CancellationSignal>) -> Result<Vec<View>> {
        fetch_views(self.connection(), signal)
    }

    /// Books in a view ordered by `sort`, a view sort expression such as
    /// `"authors, title DESC"`.
    pub fn get_book_list(
        &self,
        view_id: i64,
        sort: &str,
        signal: Option<&CancellationSignal>,
    ) -> Result<Vec<BookRecord>> {
        let sort: SortOrder = sort.parse()?;
        fetch_books_for_view(self.connection(), view_id, &sort, signal)
    }

    /// Books in a view using the view's own sort.
    pub fn get_books_for_view(
        &self,
        view: &View,
        signal: Option<&CancellationSignal>,
    ) -> Result<Vec<BookRecord>> {
        self.get_book_list(view.id, &view.sort, signal)
    }

    /// One book with its aggregated authors, or `None` for an unknown id.
    pub fn get_book(
        &self,
        book_id: i64,
        signal: Option<&CancellationSignal>,
    ) -> Result<Option<BookRecord>> {
        fetch_book(self.connection(), book_id, signal)
    }

    /// A book's authors in link order.
    pub fn book_authors(&self, book_id: i64) -> Result<Vec<Author>> {
        fetch_book_authors(self.connection(), book_id)
    }

    /// The selected flag of a book in a view. `Error::NotFound` when the book
    /// is not in the view; the same holds for the other flag accessors.
    pub fn is_selected(&self, view_id: i64, book_id: i64) -> Result<bool> {
        read_flag(self.connection(), view_id, book_id, ViewFlag::Selected)
    }

    /// Set the selected flag of a book in a view.
    pub fn set_selected(&self, view_id: i64, book_id: i64, selected: bool) -> Result<()> {
        write_flag(self.connection(), view_id, book_id, ViewFlag::Selected, selected)
    }

    /// The open (expanded) flag of a book in a view.
    pub fn is_open(&self, view_id: i64, book_id: i64) -> Result<bool> {
        read_flag(self.connection(), view_id, book_id, ViewFlag::Open)
    }

    /// Set the open flag of a book in a view.
    pub fn set_open(&self, view_id: i64, book_id: i64, open: bool) -> Result<()> {
        write_flag(self.connection(), view_id, book_id, ViewFlag::Open, open)
    }
}
