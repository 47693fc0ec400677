//! Persistence module split across logical submodules.

mod authors;
mod books;
mod cancel;
mod connection;
mod repository;
pub mod schema;
mod sort;
mod views;

pub use authors::{fetch_book_authors, split_author_name};
pub use books::{add_book, fetch_book, fetch_books_for_view, remove_book};
pub use cancel::CancellationSignal;
pub use connection::BookDatabase;
pub use schema::{UpgradeReport, SCHEMA};
pub use sort::{SortKey, SortOrder, SortTerm};
pub use views::{
    add_book_to_view, create_view, fetch_views, is_book_in_any_view, remove_book_from_view,
};
