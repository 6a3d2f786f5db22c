//! Search and status filtering for the book list.

use crate::book::{Book, BookStatus, ParseStatusError};
use std::fmt;
use std::str::FromStr;

/// Status selector for the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// No status restriction.
    #[default]
    All,
    /// Only books with exactly this status.
    Only(BookStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: BookStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl From<BookStatus> for StatusFilter {
    fn from(status: BookStatus) -> Self {
        StatusFilter::Only(status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("ALL"),
            StatusFilter::Only(status) => fmt::Display::fmt(status, f),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ParseStatusError;

    /// `"ALL"` selects everything; any status name selects that status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// Case-insensitive substring match of `query` against title or author.
///
/// The query is used as given, whitespace included. An empty query matches
/// every book.
pub fn matches_query(book: &Book, query: &str) -> bool {
    matches_needle(book, &query.to_lowercase())
}

// `needle` must already be lowercased.
fn matches_needle(book: &Book, needle: &str) -> bool {
    book.title.to_lowercase().contains(needle) || book.author.to_lowercase().contains(needle)
}

/// Books matching both the text query and the status filter, in collection order.
///
/// # Examples
///
/// ```
/// use booklog::{filter_books, Book, BookStatus, StatusFilter};
///
/// let books = vec![
///     Book::new("1", "Clean Code", "Robert C. Martin", 464),
///     Book::new("2", "Refactoring", "Martin Fowler", 448).with_status(BookStatus::Reading),
///     Book::new("3", "Effective Java", "Joshua Bloch", 412),
/// ];
///
/// let hits = filter_books(&books, "martin", StatusFilter::All);
/// assert_eq!(hits.len(), 2);
///
/// let hits = filter_books(&books, "MARTIN", StatusFilter::Only(BookStatus::Reading));
/// assert_eq!(hits[0].id, "2");
/// ```
pub fn filter_books<'a>(books: &'a [Book], query: &str, status: StatusFilter) -> Vec<&'a Book> {
    let needle = query.to_lowercase();
    books
        .iter()
        .filter(|book| status.matches(book.status))
        .filter(|book| matches_needle(book, &needle))
        .collect()
}
