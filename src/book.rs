use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current UTC time as an RFC 3339 / ISO 8601 string with millisecond precision.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Where a book stands in the reader's queue.
///
/// Serialized as `"TO_READ"`, `"READING"`, `"READ"` or `"STOPPED"`. Any status
/// may follow any other; the store does not police transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookStatus {
    ToRead,
    Reading,
    Read,
    Stopped,
}

impl BookStatus {
    /// All statuses in display order.
    pub const ALL: [BookStatus; 4] = [
        BookStatus::ToRead,
        BookStatus::Reading,
        BookStatus::Read,
        BookStatus::Stopped,
    ];

    /// The wire name, e.g. `"TO_READ"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::ToRead => "TO_READ",
            BookStatus::Reading => "READING",
            BookStatus::Read => "READ",
            BookStatus::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown book status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for BookStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// One recorded reading session attached to a [`Book`].
///
/// `end_page >= start_page` is expected but not checked anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingLog {
    pub id: String,
    /// ISO 8601 timestamp of the session.
    pub date: String,
    pub start_page: u32,
    pub end_page: u32,
    /// Free-text note for the session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ReadingLog {
    /// Create a reading session dated now.
    ///
    /// # Examples
    ///
    /// ```
    /// use booklog::ReadingLog;
    ///
    /// let log = ReadingLog::new("log-1", 1, 50).with_content("first chapter");
    /// assert_eq!(log.end_page, 50);
    /// assert_eq!(log.content.as_deref(), Some("first chapter"));
    /// ```
    pub fn new(id: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        ReadingLog {
            id: id.into(),
            date: now_iso(),
            start_page,
            end_page,
            content: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// A tracked book.
///
/// This is the record the store keeps and persists. Serialized with camelCase
/// keys (`totalPages`, `currentPage`, `createdAt`, ...); optional fields are
/// left out of the JSON when unset.
///
/// `id` is the lookup key and is chosen by the caller. `current_page` is
/// expected to lie in `0..=total_pages` but is never clamped.
///
/// # Examples
///
/// ```
/// use booklog::{Book, BookStatus};
///
/// let book = Book::new("book-1", "Clean Code", "Robert C. Martin", 464)
///     .with_status(BookStatus::Reading)
///     .with_current_page(120);
/// assert_eq!(book.status, BookStatus::Reading);
/// assert!(book.logs.is_empty());
/// assert!(!book.created_at.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub total_pages: u32,
    pub current_page: u32,
    pub status: BookStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    /// Reading sessions in the order they were recorded.
    #[serde(default)]
    pub logs: Vec<ReadingLog>,
    /// Set once at creation.
    pub created_at: String,
}

impl Book {
    /// Create an unread book (`TO_READ`, page 0, no logs) stamped with the
    /// current time as `created_at`.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        total_pages: u32,
    ) -> Self {
        Book {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            cover_url: None,
            total_pages,
            current_page: 0,
            status: BookStatus::ToRead,
            start_date: None,
            end_date: None,
            rating: None,
            review: None,
            logs: Vec::new(),
            created_at: now_iso(),
        }
    }

    pub fn with_status(mut self, status: BookStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_current_page(mut self, page: u32) -> Self {
        self.current_page = page;
        self
    }

    pub fn with_cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(url.into());
        self
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_review(mut self, review: impl Into<String>) -> Self {
        self.review = Some(review.into());
        self
    }

    pub fn with_log(mut self, log: ReadingLog) -> Self {
        self.logs.push(log);
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    /// Reading progress in whole percent. See [`progress_percent`](crate::progress_percent).
    pub fn progress_percent(&self) -> u32 {
        crate::stats::progress_percent(self.current_page, self.total_pages)
    }
}

/// A partial [`Book`]: every field that is `Some` overwrites, everything else
/// is kept.
///
/// Fields that are optional on `Book` take an `Option<Option<_>>`:
/// `Some(Some(v))` sets, `Some(None)` clears, `None` leaves the field alone.
/// There is no way to touch `id` or `created_at`.
///
/// # Examples
///
/// ```
/// use booklog::{Book, BookStatus, BookUpdate};
///
/// let mut book = Book::new("x", "A", "B", 300).with_rating(3.0);
/// BookUpdate::new()
///     .current_page(100)
///     .status(BookStatus::Reading)
///     .clear_rating()
///     .apply(&mut book);
///
/// assert_eq!(book.title, "A");
/// assert_eq!(book.current_page, 100);
/// assert_eq!(book.status, BookStatus::Reading);
/// assert_eq!(book.rating, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<Option<String>>,
    pub total_pages: Option<u32>,
    pub current_page: Option<u32>,
    pub status: Option<BookStatus>,
    pub start_date: Option<Option<String>>,
    pub end_date: Option<Option<String>>,
    pub rating: Option<Option<f64>>,
    pub review: Option<Option<String>>,
    pub logs: Option<Vec<ReadingLog>>,
}

impl BookUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn cover_url(mut self, url: impl Into<String>) -> Self {
        self.cover_url = Some(Some(url.into()));
        self
    }

    pub fn clear_cover_url(mut self) -> Self {
        self.cover_url = Some(None);
        self
    }

    pub fn total_pages(mut self, pages: u32) -> Self {
        self.total_pages = Some(pages);
        self
    }

    pub fn current_page(mut self, page: u32) -> Self {
        self.current_page = Some(page);
        self
    }

    pub fn status(mut self, status: BookStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(Some(date.into()));
        self
    }

    pub fn clear_start_date(mut self) -> Self {
        self.start_date = Some(None);
        self
    }

    pub fn end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(Some(date.into()));
        self
    }

    pub fn clear_end_date(mut self) -> Self {
        self.end_date = Some(None);
        self
    }

    pub fn rating(mut self, rating: f64) -> Self {
        self.rating = Some(Some(rating));
        self
    }

    pub fn clear_rating(mut self) -> Self {
        self.rating = Some(None);
        self
    }

    pub fn review(mut self, review: impl Into<String>) -> Self {
        self.review = Some(Some(review.into()));
        self
    }

    pub fn clear_review(mut self) -> Self {
        self.review = Some(None);
        self
    }

    /// Replace the whole log sequence.
    pub fn logs(mut self, logs: Vec<ReadingLog>) -> Self {
        self.logs = Some(logs);
        self
    }

    /// True if applying this update would not assign anything.
    pub fn is_empty(&self) -> bool {
        *self == BookUpdate::default()
    }

    /// Shallow-merge into `book`.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if let Some(cover_url) = self.cover_url {
            book.cover_url = cover_url;
        }
        if let Some(total_pages) = self.total_pages {
            book.total_pages = total_pages;
        }
        if let Some(current_page) = self.current_page {
            book.current_page = current_page;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
        if let Some(start_date) = self.start_date {
            book.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            book.end_date = end_date;
        }
        if let Some(rating) = self.rating {
            book.rating = rating;
        }
        if let Some(review) = self.review {
            book.review = review;
        }
        if let Some(logs) = self.logs {
            book.logs = logs;
        }
    }
}
