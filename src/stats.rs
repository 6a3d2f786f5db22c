//! Dashboard numbers derived from the book collection.
//!
//! Everything here is a pure function of a `&[Book]` and is recomputed on
//! every call. Nothing is cached or persisted.

use crate::book::{Book, BookStatus};

/// Headline counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Books with status `READING`.
    pub reading_count: usize,
    /// Books with status `READ`.
    pub read_count: usize,
    /// Sum of `current_page` over every book, whatever its status.
    pub total_pages_read: u64,
}

/// A book that is currently being read, with its progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InProgress<'a> {
    pub book: &'a Book,
    pub progress_percent: u32,
}

/// Count reading and finished books and total the pages read.
///
/// Stopped and unread books still contribute their `current_page` to
/// `total_pages_read`.
///
/// # Examples
///
/// ```
/// use booklog::{compute_stats, Book, BookStatus};
///
/// let books = vec![
///     Book::new("a", "A", "X", 300).with_status(BookStatus::Reading).with_current_page(100),
///     Book::new("b", "B", "Y", 200).with_status(BookStatus::Read).with_current_page(200),
///     Book::new("c", "C", "Z", 500).with_status(BookStatus::Stopped).with_current_page(50),
/// ];
/// let stats = compute_stats(&books);
/// assert_eq!(stats.reading_count, 1);
/// assert_eq!(stats.read_count, 1);
/// assert_eq!(stats.total_pages_read, 350);
/// ```
pub fn compute_stats(books: &[Book]) -> DashboardStats {
    books
        .iter()
        .fold(DashboardStats::default(), |mut stats, book| {
            match book.status {
                BookStatus::Reading => stats.reading_count += 1,
                BookStatus::Read => stats.read_count += 1,
                BookStatus::ToRead | BookStatus::Stopped => {}
            }
            stats.total_pages_read += u64::from(book.current_page);
            stats
        })
}

/// Books with status `READING`, in collection order, each with its progress.
pub fn compute_in_progress(books: &[Book]) -> Vec<InProgress<'_>> {
    books
        .iter()
        .filter(|book| book.status == BookStatus::Reading)
        .map(|book| InProgress {
            book,
            progress_percent: book.progress_percent(),
        })
        .collect()
}

/// `current / total` as a whole percentage, rounding halves up.
///
/// A book with `total == 0` reports 0%. Values above 100 are possible when
/// `current > total`; nothing clamps them.
///
/// # Examples
///
/// ```
/// use booklog::progress_percent;
///
/// assert_eq!(progress_percent(150, 300), 50);
/// assert_eq!(progress_percent(1, 3), 33);
/// assert_eq!(progress_percent(0, 0), 0);
/// ```
pub fn progress_percent(current: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    // Integer form of round(current * 100 / total) with halves rounding up.
    let scaled = u64::from(current) * 200 + u64::from(total);
    let percent = scaled / (u64::from(total) * 2);
    u32::try_from(percent).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_boundaries() {
        assert_eq!(progress_percent(0, 300), 0);
        assert_eq!(progress_percent(300, 300), 100);
        assert_eq!(progress_percent(150, 300), 50);
        assert_eq!(progress_percent(42, 0), 0);
    }

    #[test]
    fn progress_rounds_half_up() {
        // 1/8 = 12.5%
        assert_eq!(progress_percent(1, 8), 13);
        // 2/3 = 66.67%
        assert_eq!(progress_percent(2, 3), 67);
        // 1/200 = 0.5%
        assert_eq!(progress_percent(1, 200), 1);
        // 1/201 = 0.4975%
        assert_eq!(progress_percent(1, 201), 0);
    }

    #[test]
    fn progress_is_not_clamped() {
        assert_eq!(progress_percent(450, 300), 150);
        assert_eq!(progress_percent(u32::MAX, 1), u32::MAX);
    }

    #[test]
    fn empty_collection_has_zero_stats() {
        assert_eq!(compute_stats(&[]), DashboardStats::default());
        assert!(compute_in_progress(&[]).is_empty());
    }
}
