mod book;
mod error;
mod filter;
mod stats;
pub mod storage;
mod store;

pub use book::{Book, BookStatus, BookUpdate, ParseStatusError, ReadingLog};
pub use error::{Result, StoreError};
pub use filter::{filter_books, matches_query, StatusFilter};
pub use stats::{compute_in_progress, compute_stats, progress_percent, DashboardStats, InProgress};
pub use storage::{FileStorage, LockMode, MemoryStorage, Storage, DEFAULT_STORAGE_KEY};
pub use store::{BookStore, BookStoreBuilder, SyncMode};
