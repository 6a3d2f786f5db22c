use std::io;
use thiserror::Error;

/// Errors surfaced by [`BookStore`](crate::BookStore) operations.
///
/// Bad stored data never shows up here: it is logged and the store starts
/// empty. What does show up is a failure to write the collection back.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize book collection: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background sync worker has stopped")]
    SyncStopped,
}

pub type Result<T> = std::result::Result<T, StoreError>;
