mod common;

use booklog::{
    Book, BookStatus, BookStore, BookUpdate, FileStorage, LockMode, MemoryStorage, Storage,
    StoreError, SyncMode, DEFAULT_STORAGE_KEY,
};
use common::{book, memory_store, reading_log, sample_books, stored_books};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_add_writes_full_collection() {
    let (storage, mut store) = memory_store();
    let new_book = book("b1", "새로운 책");

    store.add_book(new_book.clone()).unwrap();
    store.flush().unwrap();

    let writes = storage.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, DEFAULT_STORAGE_KEY);
    assert_eq!(writes[0].1, serde_json::to_string(&vec![new_book]).unwrap());
}

#[test]
fn test_every_mutation_syncs() {
    let (storage, mut store) = memory_store();
    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();
    storage.clear_writes();

    store
        .update_book("b1", BookUpdate::new().title("수정된 제목"))
        .unwrap();
    store.flush().unwrap();
    assert_eq!(storage.write_count(), 1);

    store.delete_book("b1").unwrap();
    store.flush().unwrap();
    assert_eq!(storage.write_count(), 2);
    assert_eq!(stored_books(&storage).unwrap(), Vec::<Book>::new());
}

#[test]
fn test_noops_do_not_sync() {
    let (storage, mut store) = memory_store();
    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();
    storage.clear_writes();

    store
        .update_book("ghost", BookUpdate::new().title("x"))
        .unwrap();
    store.update_book("b1", BookUpdate::new()).unwrap();
    store.delete_book("ghost").unwrap();
    store.add_log("ghost", reading_log("l", 1, 2)).unwrap();
    store.remove_log("b1", "missing-log").unwrap();
    store.flush().unwrap();

    assert_eq!(storage.write_count(), 0);
}

#[test]
fn test_nested_log_change_syncs() {
    let (storage, mut store) = memory_store();
    store.add_book(book("test-id", "T")).unwrap();
    store.flush().unwrap();
    storage.clear_writes();

    store.add_log("test-id", reading_log("log-1", 1, 50)).unwrap();
    store.flush().unwrap();

    assert_eq!(storage.write_count(), 1);
    let saved = stored_books(&storage).unwrap();
    assert_eq!(saved[0].logs, vec![reading_log("log-1", 1, 50)]);
}

#[test]
fn test_writes_applied_in_order() {
    let (storage, mut store) = memory_store();
    for i in 0..20 {
        store.add_book(book(&format!("b{i}"), "T")).unwrap();
    }
    store.flush().unwrap();

    let writes = storage.writes();
    assert_eq!(writes.len(), 20);
    for (i, (_, json)) in writes.iter().enumerate() {
        let books: Vec<Book> = serde_json::from_str(json).unwrap();
        assert_eq!(books.len(), i + 1);
    }
    assert_eq!(stored_books(&storage).unwrap(), store.books());
}

#[test]
fn test_drop_flushes_pending_writes() {
    let storage = Arc::new(MemoryStorage::new());
    {
        let mut store = BookStore::open(Arc::clone(&storage));
        for b in sample_books() {
            store.add_book(b).unwrap();
        }
        // store dropped here without an explicit flush
    }
    assert_eq!(stored_books(&storage).unwrap(), sample_books());
}

#[test]
fn test_reopen_round_trip() {
    let storage = Arc::new(MemoryStorage::new());
    let expected = {
        let mut store = BookStore::open(Arc::clone(&storage));
        for b in sample_books() {
            store.add_book(b).unwrap();
        }
        store
            .update_book(
                "book-3",
                BookUpdate::new()
                    .status(BookStatus::Reading)
                    .current_page(10)
                    .start_date("2024-04-01"),
            )
            .unwrap();
        store.delete_book("book-1").unwrap();
        store.add_log("book-2", reading_log("log-3", 201, 250)).unwrap();
        store.books().to_vec()
    };

    let store = BookStore::open(storage);
    assert_eq!(store.books(), &expected[..]);
}

#[test]
fn test_malformed_value_starts_empty() {
    let storage = Arc::new(MemoryStorage::with_value(DEFAULT_STORAGE_KEY, "invalid json"));
    let store = BookStore::open(storage);
    assert!(store.is_empty());
}

#[test]
fn test_wrong_shape_starts_empty() {
    let storage = Arc::new(MemoryStorage::with_value(
        DEFAULT_STORAGE_KEY,
        r#"[{"id": "b1", "title": "missing everything else"}]"#,
    ));
    let store = BookStore::open(storage);
    assert!(store.is_empty());
}

#[test]
fn test_empty_value_starts_empty() {
    let storage = Arc::new(MemoryStorage::with_value(DEFAULT_STORAGE_KEY, ""));
    let store = BookStore::open(storage);
    assert!(store.is_empty());
}

#[test]
fn test_recovered_store_is_usable() {
    let storage = Arc::new(MemoryStorage::with_value(DEFAULT_STORAGE_KEY, "{not json"));
    let mut store = BookStore::open(Arc::clone(&storage));

    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();

    // The corrupt value is overwritten by a valid snapshot.
    assert_eq!(stored_books(&storage).unwrap().len(), 1);
}

#[test]
fn test_custom_key() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = BookStore::builder(Arc::clone(&storage))
        .key("other-books")
        .open();
    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();

    assert!(storage.get("other-books").unwrap().is_some());
    assert!(storage.get(DEFAULT_STORAGE_KEY).unwrap().is_none());
}

#[test]
fn test_immediate_mode_writes_before_returning() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = BookStore::builder(Arc::clone(&storage))
        .sync_mode(SyncMode::Immediate)
        .open();

    store.add_book(book("b1", "T")).unwrap();
    assert_eq!(storage.write_count(), 1);
    assert_eq!(stored_books(&storage).unwrap(), store.books());
}

#[test]
fn test_immediate_mode_propagates_write_failure() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = BookStore::builder(Arc::clone(&storage))
        .sync_mode(SyncMode::Immediate)
        .open();
    storage.fail_writes(true);

    let err = store.add_book(book("b1", "T")).unwrap_err();
    assert!(matches!(err, StoreError::Io(_)));
    // The in-memory change stands even though the write failed.
    assert_eq!(store.len(), 1);
}

#[test]
fn test_deferred_mode_reports_write_failure() {
    let (storage, mut store) = memory_store();
    storage.fail_writes(true);

    // The failure surfaces from the next call that checks in with the
    // worker: either the mutation itself or the flush after it.
    let added = store.add_book(book("b1", "T"));
    let flushed = store.flush();
    assert!(added.is_err() || flushed.is_err());
    assert!(matches!(added.err().or(flushed.err()), Some(StoreError::Io(_))));

    storage.fail_writes(false);
    store.add_book(book("b2", "T")).unwrap();
    store.flush().unwrap();

    assert_eq!(storage.write_count(), 1);
    assert_eq!(stored_books(&storage).unwrap().len(), 2);
}

#[test]
fn test_reload_reads_back_storage() {
    let (storage, mut store) = memory_store();
    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();

    storage
        .set(DEFAULT_STORAGE_KEY, &serde_json::to_string(&sample_books()).unwrap())
        .unwrap();

    store.reload().unwrap();
    assert_eq!(store.books(), &sample_books()[..]);
}

#[test]
fn test_file_storage_round_trip() {
    let dir = tempdir().unwrap();
    {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let mut store = BookStore::open(storage);
        for b in sample_books() {
            store.add_book(b).unwrap();
        }
        store.flush().unwrap();
    }

    let path = dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json"));
    let raw = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value.is_array());
    assert_eq!(value[1]["currentPage"], 200);
    assert_eq!(value[1]["logs"][0]["endPage"], 100);
    assert_eq!(value[0]["status"], "READ");

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let store = BookStore::open(storage);
    assert_eq!(store.books(), &sample_books()[..]);
}

#[test]
fn test_file_storage_corrupt_file_starts_empty() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json")),
        "invalid json",
    )
    .unwrap();

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let store = BookStore::open(storage);
    assert!(store.is_empty());
}

#[test]
fn test_file_storage_lock_excludes_second_writer() {
    let dir = tempdir().unwrap();
    let _first = FileStorage::open(dir.path()).unwrap();

    let err = FileStorage::open(dir.path()).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    assert!(err.to_string().contains("another writer holds the lock"));
}

#[test]
fn test_file_storage_lock_released_on_drop() {
    let dir = tempdir().unwrap();
    {
        let _storage = FileStorage::open(dir.path()).unwrap();
    }
    let _again = FileStorage::open(dir.path()).unwrap();
}

#[test]
fn test_file_storage_lock_mode_none() {
    let dir = tempdir().unwrap();
    let _a = FileStorage::open_with_lock(dir.path(), LockMode::None).unwrap();
    let _b = FileStorage::open_with_lock(dir.path(), LockMode::None).unwrap();
}

#[test]
fn test_file_storage_ignores_leftover_tmp() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json.tmp")),
        "[garbage",
    )
    .unwrap();

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let mut store = BookStore::open(storage);
    assert!(store.is_empty());

    store.add_book(book("b1", "T")).unwrap();
    store.flush().unwrap();
    assert!(!dir.path().join(format!("{DEFAULT_STORAGE_KEY}.json.tmp")).exists());
}
