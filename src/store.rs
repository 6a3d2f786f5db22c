use crate::book::{Book, BookUpdate, ReadingLog};
use crate::error::{Result, StoreError};
use crate::filter::{self, StatusFilter};
use crate::stats::{self, DashboardStats, InProgress};
use crate::storage::{DEFAULT_STORAGE_KEY, Storage};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// When the collection is written back to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Mutations enqueue a snapshot for a background writer and return
    /// immediately. Call [`BookStore::flush`] to wait for durability.
    #[default]
    Deferred,
    /// Mutations write before returning and report the write error directly.
    Immediate,
}

/// Builder for configuring a [`BookStore`] before opening it.
///
/// # Examples
///
/// ```
/// use booklog::{BookStore, MemoryStorage, SyncMode};
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// let store = BookStore::builder(storage)
///     .key("my-books")
///     .sync_mode(SyncMode::Immediate)
///     .open();
/// assert_eq!(store.key(), "my-books");
/// assert!(store.is_empty());
/// ```
pub struct BookStoreBuilder {
    storage: Arc<dyn Storage>,
    key: String,
    sync_mode: SyncMode,
}

impl BookStoreBuilder {
    /// Storage key the collection is read from and written to.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// Load the collection and start the store.
    ///
    /// Never fails: a missing value gives an empty collection, and an
    /// unreadable or malformed one is logged and also gives an empty
    /// collection.
    pub fn open(self) -> BookStore {
        let books = load_books(self.storage.as_ref(), &self.key);
        let syncer = match self.sync_mode {
            SyncMode::Immediate => Syncer::Immediate,
            SyncMode::Deferred => {
                Syncer::Deferred(SyncWorker::spawn(Arc::clone(&self.storage), self.key.clone()))
            }
        };
        BookStore {
            books,
            key: self.key,
            storage: self.storage,
            syncer,
        }
    }
}

/// The canonical, persisted book collection.
///
/// Every mutation goes through a method on this type, and every method that
/// changes the collection (including nested changes such as
/// [`add_log`](BookStore::add_log)) ends by writing a complete JSON snapshot
/// of all books to storage. Lookups that miss are not errors: reads return
/// `None`, and mutations become no-ops that write nothing.
///
/// Create one store per process and pass it to whatever needs it.
///
/// # Examples
///
/// ```
/// use booklog::{Book, BookStatus, BookStore, BookUpdate, MemoryStorage, Storage};
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// let mut store = BookStore::open(storage.clone());
///
/// store.add_book(Book::new("b1", "Refactoring", "Martin Fowler", 448)).unwrap();
/// store
///     .update_book("b1", BookUpdate::new().status(BookStatus::Reading).current_page(200))
///     .unwrap();
/// store.flush().unwrap();
///
/// let saved = storage.get("booklog-books").unwrap().unwrap();
/// let books: Vec<Book> = serde_json::from_str(&saved).unwrap();
/// assert_eq!(books, store.books());
/// ```
pub struct BookStore {
    books: Vec<Book>,
    key: String,
    storage: Arc<dyn Storage>,
    syncer: Syncer,
}

impl std::fmt::Debug for BookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore")
            .field("key", &self.key)
            .field("books", &self.books.len())
            .field("deferred", &matches!(self.syncer, Syncer::Deferred(_)))
            .finish()
    }
}

impl BookStore {
    /// Start configuring a store over `storage`.
    pub fn builder<S: Storage + 'static>(storage: Arc<S>) -> BookStoreBuilder {
        BookStoreBuilder {
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            sync_mode: SyncMode::default(),
        }
    }

    /// Open a store with the default key and deferred sync.
    pub fn open<S: Storage + 'static>(storage: Arc<S>) -> Self {
        Self::builder(storage).open()
    }

    /// All books in insertion order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// The storage key this store persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Look up a book by id.
    pub fn get_book_by_id(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    /// Append `book` to the end of the collection.
    ///
    /// The caller owns id uniqueness; nothing here checks for duplicates.
    pub fn add_book(&mut self, book: Book) -> Result<()> {
        self.books.push(book);
        self.sync()
    }

    /// Merge `update` into the book with id `id`.
    ///
    /// Returns `Ok(false)` without writing anything if no book has that id.
    /// An empty update on an existing book also writes nothing.
    pub fn update_book(&mut self, id: &str, update: BookUpdate) -> Result<bool> {
        let Some(book) = self.books.iter_mut().find(|book| book.id == id) else {
            return Ok(false);
        };
        if update.is_empty() {
            return Ok(true);
        }
        update.apply(book);
        self.sync()?;
        Ok(true)
    }

    /// Remove the book with id `id`, keeping the order of the rest.
    ///
    /// Returns the removed book, or `None` (and writes nothing) if absent.
    pub fn delete_book(&mut self, id: &str) -> Result<Option<Book>> {
        let Some(index) = self.books.iter().position(|book| book.id == id) else {
            return Ok(None);
        };
        let removed = self.books.remove(index);
        self.sync()?;
        Ok(Some(removed))
    }

    /// Append a reading session to a book's logs.
    ///
    /// Returns `Ok(false)` without writing if the book does not exist.
    pub fn add_log(&mut self, book_id: &str, log: ReadingLog) -> Result<bool> {
        let Some(book) = self.books.iter_mut().find(|book| book.id == book_id) else {
            return Ok(false);
        };
        book.logs.push(log);
        self.sync()?;
        Ok(true)
    }

    /// Remove one reading session from a book's logs.
    ///
    /// Returns `Ok(false)` without writing if the book or the log is missing.
    pub fn remove_log(&mut self, book_id: &str, log_id: &str) -> Result<bool> {
        let Some(book) = self.books.iter_mut().find(|book| book.id == book_id) else {
            return Ok(false);
        };
        let Some(index) = book.logs.iter().position(|log| log.id == log_id) else {
            return Ok(false);
        };
        book.logs.remove(index);
        self.sync()?;
        Ok(true)
    }

    /// Dashboard counts over the current collection.
    pub fn stats(&self) -> DashboardStats {
        stats::compute_stats(&self.books)
    }

    /// Books being read, with progress.
    pub fn in_progress(&self) -> Vec<InProgress<'_>> {
        stats::compute_in_progress(&self.books)
    }

    /// Books matching a search query and status filter.
    pub fn filter(&self, query: &str, status: StatusFilter) -> Vec<&Book> {
        filter::filter_books(&self.books, query, status)
    }

    /// Wait until every write enqueued so far has reached storage.
    ///
    /// Returns the first write failure since the last flush, if any. In
    /// [`SyncMode::Immediate`] there is never anything to wait for.
    pub fn flush(&self) -> Result<()> {
        match &self.syncer {
            Syncer::Immediate => Ok(()),
            Syncer::Deferred(worker) => worker.flush(),
        }
    }

    /// Flush, then replace the in-memory collection with what storage holds.
    ///
    /// Uses the same recovery rules as opening: missing or malformed data
    /// leaves the store empty.
    pub fn reload(&mut self) -> Result<()> {
        self.flush()?;
        self.books = load_books(self.storage.as_ref(), &self.key);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        let json = serde_json::to_string(&self.books)?;
        match &self.syncer {
            Syncer::Immediate => {
                self.storage.set(&self.key, &json)?;
                log::debug!("booklog: synced {} books to '{}'", self.books.len(), self.key);
                Ok(())
            }
            Syncer::Deferred(worker) => worker.enqueue(json),
        }
    }
}

fn load_books(storage: &dyn Storage, key: &str) -> Vec<Book> {
    let stored = match storage.get(key) {
        Ok(Some(stored)) if !stored.is_empty() => stored,
        Ok(_) => return Vec::new(),
        Err(e) => {
            log::warn!("booklog: failed to read '{key}' from storage, starting empty: {e}");
            return Vec::new();
        }
    };

    match serde_json::from_str(&stored) {
        Ok(books) => books,
        Err(e) => {
            log::warn!("booklog: stored value for '{key}' is malformed, starting empty: {e}");
            Vec::new()
        }
    }
}

enum Syncer {
    Immediate,
    Deferred(SyncWorker),
}

enum Job {
    Write(String),
    Flush(Sender<()>),
}

/// Background thread applying snapshot writes in the order they were enqueued.
struct SyncWorker {
    tx: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
    failure: Arc<Mutex<Option<io::Error>>>,
}

impl SyncWorker {
    fn spawn(storage: Arc<dyn Storage>, key: String) -> Self {
        let (tx, rx) = mpsc::channel();
        let failure = Arc::new(Mutex::new(None));
        let worker_failure = Arc::clone(&failure);
        let handle = thread::spawn(move || run_worker(rx, storage.as_ref(), &key, &worker_failure));
        SyncWorker {
            tx: Some(tx),
            handle: Some(handle),
            failure,
        }
    }

    fn send(&self, job: Job) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(StoreError::SyncStopped)?
            .send(job)
            .map_err(|_| StoreError::SyncStopped)
    }

    fn enqueue(&self, json: String) -> Result<()> {
        self.send(Job::Write(json))?;
        self.take_failure()
    }

    fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(Job::Flush(ack_tx))?;
        ack_rx.recv().map_err(|_| StoreError::SyncStopped)?;
        self.take_failure()
    }

    fn take_failure(&self) -> Result<()> {
        let failure = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match failure {
            Some(e) => Err(StoreError::Io(e)),
            None => Ok(()),
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("booklog: sync worker panicked");
            }
        }
    }
}

fn run_worker(
    rx: Receiver<Job>,
    storage: &dyn Storage,
    key: &str,
    failure: &Mutex<Option<io::Error>>,
) {
    for job in rx {
        match job {
            Job::Write(json) => match storage.set(key, &json) {
                Ok(()) => log::debug!("booklog: synced {} bytes to '{key}'", json.len()),
                Err(e) => {
                    log::error!("booklog: failed to write '{key}' to storage: {e}");
                    let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
                    if slot.is_none() {
                        *slot = Some(e);
                    }
                }
            },
            Job::Flush(ack) => {
                // The flusher may have given up waiting; nothing to do then.
                let _ = ack.send(());
            }
        }
    }
}
