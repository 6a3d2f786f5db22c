//! Durable key-value storage backing the book store.
//!
//! The store only ever needs two things from storage: read one value and
//! overwrite one value. Values are whole JSON documents; there is no partial
//! update.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// The key the book collection lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "booklog-books";

/// A synchronous string key-value store.
///
/// Implementations must be shareable across threads: the store hands a clone
/// of its storage handle to the background writer.
pub trait Storage: Send + Sync {
    /// Read the value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Overwrite the value for `key`.
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

/// Controls whether [`FileStorage`] takes an exclusive lock on its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Exclusive advisory lock on `<dir>/.lock`, held until drop.
    #[default]
    Flock,
    /// No locking. The caller guarantees a single writer.
    None,
}

/// File-backed storage: each key is a JSON file in one directory.
///
/// Writes go to `<key>.json.tmp`, are synced, and then renamed over
/// `<key>.json`, so a crash mid-write leaves the previous value intact.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    // Held for its lock; released when dropped.
    _lock_file: Option<File>,
}

impl FileStorage {
    /// Open or create storage in `dir`, taking the directory lock.
    ///
    /// Fails with [`io::ErrorKind::AlreadyExists`] if another `FileStorage`
    /// already holds the lock.
    pub fn open(dir: impl AsRef<Path>) -> io::Result<Self> {
        Self::open_with_lock(dir, LockMode::Flock)
    }

    /// Open or create storage in `dir` with an explicit lock mode.
    pub fn open_with_lock(dir: impl AsRef<Path>, mode: LockMode) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock_file = match mode {
            LockMode::Flock => {
                let lock_path = dir.join(".lock");
                let file = OpenOptions::new()
                    .create(true)
                    .truncate(false)
                    .write(true)
                    .open(&lock_path)?;
                if file.try_lock_exclusive().is_err() {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!(
                            "another writer holds the lock on {}",
                            dir.display()
                        ),
                    ));
                }
                Some(file)
            }
            LockMode::None => None,
        };

        Ok(FileStorage {
            dir,
            _lock_file: lock_file,
        })
    }

    /// Returns the storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json.tmp"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let tmp_path = self.tmp_path_for(key);

        let mut file = File::create(&tmp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_data()?;
        drop(file);

        fs::rename(&tmp_path, self.path_for(key))
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    values: HashMap<String, String>,
    writes: Vec<(String, String)>,
    fail_writes: bool,
}

/// In-process storage, mainly for tests and embedding.
///
/// Besides holding values it keeps the history of every successful `set`
/// call, and can be switched into a mode where writes fail, which is how a
/// full disk or exceeded quota shows up to the store.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with one value.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage.lock().values.insert(key.into(), value.into());
        storage
    }

    /// Every successful `(key, value)` write so far, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes.len()
    }

    /// Forget the write history. Stored values are kept.
    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Make subsequent `set` calls fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    // A panic while holding the lock cannot leave the maps half-updated,
    // so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.lock().values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                format!("storage quota exceeded writing {key}"),
            ));
        }
        inner.values.insert(key.to_string(), value.to_string());
        inner.writes.push((key.to_string(), value.to_string()));
        Ok(())
    }
}
