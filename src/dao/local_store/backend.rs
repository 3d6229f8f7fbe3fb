//! Synchronous key-value backends underneath the local stats store.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use thiserror::Error;

/// Convenient result alias returning [`LocalStoreError`] failures.
pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

/// Failures raised by a key-value backend. They never leave the local stats store.
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// Filesystem access failed.
    #[error("local storage I/O failed for `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The backend refuses writes (quota exhausted or storage disabled).
    #[error("local storage rejected write for key `{key}`")]
    WriteRejected { key: String },
    /// The value could not be serialized.
    #[error("failed to encode local record `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw string storage keyed by record name.
pub trait KeyValueBackend: Send + Sync {
    /// Read the raw value for `key`, `None` when nothing is stored.
    fn read(&self, key: &str) -> LocalStoreResult<Option<String>>;
    /// Replace the raw value for `key`.
    fn write(&self, key: &str, value: &str) -> LocalStoreResult<()>;
    /// Delete the value for `key`; deleting a missing key succeeds.
    fn remove(&self, key: &str) -> LocalStoreResult<()>;
}

/// One JSON file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> LocalStoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| LocalStoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueBackend for FileBackend {
    fn read(&self, key: &str) -> LocalStoreResult<Option<String>> {
        let path = self.path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LocalStoreError::Io { path, source }),
        }
    }

    fn write(&self, key: &str, value: &str) -> LocalStoreResult<()> {
        // Replace through a sibling temp file.
        let path = self.path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).map_err(|source| LocalStoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| LocalStoreError::Io { path, source })
    }

    fn remove(&self, key: &str) -> LocalStoreResult<()> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LocalStoreError::Io { path, source }),
        }
    }
}

/// Process-memory backend used when no data directory is usable, and by tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
}

impl MemoryBackend {
    /// Empty backend accepting writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as a full or disabled storage would.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Store a raw value bypassing serialization.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

impl KeyValueBackend for MemoryBackend {
    fn read(&self, key: &str) -> LocalStoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> LocalStoreResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(LocalStoreError::WriteRejected {
                key: key.to_string(),
            });
        }
        self.insert_raw(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> LocalStoreResult<()> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(LocalStoreError::WriteRejected {
                key: key.to_string(),
            });
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}
