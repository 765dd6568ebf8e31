//! History storage
//!
//! Completed refinements are kept as a JSON array, newest first. Writes go
//! to a temp file in the same directory and are renamed into place while an
//! advisory lock is held, so a crash never leaves a half-written file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::PromptHistoryItem;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("History I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("History store lock poisoned")]
    Poisoned,
}

/// Persistence for completed refinements
pub trait HistoryStore: Send + Sync {
    /// Load every entry, newest first. A missing store is empty.
    fn load(&self) -> Result<Vec<PromptHistoryItem>, StoreError>;

    /// Replace the stored entries
    fn save(&self, items: &[PromptHistoryItem]) -> Result<(), StoreError>;
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "JsonHistoryStore::new: called");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// Where an unreadable history file is moved
    pub fn corrupt_path(&self) -> PathBuf {
        self.sibling(".corrupt")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Move an unparseable file out of the way; the next save starts fresh
    fn quarantine(&self) {
        let target = self.corrupt_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => warn!(from = ?self.path, to = ?target, "Moved unreadable history file aside"),
            Err(e) => warn!(path = ?self.path, error = %e, "Could not move unreadable history file"),
        }
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Open (creating) the lock file and hold an exclusive lock on it
    fn lock(&self) -> Result<File, StoreError> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| self.io_err(e))?;
        FileExt::lock_exclusive(&file).map_err(|e| self.io_err(e))?;
        Ok(file)
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self) -> Result<Vec<PromptHistoryItem>, StoreError> {
        debug!(path = ?self.path, "JsonHistoryStore::load: called");
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("JsonHistoryStore::load: no history file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_err(e)),
        };
        FileExt::lock_shared(&file).map_err(|e| self.io_err(e))?;
        let parsed: Result<Vec<PromptHistoryItem>, _> = serde_json::from_reader(BufReader::new(&file));
        let _ = FileExt::unlock(&file);
        drop(file);

        let items = parsed.map_err(|source| {
            self.quarantine();
            StoreError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(count = items.len(), "JsonHistoryStore::load: loaded");
        Ok(items)
    }

    fn save(&self, items: &[PromptHistoryItem]) -> Result<(), StoreError> {
        debug!(path = ?self.path, count = items.len(), "JsonHistoryStore::save: called");
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_err(e))?;

        let lock = self.lock()?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_err(e))?;
        serde_json::to_writer_pretty(&mut tmp, items).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        tmp.write_all(b"\n").map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;

        let _ = FileExt::unlock(&lock);
        info!(path = ?self.path, count = items.len(), "History saved");
        Ok(())
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    items: Mutex<Vec<PromptHistoryItem>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<PromptHistoryItem>) -> Self {
        Self {
            items: Mutex::new(items),
            saves: Mutex::new(0),
        }
    }

    /// Number of `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or_default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<PromptHistoryItem>, StoreError> {
        self.items.lock().map(|items| items.clone()).map_err(|_| StoreError::Poisoned)
    }

    fn save(&self, items: &[PromptHistoryItem]) -> Result<(), StoreError> {
        *self.items.lock().map_err(|_| StoreError::Poisoned)? = items.to_vec();
        *self.saves.lock().map_err(|_| StoreError::Poisoned)? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn item(idea: &str) -> PromptHistoryItem {
        PromptHistoryItem::new(idea, Vec::new(), vec![format!("prompt for {}", idea)])
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("nested").join("history.json"));

        let items = vec![item("second"), item("first")];
        store.save(&items).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, items);
        assert!(store.lock_path().exists());
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let store = JsonHistoryStore::new(dir.path().join("history.json"));

        store.save(&[item("a"), item("b")]).unwrap();
        store.save(&[item("c")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].idea, "c");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonHistoryStore::new(&path);
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));

        // The bad file is kept for inspection and no longer blocks loading
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(store.corrupt_path()).unwrap(), "{ not json");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_file_uses_camel_case_field_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        JsonHistoryStore::new(&path).save(&[item("idea")]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"originalPrompt\""));
        assert!(raw.contains("\"finalPrompts\""));
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryHistoryStore::new();
        store.save(&[item("x")]).unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
