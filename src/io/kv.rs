use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};

/// Key of the persisted item sequence.
pub const STACK_KEY: &str = "todo-stack";
/// Key of the persisted settings record.
pub const SETTINGS_KEY: &str = "todo-stack-settings";

/// Error type for key-value storage
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("invalid key {0:?}")]
    InvalidKey(String),
}

/// Durable string storage addressed by key.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&mut self, key: &str) -> Result<(), KvError>;

    /// Called when the value stored under `key` could not be parsed and is
    /// about to be replaced by a default.
    fn report_unreadable(&mut self, key: &str, raw: &str, reason: &str) {
        tracing::warn!(key, reason, bytes = raw.len(), "discarding unreadable record");
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileKv { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(KvError::Read { path, source: e }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        if let Err(e) = recovery::atomic_write(&path, value.as_bytes()) {
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry::new(RecoveryCategory::Write, "record write failed")
                    .field("Key", key)
                    .field("Error", e.to_string())
                    .body(value),
            );
            return Err(KvError::Write { path, source: e });
        }
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(KvError::Write { path, source: e }),
        }
    }

    fn report_unreadable(&mut self, key: &str, raw: &str, reason: &str) {
        tracing::warn!(key, reason, "discarding unreadable record, see recovery log");
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry::new(RecoveryCategory::Load, "unreadable record replaced by default")
                .field("Key", key)
                .field("Error", reason)
                .body(raw),
        );
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Volatile store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
    /// Keys reported through `report_unreadable`, oldest first
    pub unreadable: Vec<String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KvError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KvError> {
        self.entries.remove(key);
        Ok(())
    }

    fn report_unreadable(&mut self, key: &str, _raw: &str, reason: &str) {
        tracing::warn!(key, reason, "discarding unreadable record");
        self.unreadable.push(key.to_string());
    }
}
