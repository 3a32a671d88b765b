//! File-backed key/value store
//!
//! Keeps all entries in a single JSON object on disk, e.g.
//! `~/.config/taskdeck/session.json`:
//!
//! ```json
//! { "token": "eyJ...", "user": "{\"id\":\"...\"}" }
//! ```
//!
//! The file holds a bearer token, so on Unix it is written with 0600
//! permissions. Tokens are never logged. Every write replaces the file by
//! renaming a fully written temp file over it, so a crash never leaves a
//! half-written file behind. A file that is unreadable anyway (edited by
//! hand, truncated by another tool) fails reads but is overwritten by the
//! next write.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

use super::{KeyValueStore, StorageError, StorageResult};

/// JSON-file-backed [`KeyValueStore`]
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    /// Like [`load`](Self::load), but an unparsable file counts as empty
    ///
    /// The flag is true when the file's contents were discarded.
    fn load_for_write(&self) -> StorageResult<(BTreeMap<String, String>, bool)> {
        match self.load() {
            Ok(entries) => Ok((entries, false)),
            Err(StorageError::Serialization(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    /// Replaces the file atomically: write a sibling temp file, then rename
    fn save(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let contents = serde_json::to_string_pretty(entries)?;

        // Created with 0600 on Unix; the rename keeps the mode
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(contents.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        Ok(())
    }

    fn update<F>(&self, mutate: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut entries, discarded) = self.load_for_write()?;
        let changed = mutate(&mut entries);
        if changed || discarded {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }
}
