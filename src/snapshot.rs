use crate::errors::{poisoned, AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockWriteGuard};

/// A row kept in a [`SnapshotTable`], keyed by its integer id.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> i64;
}

#[derive(Debug)]
struct TableState<T> {
    records: HashMap<i64, T>,
    max_id: i64,
}

/// Records kept in memory and mirrored to one JSON array on disk.
///
/// Every mutation rewrites the whole snapshot while holding the write lock,
/// and is rolled back in memory if the write fails. The highest id ever
/// issued lives in `<path>.seq`, so deleting the newest record and restarting
/// never hands its id out again.
#[derive(Debug)]
pub struct SnapshotTable<T> {
    path: PathBuf,
    seq_path: PathBuf,
    label: &'static str,
    state: RwLock<TableState<T>>,
}

impl<T: Record> SnapshotTable<T> {
    pub fn open(path: &Path, label: &'static str) -> AppResult<Self> {
        let records = load_records::<T>(path, label)?;
        let seq_path = sibling(path, ".seq");
        let highest_stored = records.keys().copied().max().unwrap_or(0);
        let max_id = load_sequence(&seq_path)?.max(highest_stored);
        tracing::info!(path = %path.display(), table = label, records = records.len(), max_id, "loaded snapshot");

        Ok(Self {
            path: path.to_path_buf(),
            seq_path,
            label,
            state: RwLock::new(TableState { records, max_id }),
        })
    }

    /// Every record, ascending by id.
    pub fn all(&self) -> AppResult<Vec<T>> {
        let state = self.state.read().map_err(|_| poisoned(self.label))?;
        let mut records: Vec<T> = state.records.values().cloned().collect();
        records.sort_by_key(|record| record.id());
        Ok(records)
    }

    pub fn get(&self, id: i64) -> AppResult<Option<T>> {
        let state = self.state.read().map_err(|_| poisoned(self.label))?;
        Ok(state.records.get(&id).cloned())
    }

    /// Allocates the next id and stores whatever `build` makes for it.
    pub fn insert_with(&self, build: impl FnOnce(i64) -> T) -> AppResult<T> {
        let mut state = self.write()?;
        let id = state
            .max_id
            .checked_add(1)
            .ok_or_else(|| AppError::Storage(format!("{} id space exhausted", self.label)))?;
        // ids are never handed out twice, even if this write fails
        state.max_id = id;

        let record = build(id);
        state.records.insert(id, record.clone());
        if let Err(error) = self.persist(&state) {
            state.records.remove(&id);
            return Err(error);
        }
        Ok(record)
    }

    /// Replaces record `id` with `edit(current)`. `Ok(None)` when absent.
    pub fn replace_with(&self, id: i64, edit: impl FnOnce(&T) -> T) -> AppResult<Option<T>> {
        let mut state = self.write()?;
        let Some(previous) = state.records.get(&id).cloned() else {
            return Ok(None);
        };

        let record = edit(&previous);
        state.records.insert(id, record.clone());
        if let Err(error) = self.persist(&state) {
            state.records.insert(id, previous);
            return Err(error);
        }
        Ok(Some(record))
    }

    /// `Ok(false)` when there was nothing to remove.
    pub fn remove(&self, id: i64) -> AppResult<bool> {
        let mut state = self.write()?;
        let Some(previous) = state.records.remove(&id) else {
            return Ok(false);
        };

        if let Err(error) = self.persist(&state) {
            state.records.insert(id, previous);
            return Err(error);
        }
        Ok(true)
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, TableState<T>>> {
        self.state.write().map_err(|_| poisoned(self.label))
    }

    /// The sequence goes first so the file on disk never holds an id above it.
    fn persist(&self, state: &TableState<T>) -> AppResult<()> {
        write_atomically(&self.seq_path, state.max_id.to_string().as_bytes())?;

        let mut records: Vec<&T> = state.records.values().collect();
        records.sort_by_key(|record| record.id());
        write_atomically(&self.path, &serde_json::to_vec_pretty(&records)?)
    }
}

fn load_records<T: Record>(path: &Path, label: &str) -> AppResult<HashMap<i64, T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(error) => {
            return Err(AppError::Storage(format!(
                "failed to read {} file {}: {}",
                label,
                path.display(),
                error
            )))
        }
    };

    match serde_json::from_slice::<Vec<T>>(&bytes) {
        Ok(records) => Ok(records.into_iter().map(|record| (record.id(), record)).collect()),
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                table = label,
                error = %error,
                "snapshot file is corrupt; starting empty"
            );
            Ok(HashMap::new())
        }
    }
}

fn load_sequence(path: &Path) -> AppResult<i64> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(0),
        Err(error) => {
            return Err(AppError::Storage(format!(
                "failed to read id sequence {}: {}",
                path.display(),
                error
            )))
        }
    };

    match raw.trim().parse::<i64>() {
        Ok(value) => Ok(value.max(0)),
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "id sequence is unreadable; using stored ids");
            Ok(0)
        }
    }
}

/// Writes to a sibling temp file, fsyncs it and renames it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| AppError::Storage(error.to_string()))?;
    }

    let tmp_path = sibling(path, ".tmp");
    let mut file = File::create(&tmp_path).map_err(|error| AppError::Storage(error.to_string()))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|error| AppError::Storage(error.to_string()))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|error| AppError::Storage(error.to_string()))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}
