//! Durable snapshot storage.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::PersistenceError;
use crate::snapshot::Snapshot;

/// Current on-disk envelope version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Where snapshots survive restarts.
pub trait SnapshotPersistence: Send + Sync {
    /// Load the last saved snapshot, `None` if nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Save a snapshot, replacing the previous one.
    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;
}

/// On-disk envelope
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSnapshot {
    version: u32,
    data: Snapshot,
    last_sync_time: Option<DateTime<Utc>>,
    saved_at: DateTime<Utc>,
}

/// Pretty-printed JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotPersistence for JsonFilePersistence {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: PersistedSnapshot = serde_json::from_str(&content)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                expected: SNAPSHOT_VERSION,
                actual: envelope.version,
            });
        }

        let mut snapshot = envelope.data;
        if snapshot.last_sync_time.is_none() {
            snapshot.last_sync_time = envelope.last_sync_time;
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        let envelope = PersistedSnapshot {
            version: SNAPSHOT_VERSION,
            data: snapshot.clone(),
            last_sync_time: snapshot.last_sync_time,
            saved_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_file_atomic(&self.path, &bytes)?;
        tracing::debug!("Saved snapshot to {:?}", self.path);
        Ok(())
    }
}

/// Write through a temp file in the destination directory, then rename, so
/// a crash mid-write leaves the previous file intact.
fn write_file_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.as_file_mut().write_all(bytes)?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    match tmp.persist(path) {
        Ok(_) => Ok(()),
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
            let _ = std::fs::remove_file(path);
            err.file.persist(path).map(|_| ()).map_err(|e| e.error)
        }
        Err(err) => Err(err.error),
    }
}

/// Keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    saved: Mutex<Option<Snapshot>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
        }
    }
}

impl SnapshotPersistence for MemoryPersistence {
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
        Ok(self
            .saved
            .lock()
            .map_err(|e| PersistenceError::Io(format!("Mutex poisoned: {}", e)))?
            .clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
        *self
            .saved
            .lock()
            .map_err(|e| PersistenceError::Io(format!("Mutex poisoned: {}", e)))? =
            Some(snapshot.clone());
        Ok(())
    }
}
