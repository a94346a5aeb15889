//! Persisted resumption points for migration runs.
//!
//! A checkpoint marks the last safe resumption point of a run: the block
//! range being swept, the next chunk index inside that range, and how many
//! accounts have been confirmed so far. Advancing is monotonic; a failing
//! chunk never advances the checkpoint past itself, so a rerun resumes at
//! the failing chunk instead of restarting the sweep.

use crate::range::BlockRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// The persisted (block range, chunk offset) resumption point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCheckpoint {
    /// Identifies the sweep this checkpoint belongs to. A resumed invocation
    /// keeps the original run id.
    pub run_id: Uuid,
    /// Sub-range currently being processed.
    pub range: BlockRange,
    /// Index of the next chunk to submit within `range`.
    pub next_chunk: u64,
    /// Accounts confirmed migrated across the whole sweep so far.
    pub accounts_done: u64,
    pub updated_at: DateTime<Utc>,
}

impl MigrationCheckpoint {
    pub fn new(run_id: Uuid, range: BlockRange) -> Self {
        Self {
            run_id,
            range,
            next_chunk: 0,
            accounts_done: 0,
            updated_at: Utc::now(),
        }
    }

    /// Record a confirmed chunk of `accounts` accounts.
    pub fn record_chunk(&mut self, accounts: u64) {
        self.next_chunk += 1;
        self.accounts_done += accounts;
        self.updated_at = Utc::now();
    }

    /// Move to the next sub-range of the sweep. The new range must start
    /// where the finished one ended, keeping the sweep contiguous.
    pub fn advance_range(&mut self, next: BlockRange) -> Result<(), CheckpointError> {
        if next.start != self.range.end {
            return Err(CheckpointError::DiscontiguousRange {
                finished_end: self.range.end,
                next_start: next.start,
            });
        }
        self.range = next;
        self.next_chunk = 0;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Errors reading or writing checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Checkpoint store lock poisoned")]
    LockPoisoned,
    #[error("Next range starts at {next_start}, expected {finished_end}")]
    DiscontiguousRange { finished_end: u64, next_start: u64 },
    #[error("Checkpoint range starting at {start} does not align with the sweep's sub-ranges")]
    MisalignedRange { start: u64 },
}

/// Persistence seam for checkpoints. The driver saves after every confirmed
/// chunk; the orchestrator loads on startup to resume.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<MigrationCheckpoint>, CheckpointError>;
    fn save(&self, checkpoint: &MigrationCheckpoint) -> Result<(), CheckpointError>;
}

/// File-backed store writing pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load(&self) -> Result<Option<MigrationCheckpoint>, CheckpointError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let checkpoint = serde_json::from_str::<MigrationCheckpoint>(&contents)?;
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &MigrationCheckpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(checkpoint)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    inner: Mutex<Option<MigrationCheckpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self) -> Result<Option<MigrationCheckpoint>, CheckpointError> {
        let guard = self.inner.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, checkpoint: &MigrationCheckpoint) -> Result<(), CheckpointError> {
        let mut guard = self.inner.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        *guard = Some(checkpoint.clone());
        Ok(())
    }
}
