//! Audit persistence for rotation records.
//!
//! The store is an abstract append/query boundary: the orchestrator writes
//! a record at `Initiated` (so even a crash mid-protocol leaves an
//! attempted trace) and updates it through its lifecycle; queries answer
//! "when was the last completed rotation" and "is rotation overdue".

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::core::StorageError;
use crate::rotation::record::{RotationId, RotationRecord, RotationStatus};

/// Durable, queryable store of rotation records, keyed by id and ordered by
/// rotation date.
pub trait AuditStore {
    /// Insert or update a record by its identifier.
    fn record(&self, record: &RotationRecord) -> Result<(), StorageError>;

    /// All records, ordered by `created_at` (oldest first), one entry per id.
    fn load(&self) -> Result<Vec<RotationRecord>, StorageError>;

    /// Look up a single record.
    fn find(&self, id: RotationId) -> Result<Option<RotationRecord>, StorageError> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    /// Most recent record with `Completed` status.
    fn latest_completed(&self) -> Result<Option<RotationRecord>, StorageError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| r.status == RotationStatus::Completed)
            .next_back())
    }

    /// Whether the current time is past the most recent completed
    /// rotation's due date. A store with no completed rotation is not
    /// overdue; it has nothing to be overdue against.
    fn is_overdue(&self, now: DateTime<Utc>) -> Result<bool, StorageError> {
        Ok(self
            .latest_completed()?
            .is_some_and(|r| r.is_overdue(now)))
    }
}

/// Append-only JSON-lines store on the local filesystem.
///
/// Every lifecycle change appends the full record as one line; on load the
/// latest line per id wins. The history file stays append-only and
/// greppable while still supporting the `Initiated` → terminal update flow.
#[derive(Debug, Clone)]
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    /// Store backed by the given history file (created on first write).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditStore for FileAuditStore {
    fn record(&self, record: &RotationRecord) -> Result<(), StorageError> {
        let wrap = |source: std::io::Error| StorageError::WriteFailure {
            path: self.path.clone(),
            source,
        };

        let mut line = serde_json::to_string(record)
            .map_err(|e| wrap(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        line.push('\n');

        let mut options = std::fs::OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(wrap)?;
        file.write_all(line.as_bytes()).map_err(wrap)?;
        file.flush().map_err(wrap)?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<RotationRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let wrap = |source: std::io::Error| StorageError::ReadFailure {
            path: self.path.clone(),
            source,
        };

        let text = std::fs::read_to_string(&self.path).map_err(wrap)?;

        // Latest line per id wins; insertion position keeps first-seen order.
        let mut by_id: IndexMap<RotationId, RotationRecord> = IndexMap::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let record: RotationRecord = serde_json::from_str(line)
                .map_err(|e| wrap(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
            by_id.insert(record.id, record);
        }

        let mut records: Vec<_> = by_id.into_values().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: RwLock<Vec<RotationRecord>>,
}

impl MemoryAuditStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for MemoryAuditStore {
    fn record(&self, record: &RotationRecord) -> Result<(), StorageError> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn load(&self) -> Result<Vec<RotationRecord>, StorageError> {
        let mut records = self.records.read().clone();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}
