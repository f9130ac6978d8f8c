//! Append-only audit trail of terminal analysis results

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eza_types::{AnalysisMode, CanonicalResult, EzaError, EzaResult, RequestId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// One recorded terminal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the trail, starting at 1.
    pub sequence: u64,
    pub request_id: RequestId,
    pub mode: AnalysisMode,
    pub recorded_at: DateTime<Utc>,
    pub result: CanonicalResult,
}

/// Append-only log of successful terminal results.
///
/// Records keep insertion order and are never reordered or mutated after
/// append. Readers only ever get snapshots.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Append a result, returning the stored record.
    async fn append(
        &self,
        request_id: RequestId,
        mode: AnalysisMode,
        result: CanonicalResult,
    ) -> EzaResult<AuditRecord>;

    /// Snapshot of every record, oldest first.
    async fn records(&self) -> EzaResult<Vec<AuditRecord>>;

    /// Number of records appended so far.
    async fn len(&self) -> EzaResult<u64>;

    async fn is_empty(&self) -> EzaResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// In-memory audit trail.
#[derive(Debug, Default)]
pub struct MemoryAuditTrail {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results only, oldest first.
    pub fn results(&self) -> Vec<CanonicalResult> {
        self.records.read().iter().map(|r| r.result.clone()).collect()
    }
}

#[async_trait]
impl AuditTrail for MemoryAuditTrail {
    async fn append(
        &self,
        request_id: RequestId,
        mode: AnalysisMode,
        result: CanonicalResult,
    ) -> EzaResult<AuditRecord> {
        let mut records = self.records.write();
        let record = AuditRecord {
            sequence: records.len() as u64 + 1,
            request_id,
            mode,
            recorded_at: Utc::now(),
            result,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn records(&self) -> EzaResult<Vec<AuditRecord>> {
        Ok(self.records.read().clone())
    }

    async fn len(&self) -> EzaResult<u64> {
        Ok(self.records.read().len() as u64)
    }
}

/// Audit trail persisted as JSON lines, one record per line.
pub struct FileAuditTrail {
    path: PathBuf,
    next_sequence: Mutex<u64>,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileAuditTrail {
    /// Open a trail file, continuing the sequence of any existing records.
    pub async fn open(path: impl Into<PathBuf>) -> EzaResult<Self> {
        let path = path.into();
        let existing = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            read_records(&path).await?.len() as u64
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
            0
        };

        Ok(Self {
            path,
            next_sequence: Mutex::new(existing + 1),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditTrail for FileAuditTrail {
    async fn append(
        &self,
        request_id: RequestId,
        mode: AnalysisMode,
        result: CanonicalResult,
    ) -> EzaResult<AuditRecord> {
        let _guard = self.write_lock.lock().await;
        let sequence = *self.next_sequence.lock();
        let record = AuditRecord {
            sequence,
            request_id,
            mode,
            recorded_at: Utc::now(),
            result,
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(io_error)?;
        file.write_all(line.as_bytes()).await.map_err(io_error)?;
        file.flush().await.map_err(io_error)?;

        *self.next_sequence.lock() = sequence + 1;
        Ok(record)
    }

    async fn records(&self) -> EzaResult<Vec<AuditRecord>> {
        // Appends write a line in pieces; never read one half written.
        let _guard = self.write_lock.lock().await;
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        read_records(&self.path).await
    }

    async fn len(&self) -> EzaResult<u64> {
        Ok(*self.next_sequence.lock() - 1)
    }
}

async fn read_records(path: &Path) -> EzaResult<Vec<AuditRecord>> {
    let file = File::open(path).await.map_err(io_error)?;
    let mut lines = BufReader::new(file).lines();
    let mut records = Vec::new();
    while let Some(line) = lines.next_line().await.map_err(io_error)? {
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

fn io_error(err: std::io::Error) -> EzaError {
    EzaError::TransportFailure(format!("audit trail I/O: {}", err))
}
