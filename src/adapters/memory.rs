//! In-memory collaborators
//!
//! Fakes for [`RecordSource`], [`LedgerStore`] and [`ExportSink`] with
//! failure injection. Used throughout the test suite.

use super::traits::{ExportSink, LedgerStore, RecordSource, UploadReceipt};
use crate::domain::{
    LedgerError, RecordId, RecordTable, Result, SinkError, SourceError, SourceFilter,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Record source returning a fixed table
pub struct StaticRecordSource {
    table: Mutex<RecordTable>,
    failure: Mutex<Option<String>>,
    fetches: AtomicUsize,
}

impl StaticRecordSource {
    pub fn new(table: RecordTable) -> Self {
        Self {
            table: Mutex::new(table),
            failure: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the table returned by later fetches
    pub fn replace(&self, table: RecordTable) {
        *lock(&self.table) = table;
    }

    /// Make every later fetch fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for StaticRecordSource {
    async fn fetch(&self, _filter: &SourceFilter) -> Result<RecordTable> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = lock(&self.failure).clone() {
            return Err(SourceError::ConnectionFailed(message).into());
        }
        Ok(lock(&self.table).clone())
    }

    fn describe(&self) -> String {
        "memory source".to_string()
    }
}

/// Ledger store backed by a vector
#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<Vec<String>>,
    load_failure: Mutex<Option<String>>,
    fail_appends_from: Mutex<Option<usize>>,
    append_calls: AtomicUsize,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with raw values
    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    /// Snapshot of all stored values in storage order
    pub fn entries(&self) -> Vec<String> {
        lock(&self.entries).clone()
    }

    /// Number of append calls made, failed ones included
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Make every later load fail with `message`
    pub fn fail_loads(&self, message: impl Into<String>) {
        *lock(&self.load_failure) = Some(message.into());
    }

    /// Fail the `call`-th append (1-based) and every one after it
    pub fn fail_appends_from(&self, call: usize) {
        *lock(&self.fail_appends_from) = Some(call);
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self) -> Result<Vec<String>> {
        if let Some(message) = lock(&self.load_failure).clone() {
            return Err(LedgerError::ReadFailed(message).into());
        }
        Ok(self.entries())
    }

    async fn append(&self, ids: &[RecordId]) -> Result<()> {
        let call = self.append_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(from) = *lock(&self.fail_appends_from) {
            if call >= from {
                return Err(LedgerError::WriteFailed(format!(
                    "injected failure on append call {call}"
                ))
                .into());
            }
        }
        lock(&self.entries).extend(ids.iter().map(|id| id.as_str().to_string()));
        Ok(())
    }

    fn describe(&self) -> String {
        "memory ledger".to_string()
    }
}

/// An artifact received by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub name: String,
    pub destination: String,
    pub bytes: Vec<u8>,
}

/// Sink keeping uploaded artifacts in memory
#[derive(Default)]
pub struct MemorySink {
    stored: Mutex<Vec<StoredArtifact>>,
    failing_attempts: Mutex<HashSet<usize>>,
    attempts: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the `attempt`-th upload (1-based)
    pub fn fail_on_attempt(&self, attempt: usize) {
        lock(&self.failing_attempts).insert(attempt);
    }

    /// Artifacts accepted so far, in upload order
    pub fn stored(&self) -> Vec<StoredArtifact> {
        lock(&self.stored).clone()
    }

    /// Number of uploads attempted, rejected ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn upload(&self, artifact: &Path, destination: &str) -> Result<UploadReceipt> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if lock(&self.failing_attempts).contains(&attempt) {
            return Err(SinkError::Rejected {
                status: 503,
                message: format!("injected failure on upload attempt {attempt}"),
            }
            .into());
        }

        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| SinkError::PublishFailed("artifact path has no file name".into()))?;
        let bytes = tokio::fs::read(artifact).await?;

        lock(&self.stored).push(StoredArtifact {
            name: name.clone(),
            destination: destination.to_string(),
            bytes,
        });

        Ok(UploadReceipt {
            location: format!("memory://{destination}/{name}"),
        })
    }

    fn describe(&self) -> String {
        "memory sink".to_string()
    }
}
