//! Collaborator traits
//!
//! The core talks to the outside world only through these three traits, each
//! injected as an `Arc<dyn Trait>` so tests can substitute the in-memory
//! fakes from [`crate::adapters::memory`].

use crate::domain::{RecordId, RecordTable, Result, SourceFilter};
use async_trait::async_trait;
use std::path::Path;

/// Source of candidate records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch the candidate records for a query window
    ///
    /// Row order must be stable for a given filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached, the query fails, or
    /// the result has no usable identifier column.
    async fn fetch(&self, filter: &SourceFilter) -> Result<RecordTable>;

    /// Human-readable description for logs and status output
    fn describe(&self) -> String;
}

/// Durable storage behind the ledger
///
/// The store is a single column of identifier strings. It only ever grows.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read every stored value in storage order
    ///
    /// Values are returned raw: they may contain blanks or duplicates left by
    /// earlier anomalies. [`crate::core::ledger::Ledger`] cleans them up.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or malformed.
    async fn load(&self) -> Result<Vec<String>>;

    /// Append identifiers at the end of the store without deduplication
    ///
    /// # Errors
    ///
    /// Returns an error if the append could not be confirmed.
    async fn append(&self, ids: &[RecordId]) -> Result<()>;

    /// Human-readable description for logs and status output
    fn describe(&self) -> String;
}

/// Confirmation returned by a sink after a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Where the artifact can be found (path, file ID, URL)
    pub location: String,
}

/// Destination for batch artifacts
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Upload a local artifact into a destination folder
    ///
    /// The artifact keeps its file name. On error no file with that name may
    /// be left looking complete at the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink rejects the artifact or cannot be reached.
    async fn upload(&self, artifact: &Path, destination: &str) -> Result<UploadReceipt>;

    /// Human-readable description for logs and status output
    fn describe(&self) -> String;
}
