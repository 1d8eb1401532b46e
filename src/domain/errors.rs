//! Domain error types
//!
//! This module defines the error hierarchy for Tally. Adapter errors are
//! domain-specific and don't expose third-party types; the pipeline taxonomy
//! in [`PipelineError`] is what a run reports when it aborts.

use thiserror::Error;

/// Main Tally error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum TallyError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Record source errors
    #[error("Record source error: {0}")]
    Source(#[from] SourceError),

    /// Ledger store errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Export sink errors
    #[error("Export sink error: {0}")]
    Sink(#[from] SinkError),

    /// A pipeline stage failed and the run was aborted
    #[error("Run aborted: {0}")]
    Pipeline(#[from] PipelineError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Record source errors
///
/// Errors that occur while querying the database for candidate records.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to connect to the database
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The query result cannot be turned into a record table
    #[error("Invalid record data: {0}")]
    InvalidData(String),

    /// A result column has a type that cannot be rendered as text
    #[error("Unsupported type '{type_name}' in column '{column}', cast it to text in the query")]
    UnsupportedColumnType { column: String, type_name: String },
}

/// Ledger store errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger could not be read
    #[error("Failed to read ledger: {0}")]
    ReadFailed(String),

    /// The ledger was read but its content is not a valid ledger
    #[error("Malformed ledger: {0}")]
    Malformed(String),

    /// Appending identifiers failed
    #[error("Failed to append to ledger: {0}")]
    WriteFailed(String),
}

/// Export sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Failed to reach the sink
    #[error("Failed to connect to sink: {0}")]
    ConnectionFailed(String),

    /// The sink rejected the upload
    #[error("Upload rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// Staging or publishing the artifact failed
    #[error("Failed to publish artifact: {0}")]
    PublishFailed(String),

    /// The destination folder is missing or unusable
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
}

/// Failure taxonomy of an export run
///
/// Every variant carries enough context to diagnose which stage, batch and
/// identifier range were involved. None of them leaves the ledger in a state
/// other than "prefix of the successfully uploaded batches".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The record source could not be reached or the query failed
    #[error("record source unavailable: {cause}")]
    SourceUnavailable { cause: String },

    /// The ledger is unreachable or malformed; nothing was exported
    #[error("ledger unreadable: {cause}")]
    LedgerUnreadable { cause: String },

    /// Uploading one batch failed; later batches were not attempted
    #[error(
        "export of batch {batch_index}/{total_batches} (ids {first_id}..={last_id}) failed: {cause}"
    )]
    ExportFailure {
        batch_index: usize,
        total_batches: usize,
        first_id: String,
        last_id: String,
        cause: String,
    },

    /// Batches were uploaded but their identifiers could not be recorded
    #[error(
        "ledger append failed for batch(es) {batch_indices:?} (ids {first_id}..={last_id}): {cause}; these batches will be exported again by the next run"
    )]
    LedgerWriteFailure {
        batch_indices: Vec<usize>,
        first_id: String,
        last_id: String,
        cause: String,
    },
}

impl PipelineError {
    /// Short stable name of the failure kind, used in logs and status output
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceUnavailable { .. } => "SourceUnavailable",
            PipelineError::LedgerUnreadable { .. } => "LedgerUnreadable",
            PipelineError::ExportFailure { .. } => "ExportFailure",
            PipelineError::LedgerWriteFailure { .. } => "LedgerWriteFailure",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        TallyError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for TallyError {
    fn from(err: serde_json::Error) -> Self {
        TallyError::Serialization(err.to_string())
    }
}

// Conversion from csv::Error
impl From<csv::Error> for TallyError {
    fn from(err: csv::Error) -> Self {
        TallyError::Serialization(format!("CSV error: {err}"))
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for TallyError {
    fn from(err: toml::de::Error) -> Self {
        TallyError::Configuration(format!("TOML parse error: {err}"))
    }
}
