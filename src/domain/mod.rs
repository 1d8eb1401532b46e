//! Domain models and types for Tally.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`RecordId`], [`Identity`])
//! - **Record models** ([`Record`], [`RecordTable`], [`SourceFilter`])
//! - **Error types** ([`TallyError`], [`SourceError`], [`LedgerError`],
//!   [`SinkError`], [`PipelineError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TallyError>`]:
//!
//! ```rust
//! use tally::domain::{Result, TallyError};
//!
//! fn example() -> Result<()> {
//!     Err(TallyError::Validation("min_rows must be positive".to_string()))
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{LedgerError, PipelineError, SinkError, SourceError, TallyError};
pub use ids::{Identity, RecordId};
pub use record::{Record, RecordTable, SourceFilter, DEFAULT_ID_COLUMN};
pub use result::Result;
