//! Export planning and execution
//!
//! This module provides:
//! - Batch planning with randomized, bounded batch sizes
//! - Artifact serialization and atomic local staging
//! - Export jobs uploading one batch each
//! - Run coordination and the run summary

pub mod artifact;
pub mod batch;
pub mod coordinator;
pub mod job;
pub mod summary;

pub use artifact::{artifact_name, serialize_batch, ArtifactInfo};
pub use batch::{split_records, Batch, Batcher};
pub use coordinator::{ExportCoordinator, RunOptions};
pub use job::{ExportJob, ExportOutcome, Exporter, ExporterSettings, JobState};
pub use summary::{RunState, RunSummary};
