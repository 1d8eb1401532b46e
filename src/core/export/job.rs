//! Export jobs: one serialize-and-upload attempt per batch
//!
//! A job moves `Pending -> Uploading -> Succeeded` or
//! `Pending -> Uploading -> Failed`. The exporter never retries.

use super::artifact::{artifact_name, checksum, serialize_batch, stage_artifact, ArtifactInfo};
use super::batch::Batch;
use crate::adapters::traits::ExportSink;
use crate::config::{ArtifactFormat, TallyConfig};
use crate::domain::{Identity, Result};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lifecycle state of an [`ExportJob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Uploading,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn can_advance_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Uploading)
                | (JobState::Uploading, JobState::Succeeded)
                | (JobState::Uploading, JobState::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Pending => "pending",
            JobState::Uploading => "uploading",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Tracks the state of one batch export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    batch_index: usize,
    history: Vec<JobState>,
}

impl ExportJob {
    pub fn new(batch_index: usize) -> Self {
        Self {
            batch_index,
            history: vec![JobState::Pending],
        }
    }

    pub fn batch_index(&self) -> usize {
        self.batch_index
    }

    pub fn state(&self) -> JobState {
        self.history.last().copied().unwrap_or(JobState::Pending)
    }

    /// Every state the job has been in, oldest first
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state().can_advance_to(next),
            "invalid job transition {} -> {}",
            self.state(),
            next
        );
        tracing::debug!(batch = self.batch_index, from = %self.state(), to = %next, "Export job transition");
        self.history.push(next);
    }
}

/// Result of an [`ExportJob`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Succeeded(ArtifactInfo),
    Failed(String),
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Succeeded(_))
    }
}

/// Settings shared by every job of a run
#[derive(Debug, Clone)]
pub struct ExporterSettings {
    pub identity: Identity,
    pub run_date: NaiveDate,
    pub format: ArtifactFormat,
    pub destination: String,
    pub staging_dir: PathBuf,
    pub retain_local_artifacts: bool,
}

impl ExporterSettings {
    pub fn from_config(config: &TallyConfig, identity: Identity, run_date: NaiveDate) -> Self {
        Self {
            identity,
            run_date,
            format: config.sink.format,
            destination: config.sink.destination.clone(),
            staging_dir: PathBuf::from(&config.sink.staging_dir),
            retain_local_artifacts: config.sink.retain_local_artifacts,
        }
    }
}

/// Serializes batches and uploads them to the sink
pub struct Exporter {
    sink: Arc<dyn ExportSink>,
    settings: ExporterSettings,
}

impl Exporter {
    pub fn new(sink: Arc<dyn ExportSink>, settings: ExporterSettings) -> Self {
        Self { sink, settings }
    }

    pub fn settings(&self) -> &ExporterSettings {
        &self.settings
    }

    /// Serialize and stage `batch` locally without uploading it
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the staging write fails.
    pub async fn stage(&self, batch: &Batch) -> Result<ArtifactInfo> {
        let name = artifact_name(
            &self.settings.identity,
            self.settings.run_date,
            batch.index,
            self.settings.format,
        );
        let bytes = serialize_batch(batch, self.settings.format)?;
        let path = stage_artifact(&self.settings.staging_dir, &name, &bytes).await?;
        let name = path
            .file_name()
            .map_or(name, |staged| staged.to_string_lossy().into_owned());

        Ok(ArtifactInfo {
            batch_index: batch.index,
            name,
            rows: batch.len(),
            checksum: checksum(&bytes),
            first_id: batch.first_id().cloned(),
            last_id: batch.last_id().cloned(),
            local_path: Some(path),
            location: None,
        })
    }

    /// Export one batch
    pub async fn export(&self, batch: &Batch) -> ExportOutcome {
        let mut job = ExportJob::new(batch.index);
        self.run(&mut job, batch).await
    }

    /// Drive `job` through its lifecycle for `batch`
    pub async fn run(&self, job: &mut ExportJob, batch: &Batch) -> ExportOutcome {
        job.advance(JobState::Uploading);

        let mut info = match self.stage(batch).await {
            Ok(info) => info,
            Err(e) => {
                job.advance(JobState::Failed);
                return ExportOutcome::Failed(e.to_string());
            }
        };
        let staged = info.local_path.clone().unwrap_or_default();

        match self.sink.upload(&staged, &self.settings.destination).await {
            Ok(receipt) => {
                info.location = Some(receipt.location);
                if !self.settings.retain_local_artifacts {
                    discard(&staged).await;
                    info.local_path = None;
                }
                job.advance(JobState::Succeeded);
                tracing::info!(
                    batch = batch.index,
                    artifact = %info.name,
                    rows = info.rows,
                    checksum = %info.checksum,
                    location = info.location.as_deref().unwrap_or_default(),
                    "Batch exported"
                );
                ExportOutcome::Succeeded(info)
            }
            Err(e) => {
                discard(&staged).await;
                job.advance(JobState::Failed);
                tracing::error!(batch = batch.index, artifact = %info.name, error = %e, "Batch upload failed");
                ExportOutcome::Failed(e.to_string())
            }
        }
    }
}

pub(super) async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged artifact");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySink;
    use crate::domain::RecordTable;
    use tempfile::TempDir;

    fn batch(index: usize) -> Batch {
        let table = RecordTable::from_rows(
            vec!["ID".to_string()],
            "ID",
            vec![vec![Some("1".into())], vec![Some("2".into())]],
        )
        .unwrap();
        Batch {
            index,
            columns: table.shared_columns(),
            records: table.into_records(),
        }
    }

    fn exporter(sink: Arc<MemorySink>, staging: &Path, retain: bool) -> Exporter {
        Exporter::new(
            sink,
            ExporterSettings {
                identity: Identity::unchecked("ALICE").unwrap(),
                run_date: NaiveDate::from_ymd_opt(2025, 5, 4).unwrap(),
                format: ArtifactFormat::Csv,
                destination: "folder".to_string(),
                staging_dir: staging.to_path_buf(),
                retain_local_artifacts: retain,
            },
        )
    }

    #[test]
    fn test_job_transitions() {
        assert!(JobState::Pending.can_advance_to(JobState::Uploading));
        assert!(JobState::Uploading.can_advance_to(JobState::Succeeded));
        assert!(JobState::Uploading.can_advance_to(JobState::Failed));
        assert!(!JobState::Pending.can_advance_to(JobState::Succeeded));
        assert!(!JobState::Failed.can_advance_to(JobState::Uploading));
        assert!(JobState::Failed.is_terminal());
    }

    #[tokio::test]
    async fn test_successful_job() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        let exporter = exporter(sink.clone(), dir.path(), true);

        let mut job = ExportJob::new(2);
        let outcome = exporter.run(&mut job, &batch(2)).await;

        assert_eq!(
            job.history(),
            &[JobState::Pending, JobState::Uploading, JobState::Succeeded]
        );
        let ExportOutcome::Succeeded(info) = outcome else {
            panic!("expected success");
        };
        assert_eq!(info.name, "ALICE_2025-05-04_part2.csv");
        assert_eq!(info.location.as_deref(), Some("memory://folder/ALICE_2025-05-04_part2.csv"));
        assert!(dir.path().join("ALICE_2025-05-04_part2.csv").exists());
        assert_eq!(sink.stored()[0].bytes, b"ID\n1\n2\n");
    }

    #[tokio::test]
    async fn test_failed_job_removes_staged_artifact() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(MemorySink::new());
        sink.fail_on_attempt(1);
        let exporter = exporter(sink.clone(), dir.path(), true);

        let mut job = ExportJob::new(1);
        let outcome = exporter.run(&mut job, &batch(1)).await;

        assert_eq!(job.state(), JobState::Failed);
        assert!(matches!(outcome, ExportOutcome::Failed(ref cause) if cause.contains("503")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(sink.stored().is_empty());
    }

    #[tokio::test]
    async fn test_staged_artifact_dropped_when_not_retained() {
        let dir = TempDir::new().unwrap();
        let exporter = exporter(Arc::new(MemorySink::new()), dir.path(), false);

        let outcome = exporter.export(&batch(1)).await;

        let ExportOutcome::Succeeded(info) = outcome else {
            panic!("expected success");
        };
        assert!(info.local_path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
