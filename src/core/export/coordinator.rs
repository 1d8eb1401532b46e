//! Export coordinator - main orchestrator for an export run
//!
//! Sequences fetch, deduplication, batching, per-batch export and the ledger
//! commit:
//!
//! ```text
//! Fetching -> Deduplicating -> Batching -> Exporting(i of N) -> Committing -> Done
//!                                   any stage on failure ----------------> Aborted
//!                                   shutdown signal before a batch -------> Interrupted
//! ```
//!
//! A batch's identifiers are only appended after its upload succeeded.
//! With [`CommitPolicy::PerBatch`] that happens right after each upload;
//! with [`CommitPolicy::EndOfRun`] once exporting stops. Either way a failure
//! at batch `k` leaves batches `1..k-1` in the ledger and nothing after.
//!
//! An identifier whose rows span several batches is appended with the batch
//! holding its last row, so a failure never leaves part of its rows behind
//! an identifier that is already in the ledger.

use super::batch::{Batch, Batcher};
use super::job::{discard, ExportOutcome, Exporter, ExporterSettings};
use super::summary::{RunState, RunSummary};
use crate::adapters::factory::Collaborators;
use crate::adapters::traits::RecordSource;
use crate::config::{CommitPolicy, TallyConfig};
use crate::core::ledger::{dedupe, Ledger};
use crate::domain::{PipelineError, RecordId, RecordTable, Result, SourceFilter};
use crate::{log_batch_processing, log_error_with_context, log_run_complete};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Per-run settings
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub filter: SourceFilter,
    pub min_rows: usize,
    pub max_rows: usize,
    pub seed: Option<u64>,
    pub commit_policy: CommitPolicy,
    pub dry_run: bool,
    pub exporter: ExporterSettings,
}

impl RunOptions {
    /// Build the options of a run started on `today`
    ///
    /// # Errors
    ///
    /// Returns an error if no valid identity or date range can be resolved.
    pub fn from_config(config: &TallyConfig, today: NaiveDate) -> Result<Self> {
        let filter = config.selection.resolve_filter(today)?;
        Ok(Self {
            exporter: ExporterSettings::from_config(config, filter.identity.clone(), today),
            filter,
            min_rows: config.batching.min_rows,
            max_rows: config.batching.max_rows,
            seed: config.batching.seed,
            commit_policy: config.commit.policy,
            dry_run: config.application.dry_run,
        })
    }
}

/// Export coordinator
pub struct ExportCoordinator {
    source: Arc<dyn RecordSource>,
    ledger: Ledger,
    exporter: Exporter,
    batcher: Batcher,
    filter: SourceFilter,
    commit_policy: CommitPolicy,
    dry_run: bool,
    shutdown_signal: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Create a coordinator from explicit collaborators and options
    ///
    /// # Errors
    ///
    /// Returns a validation error if the batch bounds are invalid.
    pub fn new(
        collaborators: Collaborators,
        options: RunOptions,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Result<Self> {
        Ok(Self {
            batcher: Batcher::new(options.min_rows, options.max_rows, options.seed)?,
            source: collaborators.source,
            ledger: Ledger::new(collaborators.ledger),
            exporter: Exporter::new(collaborators.sink, options.exporter),
            filter: options.filter,
            commit_policy: options.commit_policy,
            dry_run: options.dry_run,
            shutdown_signal,
        })
    }

    /// Create a coordinator for `config`, starting on `today`
    pub fn from_config(
        config: &TallyConfig,
        collaborators: Collaborators,
        shutdown_signal: watch::Receiver<bool>,
        today: NaiveDate,
    ) -> Result<Self> {
        Self::new(
            collaborators,
            RunOptions::from_config(config, today)?,
            shutdown_signal,
        )
    }

    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// Execute one export run
    ///
    /// Failures are reported in the returned summary; the final state is
    /// [`RunState::Done`], [`RunState::Interrupted`] or [`RunState::Aborted`].
    pub async fn run(&mut self) -> RunSummary {
        let start = Instant::now();
        let mut summary = RunSummary::new(self.commit_policy, self.dry_run);

        tracing::info!(
            identity = %self.filter.identity,
            date_start = %self.filter.date_start,
            date_end = %self.filter.date_end,
            source = %self.source.describe(),
            ledger = %self.ledger.describe(),
            commit_policy = %self.commit_policy,
            dry_run = self.dry_run,
            "Starting export run"
        );

        if let Err(failure) = self.execute(&mut summary).await {
            log_error_with_context!(&failure, failure.kind());
            summary.failures.push(failure);
        }

        let final_state = if !summary.failures.is_empty() {
            RunState::Aborted
        } else if summary.interrupted {
            RunState::Interrupted
        } else {
            RunState::Done
        };
        enter(&mut summary, final_state);

        summary.duration = start.elapsed();
        log_run_complete!(final_state, summary.records_committed, summary.duration);
        summary
    }

    async fn execute(&mut self, summary: &mut RunSummary) -> std::result::Result<(), PipelineError> {
        enter(summary, RunState::Fetching);
        let candidates = self
            .source
            .fetch(&self.filter)
            .await
            .map_err(|e| PipelineError::SourceUnavailable { cause: e.to_string() })?;
        summary.candidates = candidates.len();

        enter(summary, RunState::Deduplicating);
        let snapshot = self
            .ledger
            .load()
            .await
            .map_err(|e| PipelineError::LedgerUnreadable { cause: e.to_string() })?;
        let remaining = dedupe(&candidates, &snapshot.ids);
        summary.already_ledgered = candidates.len() - remaining.len();
        summary.deduplicated = remaining.len();
        tracing::info!(
            candidates = summary.candidates,
            already_ledgered = summary.already_ledgered,
            remaining = summary.deduplicated,
            "Candidates deduplicated"
        );

        if remaining.is_empty() {
            tracing::info!("Nothing new to export");
            return Ok(());
        }

        enter(summary, RunState::Batching);
        let batches = self.batcher.split(&remaining);
        summary.batches_planned = batches.len();
        let (min_rows, max_rows) = self.batcher.bounds();
        tracing::info!(
            batches = batches.len(),
            min_rows,
            max_rows,
            sizes = ?batches.iter().map(Batch::len).collect::<Vec<_>>(),
            "Batches planned"
        );

        if self.dry_run {
            return self.stage_only(summary, &batches).await;
        }
        self.export_batches(summary, &remaining, &batches).await
    }

    async fn export_batches(
        &self,
        summary: &mut RunSummary,
        remaining: &RecordTable,
        batches: &[Batch],
    ) -> std::result::Result<(), PipelineError> {
        let total = batches.len();
        let last_batch = last_batch_by_id(batches);
        let mut committed: HashSet<RecordId> = HashSet::with_capacity(remaining.len());
        let mut pending: Vec<&Batch> = Vec::new();
        let mut export_failure = None;

        for batch in batches {
            if self.shutdown_requested(summary) {
                break;
            }

            enter(summary, RunState::Exporting { index: batch.index, total });
            log_batch_processing!(batch.index, total, batch.len());

            match self.exporter.export(batch).await {
                ExportOutcome::Succeeded(info) => {
                    summary.batches_exported += 1;
                    summary.records_exported += batch.len();
                    summary.artifacts.push(info);

                    match self.commit_policy {
                        CommitPolicy::PerBatch => {
                            enter(summary, RunState::Committing);
                            self.commit(summary, &[batch], &last_batch, &mut committed)
                                .await?;
                        }
                        CommitPolicy::EndOfRun => pending.push(batch),
                    }
                }
                ExportOutcome::Failed(cause) => {
                    export_failure = Some(PipelineError::ExportFailure {
                        batch_index: batch.index,
                        total_batches: total,
                        first_id: id_text(batch.first_id()),
                        last_id: id_text(batch.last_id()),
                        cause,
                    });
                    break;
                }
            }
        }

        if let Some(failure) = &export_failure {
            log_error_with_context!(failure, "batch export failed, remaining batches skipped");
        }

        if !pending.is_empty() {
            enter(summary, RunState::Committing);
            if let Err(commit_failure) = self.commit(summary, &pending, &last_batch, &mut committed).await {
                if let Some(failure) = export_failure.take() {
                    summary.failures.push(failure);
                }
                return Err(commit_failure);
            }
        }

        export_failure.map_or(Ok(()), Err)
    }

    /// Dry run: serialize and stage every batch, upload and commit nothing
    async fn stage_only(
        &self,
        summary: &mut RunSummary,
        batches: &[Batch],
    ) -> std::result::Result<(), PipelineError> {
        let total = batches.len();
        for batch in batches {
            if self.shutdown_requested(summary) {
                break;
            }
            enter(summary, RunState::Exporting { index: batch.index, total });

            let mut info = self.exporter.stage(batch).await.map_err(|e| PipelineError::ExportFailure {
                batch_index: batch.index,
                total_batches: total,
                first_id: id_text(batch.first_id()),
                last_id: id_text(batch.last_id()),
                cause: e.to_string(),
            })?;

            if !self.exporter.settings().retain_local_artifacts {
                if let Some(path) = info.local_path.take() {
                    discard(&path).await;
                }
            }
            tracing::info!(
                batch = batch.index,
                artifact = %info.name,
                rows = info.rows,
                "DRY RUN: batch serialized, upload and ledger append skipped"
            );
            summary.artifacts.push(info);
        }
        Ok(())
    }

    /// Append the identifiers of `batches` not yet committed in this run
    ///
    /// `batches` are the latest successful ones, so every batch up to the
    /// last of them has been uploaded. Identifiers with rows in a later batch
    /// are held back until that batch is committed.
    async fn commit(
        &self,
        summary: &mut RunSummary,
        batches: &[&Batch],
        last_batch: &HashMap<RecordId, usize>,
        committed: &mut HashSet<RecordId>,
    ) -> std::result::Result<(), PipelineError> {
        let through = batches.iter().map(|b| b.index).max().unwrap_or_default();
        let mut seen = HashSet::new();
        let mut deferred = 0;
        let ids: Vec<RecordId> = batches
            .iter()
            .flat_map(|batch| batch.record_ids())
            .filter(|id| !committed.contains(id) && seen.insert(id.clone()))
            .filter(|id| {
                let ready = last_batch.get(id).map_or(true, |last| *last <= through);
                if !ready {
                    deferred += 1;
                }
                ready
            })
            .collect();
        if deferred > 0 {
            tracing::debug!(
                through_batch = through,
                deferred,
                "Identifiers with rows in later batches held back"
            );
        }

        if let Err(e) = self.ledger.append(&ids).await {
            return Err(PipelineError::LedgerWriteFailure {
                batch_indices: batches.iter().map(|b| b.index).collect(),
                first_id: id_text(batches.first().and_then(|b| b.first_id())),
                last_id: id_text(batches.last().and_then(|b| b.last_id())),
                cause: e.to_string(),
            });
        }

        summary.ids_appended += ids.len();
        summary.records_committed += batches.iter().map(|b| b.len()).sum::<usize>();
        committed.extend(ids);
        Ok(())
    }

    fn shutdown_requested(&self, summary: &mut RunSummary) -> bool {
        if *self.shutdown_signal.borrow() {
            tracing::warn!(
                batches_exported = summary.batches_exported,
                batches_planned = summary.batches_planned,
                "Shutdown requested, no further batches will start"
            );
            summary.interrupted = true;
        }
        summary.interrupted
    }
}

/// Index of the last batch holding a row of each identifier
fn last_batch_by_id(batches: &[Batch]) -> HashMap<RecordId, usize> {
    let mut last = HashMap::new();
    for batch in batches {
        for id in batch.record_ids() {
            last.insert(id, batch.index);
        }
    }
    last
}

fn enter(summary: &mut RunSummary, state: RunState) {
    tracing::debug!(state = %state, "Run state");
    summary.states.push(state);
}

fn id_text(id: Option<&RecordId>) -> String {
    id.map(ToString::to_string).unwrap_or_default()
}
