//! Export run summary and reporting

use super::artifact::ArtifactInfo;
use crate::config::CommitPolicy;
use crate::domain::PipelineError;
use std::fmt;
use std::time::Duration;

/// States of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetching,
    Deduplicating,
    Batching,
    Exporting { index: usize, total: usize },
    Committing,
    Done,
    /// Stopped by a shutdown signal after committing what was uploaded
    Interrupted,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Interrupted | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Fetching => write!(f, "Fetching"),
            RunState::Deduplicating => write!(f, "Deduplicating"),
            RunState::Batching => write!(f, "Batching"),
            RunState::Exporting { index, total } => write!(f, "Exporting({index} of {total})"),
            RunState::Committing => write!(f, "Committing"),
            RunState::Done => write!(f, "Done"),
            RunState::Interrupted => write!(f, "Interrupted"),
            RunState::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Summary of an export run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Candidate rows returned by the source
    pub candidates: usize,

    /// Candidate rows whose identifier was already in the ledger
    pub already_ledgered: usize,

    /// Rows left after deduplication
    pub deduplicated: usize,

    pub batches_planned: usize,
    pub batches_exported: usize,
    pub records_exported: usize,

    /// Rows of the batches whose identifiers reached the ledger
    pub records_committed: usize,

    /// Identifiers appended to the ledger
    pub ids_appended: usize,

    /// Artifacts produced, in batch order
    pub artifacts: Vec<ArtifactInfo>,

    /// Every state the run went through, oldest first
    pub states: Vec<RunState>,

    /// Failures in the order they happened
    pub failures: Vec<PipelineError>,

    pub commit_policy: CommitPolicy,
    pub dry_run: bool,
    pub interrupted: bool,
    pub duration: Duration,
}

impl RunSummary {
    pub fn new(commit_policy: CommitPolicy, dry_run: bool) -> Self {
        Self {
            candidates: 0,
            already_ledgered: 0,
            deduplicated: 0,
            batches_planned: 0,
            batches_exported: 0,
            records_exported: 0,
            records_committed: 0,
            ids_appended: 0,
            artifacts: Vec::new(),
            states: Vec::new(),
            failures: Vec::new(),
            commit_policy,
            dry_run,
            interrupted: false,
            duration: Duration::ZERO,
        }
    }

    /// Last recorded state
    pub fn final_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }

    /// The failure that stopped the run, if any
    pub fn failure(&self) -> Option<&PipelineError> {
        self.failures.first()
    }

    pub fn is_successful(&self) -> bool {
        self.final_state() == Some(RunState::Done)
    }

    /// Exported batches whose identifiers did not reach the ledger
    pub fn uncommitted_records(&self) -> usize {
        if self.dry_run {
            return 0;
        }
        self.records_exported.saturating_sub(self.records_committed)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        let final_state = self
            .final_state()
            .map_or_else(|| "Unknown".to_string(), |s| s.to_string());

        tracing::info!(
            final_state = %final_state,
            candidates = self.candidates,
            already_ledgered = self.already_ledgered,
            deduplicated = self.deduplicated,
            batches_planned = self.batches_planned,
            batches_exported = self.batches_exported,
            records_exported = self.records_exported,
            records_committed = self.records_committed,
            ids_appended = self.ids_appended,
            commit_policy = %self.commit_policy,
            dry_run = self.dry_run,
            duration_secs = self.duration.as_secs(),
            "Export run summary"
        );

        if self.uncommitted_records() > 0 {
            tracing::warn!(
                records = self.uncommitted_records(),
                "Uploaded records missing from the ledger will be exported again"
            );
        }
        for failure in &self.failures {
            tracing::error!(kind = failure.kind(), error = %failure, "Export run failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_summary() {
        let summary = RunSummary::new(CommitPolicy::PerBatch, false);
        assert_eq!(summary.final_state(), None);
        assert!(!summary.is_successful());
        assert!(summary.failure().is_none());
    }

    #[test]
    fn test_run_state_display() {
        assert_eq!(RunState::Exporting { index: 2, total: 3 }.to_string(), "Exporting(2 of 3)");
        assert_eq!(RunState::Aborted.to_string(), "Aborted");
        assert!(RunState::Interrupted.is_terminal());
        assert!(!RunState::Committing.is_terminal());
    }

    #[test]
    fn test_uncommitted_records() {
        let mut summary = RunSummary::new(CommitPolicy::EndOfRun, false);
        summary.records_exported = 420;
        summary.records_committed = 210;
        assert_eq!(summary.uncommitted_records(), 210);

        summary.dry_run = true;
        assert_eq!(summary.uncommitted_records(), 0);
    }

    #[test]
    fn test_failure_is_first_recorded() {
        let mut summary = RunSummary::new(CommitPolicy::EndOfRun, false);
        summary.failures.push(PipelineError::SourceUnavailable {
            cause: "timeout".to_string(),
        });
        summary.failures.push(PipelineError::LedgerUnreadable {
            cause: "later".to_string(),
        });
        assert_eq!(summary.failure().map(PipelineError::kind), Some("SourceUnavailable"));
    }
}
