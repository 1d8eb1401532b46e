//! Export command implementation
//!
//! This module implements the `export` command: one incremental export run
//! for the selected identity and date window.

use crate::adapters::create_collaborators;
use crate::config::{parse_config_file, CommitPolicy};
use crate::core::export::{ExportCoordinator, RunOptions, RunState, RunSummary};
use chrono::NaiveDate;
use clap::Args;
use std::str::FromStr;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run mode - fetch, batch and serialize without uploading or
    /// touching the ledger
    #[arg(long)]
    pub dry_run: bool,

    /// Override the identity to export for (must be in the allow-list)
    #[arg(long)]
    pub identity: Option<String>,

    /// Override the first day of the window (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    pub date_start: Option<NaiveDate>,

    /// Override the last day of the window (YYYY-MM-DD, inclusive)
    #[arg(long, value_name = "DATE")]
    pub date_end: Option<NaiveDate>,

    /// Seed for the batch size draws, for a reproducible batch plan
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the commit policy (per_batch or end_of_run)
    #[arg(long, value_name = "POLICY")]
    pub commit_policy: Option<String>,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        // Load configuration, validated once the CLI overrides are applied
        let mut config = match parse_config_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(identity) = &self.identity {
            tracing::info!(identity = %identity, "Overriding identity from CLI");
            config.selection.identity = Some(identity.clone());
        }
        if let Some(date_start) = self.date_start {
            tracing::info!(date_start = %date_start, "Overriding date_start from CLI");
            config.selection.date_start = date_start;
        }
        if let Some(date_end) = self.date_end {
            tracing::info!(date_end = %date_end, "Overriding date_end from CLI");
            config.selection.date_end = Some(date_end);
        }
        if let Some(seed) = self.seed {
            tracing::info!(seed, "Overriding batch seed from CLI");
            config.batching.seed = Some(seed);
        }
        if let Some(policy) = &self.commit_policy {
            match CommitPolicy::from_str(policy) {
                Ok(policy) => {
                    tracing::info!(commit_policy = %policy, "Overriding commit policy from CLI");
                    config.commit.policy = policy;
                }
                Err(e) => {
                    eprintln!("❌ {e}");
                    return Ok(2);
                }
            }
        }
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2); // Configuration error exit code
        }

        let today = chrono::Local::now().date_naive();
        let options = match RunOptions::from_config(&config, today) {
            Ok(options) => options,
            Err(e) => {
                tracing::error!(error = %e, "Invalid selection");
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        if options.dry_run {
            tracing::info!("Dry run mode enabled - nothing will be uploaded or committed");
            println!("🔍 DRY RUN MODE - nothing will be uploaded or added to the ledger");
            println!();
        }

        // Confirmation prompt (unless --yes or dry-run)
        if !self.yes && !options.dry_run {
            println!("Export Configuration:");
            println!("  Identity: {}", options.filter.identity);
            println!(
                "  Window: {} ..= {}",
                options.filter.date_start, options.filter.date_end
            );
            println!("  Batch rows: {}..={}", options.min_rows, options.max_rows);
            println!("  Destination: {}", options.exporter.destination);
            println!("  Commit policy: {}", options.commit_policy);
            println!();
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        // Create collaborators
        tracing::info!("Creating collaborators");
        let collaborators = match create_collaborators(&config) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create collaborators");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4);
            }
        };

        let mut coordinator = match ExportCoordinator::new(collaborators, options, shutdown_signal) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        println!("🚀 Starting export...");
        println!();

        let summary = coordinator.run().await;
        summary.log_summary();
        print_summary(&summary);

        let exit_code = match summary.final_state() {
            Some(RunState::Done) => {
                if summary.deduplicated == 0 {
                    println!("✅ Nothing new to export.");
                } else if summary.dry_run {
                    println!("✅ Dry run completed.");
                } else {
                    println!("✅ Export completed successfully!");
                }
                0
            }
            Some(RunState::Interrupted) => {
                println!("⚠️  Export interrupted gracefully. Uploaded batches were committed.");
                println!("   Run the same command to export the rest.");
                tracing::info!("Export interrupted by user signal");
                130 // SIGINT exit code (standard Unix convention)
            }
            _ => {
                println!("❌ Export aborted");
                1
            }
        };

        Ok(exit_code)
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Candidates: {}", summary.candidates);
    println!("  Already exported: {}", summary.already_ledgered);
    println!("  To export: {}", summary.deduplicated);
    println!(
        "  Batches: {} exported of {} planned",
        summary.batches_exported, summary.batches_planned
    );
    println!("  Records exported: {}", summary.records_exported);
    println!("  Records committed: {}", summary.records_committed);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());

    if !summary.artifacts.is_empty() {
        println!();
        println!("📁 Artifacts:");
        for artifact in &summary.artifacts {
            println!(
                "  - {} ({} rows, sha256 {}) -> {}",
                artifact.name,
                artifact.rows,
                &artifact.checksum[..12.min(artifact.checksum.len())],
                artifact.location.as_deref().unwrap_or("not uploaded")
            );
        }
    }

    if !summary.failures.is_empty() {
        println!();
        println!("⚠️  Errors encountered:");
        for failure in &summary.failures {
            println!("  - {}: {}", failure.kind(), failure);
        }
    }

    if summary.uncommitted_records() > 0 {
        println!();
        println!(
            "⚠️  {} uploaded records are not in the ledger and will be exported again",
            summary.uncommitted_records()
        );
    }
    println!();
}
