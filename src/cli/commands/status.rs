//! Status command implementation
//!
//! This module implements the `status` command: it reads the ledger and the
//! current candidates and reports how many records are still waiting for
//! export. Nothing is written.

use crate::adapters::create_collaborators;
use crate::config::parse_config_file;
use crate::core::ledger::{dedupe, Ledger};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Override the identity to report on
    #[arg(long)]
    pub identity: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        println!("📊 Export Status");
        println!();

        let mut config = match parse_config_file(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };
        if let Some(ref identity) = self.identity {
            config.selection.identity = Some(identity.clone());
        }
        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            return Ok(2);
        }

        let today = chrono::Local::now().date_naive();
        let filter = match config.selection.resolve_filter(today) {
            Ok(f) => f,
            Err(e) => {
                println!("❌ {e}");
                return Ok(2);
            }
        };

        let collaborators = match create_collaborators(&config) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to initialize collaborators");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };
        let ledger = Ledger::new(collaborators.ledger);

        let snapshot = match ledger.load().await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to read ledger ({})", ledger.describe());
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let candidates = match collaborators.source.fetch(&filter).await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to query record source");
                println!("   Error: {e}");
                return Ok(4);
            }
        };
        let pending = dedupe(&candidates, &snapshot.ids);

        println!("  Identity: {}", filter.identity);
        println!("  Window: {} ..= {}", filter.date_start, filter.date_end);
        println!("  Ledger: {}", ledger.describe());
        println!("  Exported IDs: {}", snapshot.len());
        if snapshot.blank_entries > 0 || snapshot.duplicate_entries > 0 {
            println!(
                "  ⚠️  Ledger has {} blank and {} repeated entries",
                snapshot.blank_entries, snapshot.duplicate_entries
            );
        }
        println!("  Candidates: {}", candidates.len());
        println!(
            "  Already exported: {}",
            candidates.len() - pending.len()
        );
        println!("  Pending: {}", pending.len());
        println!();

        if pending.is_empty() {
            println!("✅ Everything in this window has been exported.");
        } else {
            println!("Run 'tally export' to export the pending records.");
        }
        println!();

        tracing::info!(
            identity = %filter.identity,
            ledger_ids = snapshot.len(),
            candidates = candidates.len(),
            pending = pending.len(),
            "Status computed"
        );
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs { identity: None };
        assert!(args.identity.is_none());
    }

    #[tokio::test]
    async fn test_status_missing_config() {
        let args = StatusArgs {
            identity: Some("ALICE".to_string()),
        };
        let code = args.execute("/nonexistent/tally.toml").await.unwrap();
        assert_eq!(code, 2);
    }
}
