//! Core business logic for Tally.
//!
//! # Modules
//!
//! - [`ledger`] - The ledger of exported identifiers and deduplication
//! - [`export`] - Batching, export jobs and run coordination
//!
//! # Export Workflow
//!
//! 1. **Fetch**: Query the record source for the selection window
//! 2. **Deduplicate**: Drop records whose identifier is already in the ledger
//! 3. **Batch**: Split the rest into batches of `min_rows..=max_rows` rows
//! 4. **Export**: Serialize and upload each batch, stopping at the first failure
//! 5. **Commit**: Append the identifiers of uploaded batches to the ledger
//! 6. **Report**: Produce the run summary
//!
//! # Example
//!
//! ```rust,no_run
//! use tally::adapters::create_collaborators;
//! use tally::config::load_config;
//! use tally::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tally.toml")?;
//! let collaborators = create_collaborators(&config)?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let today = chrono::Local::now().date_naive();
//! let mut coordinator =
//!     ExportCoordinator::from_config(&config, collaborators, shutdown_rx, today)?;
//!
//! let summary = coordinator.run().await;
//! println!("Committed: {}", summary.records_committed);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod ledger;
