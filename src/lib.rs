// Tally - incremental ledgered record exporter
// Copyright (c) 2025 Tally Contributors
// Licensed under the MIT License

//! # Tally - incremental ledgered record exporter
//!
//! Tally exports database records for one identity and date window to a
//! shared destination in size-bounded batches, and keeps an append-only
//! ledger of exported record identifiers so that repeated runs never export
//! the same record twice.
//!
//! ## Overview
//!
//! One export run:
//! - **Fetches** candidate rows from PostgreSQL with a parameterized query
//! - **Deduplicates** them against the ledger
//! - **Batches** the remainder into random sizes between `min_rows` and `max_rows`
//! - **Uploads** one artifact per batch to a folder or Google Drive
//! - **Commits** the identifiers of uploaded batches to the ledger
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (ledger, batching, export coordination)
//! - [`adapters`] - External integrations (PostgreSQL, filesystem, Google Sheets and Drive)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tally::adapters::create_collaborators;
//! use tally::config::load_config;
//! use tally::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tally.toml")?;
//!     let collaborators = create_collaborators(&config)?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let today = chrono::Local::now().date_naive();
//!     let mut coordinator =
//!         ExportCoordinator::from_config(&config, collaborators, shutdown_rx, today)?;
//!
//!     let summary = coordinator.run().await;
//!     println!("Exported {} records", summary.records_exported);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`domain::TallyError`]. The coordinator itself
//! never returns an error: failures land in [`core::export::RunSummary`] as
//! [`domain::PipelineError`] values, together with what was exported and
//! committed before the failure.
//!
//! ## Logging
//!
//! Tally uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(identity = "ALICE", "Starting export run");
//! warn!(duplicates = 2, "Ledger contains repeated identifiers");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
