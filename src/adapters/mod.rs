//! External system integrations for Tally.
//!
//! The export core only sees the three traits in [`traits`]:
//!
//! - [`RecordSource`] - where candidate records come from ([`postgresql`])
//! - [`LedgerStore`] - where exported identifiers are remembered
//!   ([`filesystem`], [`postgresql`], [`google`])
//! - [`ExportSink`] - where batch artifacts are published
//!   ([`filesystem`], [`google`])
//!
//! [`memory`] provides in-process fakes with failure injection, and
//! [`factory`] builds the configured implementations.
//!
//! ```rust,no_run
//! use tally::adapters::factory::create_collaborators;
//! use tally::config::load_config;
//!
//! # fn example() -> tally::domain::Result<()> {
//! let config = load_config("tally.toml")?;
//! let collaborators = create_collaborators(&config)?;
//! println!("ledger: {}", collaborators.ledger.describe());
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod filesystem;
pub mod google;
pub mod memory;
pub mod postgresql;
pub mod traits;

pub use factory::{create_collaborators, Collaborators};
pub use traits::{ExportSink, LedgerStore, RecordSource, UploadReceipt};
