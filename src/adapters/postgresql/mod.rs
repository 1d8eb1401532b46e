//! PostgreSQL integration
//!
//! The record source and the ledger store share one pooled
//! [`PostgresClient`] when they point at the same database.

pub mod client;
pub mod ledger;
pub mod source;

pub use client::{PgClientError, PoolSettings, PostgresClient};
pub use ledger::PostgresLedgerStore;
pub use source::PostgresRecordSource;
