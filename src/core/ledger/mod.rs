//! Ledger of exported identifiers and candidate deduplication

pub mod dedupe;
pub mod manager;

pub use dedupe::dedupe;
pub use manager::{Ledger, LedgerSnapshot};
