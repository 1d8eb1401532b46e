//! Local filesystem adapters

pub mod ledger;
pub mod sink;

pub use ledger::FileLedgerStore;
pub use sink::FolderSink;
