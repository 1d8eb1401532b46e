//! Configuration management for Tally.
//!
//! Tally uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `TALLY_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation of the active backends only
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! connection_string = "${TALLY_PG_URL}"
//! query = "SELECT id AS \"ID\", title AS \"TITLE\" FROM records WHERE owner = $1 AND created BETWEEN $2 AND $3 ORDER BY id"
//!
//! [selection]
//! allowed_identities = ["ALICE", "BOB"]
//! date_start = "2024-01-01"
//!
//! [ledger]
//! backend = "file"
//!
//! [ledger.file]
//! path = "ledger.csv"
//!
//! [sink]
//! backend = "filesystem"
//! destination = "/mnt/shared/exports"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config_file};
pub use schema::{
    ApplicationConfig, ArtifactFormat, BatchingConfig, CommitConfig, CommitPolicy,
    DriveSinkConfig, FileLedgerConfig, LedgerBackend, LedgerConfig, LoggingConfig,
    PostgresLedgerConfig, SelectionConfig, SheetsLedgerConfig, SinkBackend, SinkConfig,
    SourceConfig, TallyConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
