//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "tally.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Tally configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your query and allowed identities", self.output);
                println!("  2. Export TALLY_PG_URL with the source connection string");
                println!("  3. Validate configuration: tally validate-config");
                println!("  4. Check what is pending: tally status --identity ALICE");
                println!("  5. Run export: tally export --identity ALICE");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Tally Configuration File
# Incremental ledgered record exporter

[application]
log_level = "info"
dry_run = false

[source]
connection_string = "${TALLY_PG_URL}"
# $1 = identity, $2 = first day, $3 = last day (inclusive)
query = "SELECT id AS \"ID\", title AS \"TITLE\", created AS \"CREATED\" FROM records WHERE owner = $1 AND created::date BETWEEN $2 AND $3 ORDER BY id"

[selection]
allowed_identities = ["ALICE", "BOB"]
date_start = "2024-01-01"

[batching]
min_rows = 200
max_rows = 220

[ledger]
backend = "file"

[ledger.file]
path = "ledger.csv"

[sink]
backend = "filesystem"
destination = "exports"
format = "csv"

[commit]
policy = "per_batch"

[logging]
local_enabled = false
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Tally Configuration File
# Incremental ledgered record exporter
#
# Each run selects the records of one identity in a date window, drops the
# ones whose ID is already in the ledger, splits the rest into batches,
# uploads one artifact per batch and appends the exported IDs to the ledger.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Dry run mode: fetch, batch and serialize, but never upload or touch the ledger
dry_run = false

# ============================================================================
# Record Source (PostgreSQL)
# ============================================================================
[source]
# Connection string format: postgresql://[user[:password]@][host][:port][/dbname][?params]
connection_string = "${TALLY_PG_URL}"

# Parameterized query. It must take exactly three parameters:
#   $1 = identity, $2 = first day, $3 = last day (both inclusive)
# and return a column holding each record's unique identifier.
query = "SELECT id AS \"ID\", title AS \"TITLE\", created AS \"CREATED\" FROM records WHERE owner = $1 AND created::date BETWEEN $2 AND $3 ORDER BY id"

# Name of the identifier column in the query result
id_column = "ID"

# Connection pool settings
max_connections = 4
connection_timeout_seconds = 30
statement_timeout_seconds = 300

# ============================================================================
# Selection
# ============================================================================
[selection]
# Identity to export; usually passed with --identity instead
# identity = "ALICE"

# Identities that may be exported
allowed_identities = ["ALICE", "BOB"]

# Window, both ends inclusive. date_end defaults to today.
date_start = "2024-01-01"
# date_end = "2024-12-31"

# ============================================================================
# Batching
# ============================================================================
[batching]
# Each batch gets a random size in min_rows..=max_rows; the last one takes
# whatever is left
min_rows = 200
max_rows = 220

# Fixed seed for a reproducible batch plan (optional)
# seed = 42

# ============================================================================
# Ledger
# Choose ONE backend: file | postgresql | sheets
# ============================================================================
[ledger]
backend = "file"

# ----------------------------------------------------------------------------
# Option 1: CSV file with an ID column
# ----------------------------------------------------------------------------
[ledger.file]
path = "ledger.csv"

# ----------------------------------------------------------------------------
# Option 2: PostgreSQL table (created on first use)
# ----------------------------------------------------------------------------
# [ledger.postgresql]
# table = "tally_ledger"
# # Defaults to the source database
# connection_string = "${TALLY_LEDGER_PG_URL}"

# ----------------------------------------------------------------------------
# Option 3: Google Sheets worksheet with an ID header
# ----------------------------------------------------------------------------
# [ledger.sheets]
# spreadsheet_id = "your-spreadsheet-id"
# worksheet = "Sheet1"
# access_token = "${TALLY_GOOGLE_ACCESS_TOKEN}"
# timeout_seconds = 60

# ============================================================================
# Export Sink
# ============================================================================
[sink]
# filesystem | drive
backend = "filesystem"

# Directory (filesystem) or folder ID (drive)
destination = "exports"

# Local directory where artifacts are written before upload
staging_dir = "data"

# Artifact format: csv | json
format = "csv"

# Keep staged artifacts after a successful upload
retain_local_artifacts = true

# [sink.drive]
# access_token = "${TALLY_GOOGLE_ACCESS_TOKEN}"
# timeout_seconds = 60

# ============================================================================
# Ledger Commit
# ============================================================================
[commit]
# per_batch: append each batch's IDs right after its upload succeeds
# end_of_run: append the IDs of all uploaded batches once exporting stops
policy = "per_batch"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging (JSON lines)
local_enabled = false

# Local log directory
local_path = "logs"

# Log rotation (daily or hourly)
local_rotation = "daily"
"#
        .to_string()
    }
}
