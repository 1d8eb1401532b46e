//! Logging and observability
//!
//! Structured logging through `tracing`, plus a few macros that keep the
//! field names of recurring run events consistent.
//!
//! # Example
//!
//! ```no_run
//! use tally::logging::init_logging;
//! use tally::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(identity = "ALICE", "Starting export run");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log progress through the batch plan
///
/// # Example
///
/// ```no_run
/// use tally::log_batch_processing;
///
/// log_batch_processing!(2, 3, 214);
/// ```
#[macro_export]
macro_rules! log_batch_processing {
    ($current:expr, $total:expr, $rows:expr) => {
        tracing::info!(
            batch = $current,
            total_batches = $total,
            rows = $rows,
            progress_pct = ($current as f64 / $total as f64 * 100.0),
            "Exporting batch"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use tally::log_error_with_context;
/// use tally::domain::TallyError;
///
/// let error = TallyError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log the end of a run
///
/// # Example
///
/// ```no_run
/// use tally::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!("Done", 450, Duration::from_secs(12));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($state:expr, $records:expr, $duration:expr) => {
        tracing::info!(
            final_state = %$state,
            records_committed = $records,
            duration_ms = $duration.as_millis() as u64,
            "Export run finished"
        );
    };
}
