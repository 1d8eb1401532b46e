//! Google Workspace adapters over REST
//!
//! - [`sheets`] - spreadsheet-backed ledger (Sheets API v4)
//! - [`drive`] - folder sink using resumable uploads (Drive API v3)
//!
//! Both authenticate with a bearer access token supplied through
//! configuration. Obtaining and refreshing the token is left to the caller
//! (for example `gcloud auth print-access-token`).

pub mod drive;
pub mod sheets;

pub use drive::DriveSink;
pub use sheets::SheetsLedgerStore;

use crate::domain::{Result, TallyError};
use reqwest::{Client, ClientBuilder, Url};
use std::time::Duration;

fn build_client(timeout_seconds: u64) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_seconds))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| TallyError::Configuration(format!("Failed to build HTTP client: {e}")))
}

/// Join `segments` onto `base`, percent-encoding each one
fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| TallyError::Configuration(format!("Invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| TallyError::Configuration(format!("Base URL {base} cannot have a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
