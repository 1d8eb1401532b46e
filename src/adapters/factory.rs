//! Collaborator factory
//!
//! Builds the record source, ledger store and export sink selected by the
//! configuration.

use crate::adapters::filesystem::{FileLedgerStore, FolderSink};
use crate::adapters::google::{DriveSink, SheetsLedgerStore};
use crate::adapters::postgresql::{
    PoolSettings, PostgresClient, PostgresLedgerStore, PostgresRecordSource,
};
use crate::adapters::traits::{ExportSink, LedgerStore, RecordSource};
use crate::config::{LedgerBackend, SinkBackend, TallyConfig};
use crate::domain::{Result, TallyError};
use std::sync::Arc;

/// The three collaborators of an export run
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn RecordSource>,
    pub ledger: Arc<dyn LedgerStore>,
    pub sink: Arc<dyn ExportSink>,
}

/// Create all collaborators for `config`
///
/// A PostgreSQL ledger without its own connection string shares the record
/// source's connection pool.
///
/// # Errors
///
/// Returns a configuration error if a selected backend has no settings or a
/// client cannot be built. No connection is opened here.
pub fn create_collaborators(config: &TallyConfig) -> Result<Collaborators> {
    let pool = Arc::new(PostgresClient::new(
        &config.source.connection_string,
        PoolSettings::from(&config.source),
    )?);

    Ok(Collaborators {
        source: create_record_source(config, Arc::clone(&pool)),
        ledger: create_ledger_store(config, Some(pool))?,
        sink: create_export_sink(config)?,
    })
}

/// Create the PostgreSQL record source on `client`
pub fn create_record_source(config: &TallyConfig, client: Arc<PostgresClient>) -> Arc<dyn RecordSource> {
    tracing::info!(target_db = %client.connection_string_safe(), "Creating PostgreSQL record source");
    Arc::new(PostgresRecordSource::new(
        client,
        config.source.query.clone(),
        config.source.id_column.clone(),
    ))
}

/// Create the ledger store selected by `ledger.backend`
///
/// `source_pool` is reused by the PostgreSQL backend when the ledger has no
/// connection string of its own.
pub fn create_ledger_store(
    config: &TallyConfig,
    source_pool: Option<Arc<PostgresClient>>,
) -> Result<Arc<dyn LedgerStore>> {
    match config.ledger.backend {
        LedgerBackend::File => {
            let file = config.ledger.file.as_ref().ok_or_else(|| {
                TallyError::Configuration("ledger.file section is missing".to_string())
            })?;
            tracing::info!(path = %file.path, "Creating file ledger");
            Ok(Arc::new(FileLedgerStore::new(&file.path)))
        }
        LedgerBackend::PostgreSQL => {
            let pg = config.ledger.postgresql.as_ref().ok_or_else(|| {
                TallyError::Configuration("ledger.postgresql section is missing".to_string())
            })?;
            let client = match (&pg.connection_string, source_pool) {
                (Some(conn), _) => Arc::new(PostgresClient::new(conn, PoolSettings::from(&config.source))?),
                (None, Some(pool)) => pool,
                (None, None) => Arc::new(PostgresClient::new(
                    &config.source.connection_string,
                    PoolSettings::from(&config.source),
                )?),
            };
            tracing::info!(table = %pg.table, "Creating PostgreSQL ledger");
            Ok(Arc::new(PostgresLedgerStore::new(client, pg.table.clone())))
        }
        LedgerBackend::Sheets => {
            let sheets = config.ledger.sheets.as_ref().ok_or_else(|| {
                TallyError::Configuration("ledger.sheets section is missing".to_string())
            })?;
            tracing::info!(spreadsheet = %sheets.spreadsheet_id, "Creating Google Sheets ledger");
            Ok(Arc::new(SheetsLedgerStore::new(sheets)?))
        }
    }
}

/// Create the export sink selected by `sink.backend`
pub fn create_export_sink(config: &TallyConfig) -> Result<Arc<dyn ExportSink>> {
    match config.sink.backend {
        SinkBackend::Filesystem => {
            tracing::info!(destination = %config.sink.destination, "Creating filesystem sink");
            Ok(Arc::new(FolderSink::new()))
        }
        SinkBackend::Drive => {
            let drive = config.sink.drive.as_ref().ok_or_else(|| {
                TallyError::Configuration("sink.drive section is missing".to_string())
            })?;
            tracing::info!(folder = %config.sink.destination, "Creating Google Drive sink");
            Ok(Arc::new(DriveSink::new(drive)?))
        }
    }
}
