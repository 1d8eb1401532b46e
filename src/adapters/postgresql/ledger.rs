//! Ledger stored in a PostgreSQL table
//!
//! The table is created on first use:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS tally_ledger (
//!     position    BIGSERIAL PRIMARY KEY,
//!     id          TEXT NOT NULL,
//!     exported_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! `position` keeps storage order; nothing is ever updated or deleted.

use super::client::{PgClientError, PostgresClient};
use crate::adapters::traits::LedgerStore;
use crate::domain::{LedgerError, RecordId, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Quote a possibly schema-qualified table name
fn quote_table(table: &str) -> String {
    table
        .split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

/// Ledger store backed by a PostgreSQL table
pub struct PostgresLedgerStore {
    client: Arc<PostgresClient>,
    table: String,
    quoted: String,
    ensured: OnceCell<()>,
}

impl PostgresLedgerStore {
    pub fn new(client: Arc<PostgresClient>, table: impl Into<String>) -> Self {
        let table = table.into();
        Self {
            quoted: quote_table(&table),
            table,
            client,
            ensured: OnceCell::new(),
        }
    }

    async fn ensure_table(&self) -> std::result::Result<(), PgClientError> {
        self.ensured
            .get_or_try_init(|| async {
                let client = self.client.get_connection().await?;
                client
                    .batch_execute(&format!(
                        "CREATE TABLE IF NOT EXISTS {} (\
                         position BIGSERIAL PRIMARY KEY, \
                         id TEXT NOT NULL, \
                         exported_at TIMESTAMPTZ NOT NULL DEFAULT now())",
                        self.quoted
                    ))
                    .await?;
                tracing::debug!(table = %self.table, "Ledger table ready");
                Ok::<(), PgClientError>(())
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn load(&self) -> Result<Vec<String>> {
        let read_err = |e: PgClientError| LedgerError::ReadFailed(format!("{}: {}", self.table, e));

        self.ensure_table().await.map_err(read_err)?;
        let client = self.client.get_connection().await.map_err(read_err)?;
        let rows = client
            .query(
                &format!("SELECT id FROM {} ORDER BY position", self.quoted),
                &[],
            )
            .await
            .map_err(|e| read_err(e.into()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0)
                    .map_err(|e| LedgerError::Malformed(e.to_string()).into())
            })
            .collect()
    }

    async fn append(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let write_err = |e: PgClientError| LedgerError::WriteFailed(format!("{}: {}", self.table, e));

        self.ensure_table().await.map_err(write_err)?;
        let mut client = self.client.get_connection().await.map_err(write_err)?;
        let values: Vec<&str> = ids.iter().map(RecordId::as_str).collect();

        let transaction = client
            .transaction()
            .await
            .map_err(|e| write_err(e.into()))?;
        let inserted = transaction
            .execute(
                &format!(
                    "INSERT INTO {} (id) \
                     SELECT id FROM UNNEST($1::text[]) WITH ORDINALITY AS batch(id, n) \
                     ORDER BY n",
                    self.quoted
                ),
                &[&values],
            )
            .await
            .map_err(|e| write_err(e.into()))?;
        transaction.commit().await.map_err(|e| write_err(e.into()))?;

        tracing::debug!(table = %self.table, inserted, "Appended identifiers to ledger table");
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "postgresql ledger {} ({})",
            self.table,
            self.client.connection_string_safe()
        )
    }
}
