//! Ledger stored as a CSV file
//!
//! The file has a header row containing an `ID` column. Other columns are
//! ignored on read, so a sheet exported by hand with notes next to the
//! identifiers is still a valid ledger. A missing or empty file is an empty
//! ledger.

use crate::adapters::traits::LedgerStore;
use crate::domain::{LedgerError, RecordId, Result, DEFAULT_ID_COLUMN};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// CSV file ledger
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// No header and no rows
fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

/// Parse ledger CSV content into the raw identifier values
fn parse_ledger(content: &[u8]) -> std::result::Result<Vec<String>, LedgerError> {
    if is_blank(content) {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| LedgerError::Malformed(format!("unreadable header row: {e}")))?;
    let id_index = headers
        .iter()
        .position(|h| h.trim() == DEFAULT_ID_COLUMN)
        .ok_or_else(|| {
            LedgerError::Malformed(format!(
                "no '{}' column in header [{}]",
                DEFAULT_ID_COLUMN,
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

    let mut values = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| LedgerError::Malformed(format!("row {}: {}", line + 1, e)))?;
        values.push(record.get(id_index).unwrap_or_default().to_string());
    }
    Ok(values)
}

/// Render rows to append, optionally preceded by the header
fn render_rows(ids: &[RecordId], with_header: bool) -> std::result::Result<Vec<u8>, LedgerError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if with_header {
        writer
            .write_record([DEFAULT_ID_COLUMN])
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
    }
    for id in ids {
        writer
            .write_record([id.as_str()])
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| LedgerError::WriteFailed(e.to_string()))
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn load(&self) -> Result<Vec<String>> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "Ledger file not found, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(LedgerError::ReadFailed(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ))
                .into())
            }
        };

        Ok(parse_ledger(&content)?)
    }

    async fn append(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let write_err =
            |e: std::io::Error| LedgerError::WriteFailed(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;

        let mut existing = Vec::new();
        file.read_to_end(&mut existing).await.map_err(write_err)?;

        // A blank file loads as an empty ledger, so it starts over with a header
        let blank = is_blank(&existing);
        if blank && !existing.is_empty() {
            file.set_len(0).await.map_err(write_err)?;
        }

        let mut buffer = Vec::new();
        if !blank && existing.last() != Some(&b'\n') {
            buffer.push(b'\n');
        }
        buffer.extend(render_rows(ids, blank)?);

        file.write_all(&buffer).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        tracing::debug!(
            path = %self.path.display(),
            appended = ids.len(),
            "Appended identifiers to ledger file"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file ledger {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TallyError;
    use tempfile::TempDir;

    fn ids(values: &[&str]) -> Vec<RecordId> {
        values.iter().map(|v| RecordId::new(*v).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let store = FileLedgerStore::new(dir.path().join("ledger.csv"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_header_then_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.csv");
        let store = FileLedgerStore::new(&path);

        store.append(&ids(&["R0001", "R0002"])).await.unwrap();
        store.append(&ids(&["R0003"])).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID\nR0001\nR0002\nR0003\n");
        assert_eq!(store.load().await.unwrap(), vec!["R0001", "R0002", "R0003"]);
    }

    #[tokio::test]
    async fn test_append_after_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, "ID\n17").unwrap();

        let store = FileLedgerStore::new(&path);
        store.append(&ids(&["18"])).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec!["17", "18"]);
    }

    #[tokio::test]
    async fn test_append_to_blank_file_writes_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, "\n  \n").unwrap();

        let store = FileLedgerStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
        store.append(&ids(&["R1", "R2"])).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ID\nR1\nR2\n");
        assert_eq!(store.load().await.unwrap(), vec!["R1", "R2"]);
    }

    #[tokio::test]
    async fn test_extra_columns_and_blank_cells_are_returned_raw() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, "NOTE,ID\nfirst,10\n,\nagain,10\n").unwrap();

        let store = FileLedgerStore::new(&path);
        assert_eq!(store.load().await.unwrap(), vec!["10", "", "10"]);
    }

    #[tokio::test]
    async fn test_header_without_id_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.csv");
        std::fs::write(&path, "RECORD\n10\n").unwrap();

        let store = FileLedgerStore::new(&path);
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, TallyError::Ledger(LedgerError::Malformed(_))));
    }
}
