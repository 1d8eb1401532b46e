//! Batch artifacts: naming, serialization and local staging

use super::batch::Batch;
use crate::adapters::filesystem::sink::free_target;
use crate::config::ArtifactFormat;
use crate::domain::{Identity, RecordId, Result, TallyError};
use chrono::NaiveDate;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// What was produced for one exported batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactInfo {
    pub batch_index: usize,
    pub name: String,
    pub rows: usize,
    /// Hex SHA-256 of the serialized bytes
    pub checksum: String,
    pub first_id: Option<RecordId>,
    pub last_id: Option<RecordId>,
    /// Staged copy, when it was kept
    pub local_path: Option<PathBuf>,
    /// Where the sink published it; `None` on a dry run
    pub location: Option<String>,
}

/// `{identity}_{YYYY-MM-DD}_part{n}.{ext}`
pub fn artifact_name(
    identity: &Identity,
    run_date: NaiveDate,
    index: usize,
    format: ArtifactFormat,
) -> String {
    format!(
        "{}_{}_part{}.{}",
        identity,
        run_date.format("%Y-%m-%d"),
        index,
        format.extension()
    )
}

/// Serialize a batch in `format`
///
/// CSV writes the column header first and null cells as empty fields. JSON
/// is an array of objects keyed by column name with nulls preserved.
pub fn serialize_batch(batch: &Batch, format: ArtifactFormat) -> Result<Vec<u8>> {
    match format {
        ArtifactFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(batch.columns.iter())?;
            for record in &batch.records {
                writer.write_record(record.values().iter().map(|v| v.as_deref().unwrap_or("")))?;
            }
            writer
                .into_inner()
                .map_err(|e| TallyError::Serialization(e.to_string()))
        }
        ArtifactFormat::Json => {
            let rows: Vec<serde_json::Map<String, serde_json::Value>> = batch
                .records
                .iter()
                .map(|record| {
                    batch
                        .columns
                        .iter()
                        .zip(record.values())
                        .map(|(column, value)| {
                            let value = value
                                .as_ref()
                                .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.clone()));
                            (column.clone(), value)
                        })
                        .collect()
                })
                .collect();
            Ok(serde_json::to_vec_pretty(&rows)?)
        }
    }
}

/// Hex-encoded SHA-256 of `data`
pub fn checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Write `bytes` under `name` in `dir` atomically
///
/// The bytes go to a hidden temporary file in `dir` that is synced and then
/// renamed to `name`, or to `stem-N.ext` when a kept artifact of an earlier
/// run already holds that name. On error the temporary file is removed.
pub async fn stage_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let target = free_target(dir, name).await?;
    let temp = dir.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));

    let write = async {
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::File::open(&temp).await?.sync_all().await?;
        tokio::fs::rename(&temp, &target).await
    };
    if let Err(e) = write.await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(TallyError::Io(format!(
            "failed to stage {}: {}",
            target.display(),
            e
        )));
    }

    Ok(target)
}
