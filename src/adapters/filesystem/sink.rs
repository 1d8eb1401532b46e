//! Export sink writing into a local or mounted directory

use crate::adapters::traits::{ExportSink, UploadReceipt};
use crate::domain::{Result, SinkError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Highest numeric suffix tried before giving up on a free file name
const MAX_NAME_SUFFIX: usize = 1000;

/// Sink publishing artifacts into a directory
///
/// The artifact is copied under a hidden temporary name inside the
/// destination directory, flushed, and then renamed into place, so readers
/// of the directory never see a half-written file. An existing file is never
/// overwritten: on a name collision a `-2`, `-3`, ... suffix is added before
/// the extension. Concurrent writers into the same directory are not
/// coordinated.
pub struct FolderSink {
    create_missing: bool,
}

impl FolderSink {
    pub fn new() -> Self {
        Self {
            create_missing: true,
        }
    }

    /// Fail instead of creating a missing destination directory
    pub fn require_existing(mut self) -> Self {
        self.create_missing = false;
        self
    }
}

impl Default for FolderSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a file name into stem and extension (with the dot)
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    }
}

/// First name in `dir` not taken: `name`, then `stem-2.ext`, `stem-3.ext`, ...
pub(crate) async fn free_target(dir: &Path, name: &str) -> std::result::Result<PathBuf, SinkError> {
    let (stem, ext) = split_name(name);
    for n in 1..=MAX_NAME_SUFFIX {
        let candidate = if n == 1 {
            dir.join(name)
        } else {
            dir.join(format!("{stem}-{n}{ext}"))
        };
        let exists = tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| SinkError::PublishFailed(format!("{}: {}", candidate.display(), e)))?;
        if !exists {
            return Ok(candidate);
        }
    }
    Err(SinkError::PublishFailed(format!(
        "no free file name for {} in {}",
        name,
        dir.display()
    )))
}

#[async_trait]
impl ExportSink for FolderSink {
    async fn upload(&self, artifact: &Path, destination: &str) -> Result<UploadReceipt> {
        let dir = PathBuf::from(destination);
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| SinkError::PublishFailed("artifact path has no file name".into()))?;

        if !dir.is_dir() {
            if !self.create_missing {
                return Err(SinkError::InvalidDestination(format!(
                    "{} is not a directory",
                    dir.display()
                ))
                .into());
            }
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                SinkError::InvalidDestination(format!("{}: {}", dir.display(), e))
            })?;
        }

        let temp = dir.join(format!(".{}.{}.part", name, uuid::Uuid::new_v4()));
        let publish = async {
            tokio::fs::copy(artifact, &temp).await?;
            tokio::fs::File::open(&temp).await?.sync_all().await?;
            Ok::<_, std::io::Error>(())
        };
        if let Err(e) = publish.await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(SinkError::PublishFailed(format!("copy to {}: {}", temp.display(), e)).into());
        }

        let target = match free_target(&dir, &name).await {
            Ok(target) => target,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e.into());
            }
        };
        if let Err(e) = tokio::fs::rename(&temp, &target).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(SinkError::PublishFailed(format!(
                "rename to {}: {}",
                target.display(),
                e
            ))
            .into());
        }

        tracing::debug!(artifact = %name, location = %target.display(), "Artifact published");
        Ok(UploadReceipt {
            location: target.display().to_string(),
        })
    }

    fn describe(&self) -> String {
        "filesystem folder".to_string()
    }
}
