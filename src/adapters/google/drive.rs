//! Google Drive export sink
//!
//! Uses the resumable upload protocol: a metadata request opens an upload
//! session, then the artifact bytes are sent in one `PUT`. Drive only
//! creates the file once the content request completes, so a failed upload
//! never leaves a partial file in the folder.

use super::{build_client, endpoint};
use crate::adapters::traits::{ExportSink, UploadReceipt};
use crate::config::{DriveSinkConfig, SecretString};
use crate::domain::{Result, SinkError};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

fn content_type(artifact: &Path) -> &'static str {
    match artifact.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

async fn rejected(response: Response) -> SinkError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    SinkError::Rejected { status, message }
}

/// Sink uploading artifacts into a Drive folder
///
/// The destination is the folder ID.
pub struct DriveSink {
    client: Client,
    base_url: String,
    access_token: SecretString,
}

impl DriveSink {
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &DriveSinkConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    async fn open_session(
        &self,
        name: &str,
        folder_id: &str,
        mime: &str,
        length: usize,
    ) -> Result<String> {
        let mut url = endpoint(&self.base_url, &["upload", "drive", "v3", "files"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("supportsAllDrives", "true");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret().as_ref())
            .header("X-Upload-Content-Type", mime)
            .header("X-Upload-Content-Length", length.to_string())
            .json(&json!({ "name": name, "parents": [folder_id] }))
            .send()
            .await
            .map_err(|e| SinkError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejected(response).await.into());
        }

        let session = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| SinkError::PublishFailed("upload session has no Location header".into()))?;
        Ok(session)
    }
}

#[async_trait]
impl ExportSink for DriveSink {
    async fn upload(&self, artifact: &Path, destination: &str) -> Result<UploadReceipt> {
        if destination.trim().is_empty() {
            return Err(SinkError::InvalidDestination("Drive folder ID is empty".into()).into());
        }
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| SinkError::PublishFailed("artifact path has no file name".into()))?;
        let bytes = tokio::fs::read(artifact).await?;
        let mime = content_type(artifact);

        let session = self
            .open_session(&name, destination, mime, bytes.len())
            .await?;

        let response = self
            .client
            .put(&session)
            .bearer_auth(self.access_token.expose_secret().as_ref())
            .header(CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .map_err(|e| SinkError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(rejected(response).await.into());
        }

        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| SinkError::PublishFailed(format!("unexpected Drive response: {e}")))?;

        tracing::debug!(artifact = %name, file_id = %file.id, folder = destination, "Uploaded to Drive");
        Ok(UploadReceipt {
            location: format!("drive://{}/{}", destination, file.id),
        })
    }

    fn describe(&self) -> String {
        "google drive folder".to_string()
    }
}
