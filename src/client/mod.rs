//! Client-side upload orchestration.
//!
//! Each selected file runs independently on its own task: checksum, request a
//! signed URL, then PUT the bytes straight to storage while reporting progress.
//! Tasks do not coordinate with each other and may finish in any order.

mod tracker;
mod transfer;

pub use tracker::{progress_percent, TrackedUpload, UploadStatus, UploadToken, UploadTracker};
pub use transfer::{put_with_progress, request_upload_url};

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::checksum;
use crate::issuer::UploadRequest;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload authorization failed: {0}")]
    Authorization(String),
    #[error("Checksum computation failed: {0}")]
    Checksum(String),
    #[error("Transfer failed: {0}")]
    Transfer(String),
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct UploadSource {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadSource {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = tokio::fs::read(path).await?;

        Ok(Self::new(name, content_type, Bytes::from(data)))
    }
}

/// Called with the attachment id once an upload's bytes are accepted by storage.
pub type CompletionCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct UploadOrchestrator {
    http: reqwest::Client,
    /// Full URL of the issuance endpoint, e.g. `http://host/api/upload`
    endpoint: String,
    record_id: Option<String>,
    tracker: UploadTracker,
    on_complete: Option<CompletionCallback>,
}

impl UploadOrchestrator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, UploadError> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            endpoint: endpoint.into(),
            record_id: None,
            tracker: UploadTracker::default(),
            on_complete: None,
        })
    }

    /// Attach every upload to this owning record.
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Show uploads from an earlier session; their names are not uploaded again.
    pub fn with_existing(mut self, uploads: Vec<TrackedUpload>) -> Self {
        self.tracker = UploadTracker::new(uploads);
        self
    }

    pub fn on_complete(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    pub fn tracker(&self) -> &UploadTracker {
        &self.tracker
    }

    pub fn uploads(&self) -> Vec<TrackedUpload> {
        self.tracker.snapshot()
    }

    /// Stop tracking the upload at `index`. An in-flight transfer is not cancelled.
    pub fn remove(&self, index: usize) -> Option<TrackedUpload> {
        self.tracker.remove(index)
    }

    /// Track files not already tracked by name and start one task per new file.
    ///
    /// Must be called from within a tokio runtime.
    pub fn add_files(&self, files: Vec<UploadSource>) -> Vec<JoinHandle<()>> {
        let tracked = self.tracker.track_new(&files);
        let mut files: Vec<Option<UploadSource>> = files.into_iter().map(Some).collect();

        tracked
            .into_iter()
            .filter_map(|(index, token)| {
                let source = files.get_mut(index)?.take()?;
                Some(tokio::spawn(self.clone().run(token, source)))
            })
            .collect()
    }

    async fn run(self, token: UploadToken, source: UploadSource) {
        self.tracker.update(token, |u| u.status = UploadStatus::Authorizing);

        let data = source.data.clone();
        let checksum = match tokio::task::spawn_blocking(move || checksum::sha256_hex(&data)).await
        {
            Ok(checksum) => checksum,
            Err(e) => {
                self.fail(token, &source.name, UploadError::Checksum(e.to_string()));
                return;
            }
        };

        let request = UploadRequest {
            content_type: source.content_type.clone(),
            size: source.data.len() as u64,
            name: source.name.clone(),
            checksum: checksum.clone(),
            record_id: self.record_id.clone(),
        };

        let signed = match request_upload_url(&self.http, &self.endpoint, &request).await {
            Ok(signed) => signed,
            Err(e) => {
                self.fail(token, &source.name, e);
                return;
            }
        };

        let size = request.size;
        self.tracker.update(token, |u| {
            u.attachment_id = Some(signed.id.clone());
            u.status = UploadStatus::Transferring;
            u.progress = progress_percent(0, size);
        });

        let tracker = self.tracker.clone();
        let result = put_with_progress(&self.http, &signed.url, &source, &checksum, move |sent| {
            tracker.update(token, |u| u.progress = progress_percent(sent, size));
        })
        .await;

        match result {
            Ok(()) => {
                self.tracker.update(token, |u| {
                    u.status = UploadStatus::Completed;
                    u.progress = Some(100.0);
                });
                tracing::info!(name = %source.name, attachment_id = %signed.id, "Upload complete");
                if let Some(ref callback) = self.on_complete {
                    callback(&signed.id);
                }
            }
            Err(e) => self.fail(token, &source.name, e),
        }
    }

    fn fail(&self, token: UploadToken, name: &str, e: UploadError) {
        tracing::error!(name = %name, error = %e, "Upload failed");
        let reason = e.to_string();
        self.tracker.update(token, |u| u.status = UploadStatus::Failed(reason));
    }
}
