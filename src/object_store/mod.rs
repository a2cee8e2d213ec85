mod local;
mod s3;

pub use local::{LocalStore, SignedPutParams};
pub use s3::{S3Store, CHECKSUM_HEADER};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Signing error: {0}")]
    Signing(String),
    #[error("Upload signature is invalid")]
    InvalidSignature,
    #[error("Upload URL has expired")]
    Expired,
    #[error("Upload does not match its authorization: {0}")]
    Mismatch(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// The write a presigned URL authorizes: one PUT of exactly this content to this key.
#[derive(Debug, Clone)]
pub struct PutGrant {
    pub key: String,
    pub content_type: String,
    pub content_length: u64,
    /// Hex SHA-256 supplied by the client
    pub checksum: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
pub struct PresignedPut {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Abstraction over object storage backends that accept direct client uploads.
/// Keys are random hex names -- the raw blobs are meaningless without the attachment store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Identifier recorded on attachments created against this backend.
    fn service_name(&self) -> &'static str;

    /// Fully-qualified location of the object stored under `key`.
    fn object_url(&self, key: &str) -> String;

    /// Build a time-limited URL authorizing a single PUT described by `grant`.
    async fn presign_put(&self, grant: &PutGrant) -> Result<PresignedPut, ObjectStoreError>;
}

/// Keys are generated names; anything that could escape a directory or a URL path is rejected.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 256
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

pub(crate) fn expiry(now: DateTime<Utc>, expires_in: Duration) -> Result<DateTime<Utc>, ObjectStoreError> {
    chrono::Duration::from_std(expires_in)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ObjectStoreError::Signing(format!("invalid expiry: {expires_in:?}")))
}
