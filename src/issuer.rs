//! Issues presigned upload URLs and records the attachment each one will fill.
//!
//! The attachment record is written before the URL is returned, so a record
//! existing does not mean its bytes were ever uploaded.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::UploadPolicy;
use crate::object_store::{ObjectStore, ObjectStoreError, PutGrant};
use crate::storage::models::{NewAttachment, MEDIA_RECORD_TYPE};
use crate::storage::{Database, DatabaseError};

/// Random bytes in a generated object name (hex-encoded to twice this length).
pub const KEY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("File type not allowed")]
    TypeNotAllowed,
    #[error("File size too large")]
    TooLarge,
    #[error("Storage error: {0}")]
    Storage(#[from] ObjectStoreError),
    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

impl IssueError {
    /// Validation failures are reported to the caller as-is; everything else is opaque.
    pub fn is_validation(&self) -> bool {
        matches!(self, IssueError::TypeNotAllowed | IssueError::TooLarge)
    }
}

/// Body of an upload URL request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub name: String,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedUpload {
    pub url: String,
    pub id: String,
}

/// Generate a random object name: `KEY_BYTES` bytes from the system CSPRNG, hex-encoded.
pub fn generate_key() -> Result<String, ObjectStoreError> {
    let mut buf = [0u8; KEY_BYTES];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| ObjectStoreError::Signing("system random source failed".to_string()))?;
    Ok(hex::encode(buf))
}

/// Validate `req`, presign a PUT for a freshly generated key and persist the
/// attachment record.
pub async fn issue_signed_url(
    db: &Database,
    store: &dyn ObjectStore,
    policy: &UploadPolicy,
    req: UploadRequest,
) -> Result<SignedUpload, IssueError> {
    if !policy.allows(&req.content_type) {
        return Err(IssueError::TypeNotAllowed);
    }
    if req.size > policy.max_upload_size {
        return Err(IssueError::TooLarge);
    }

    let key = generate_key()?;
    let presigned = store
        .presign_put(&PutGrant {
            key: key.clone(),
            content_type: req.content_type.clone(),
            content_length: req.size,
            checksum: req.checksum.clone(),
            expires_in: policy.signed_url_ttl,
        })
        .await?;

    let attachment = db.create_attachment(NewAttachment {
        key: store.object_url(&key),
        service_name: store.service_name().to_string(),
        file_name: req.name,
        content_type: req.content_type,
        byte_size: req.size,
        checksum: req.checksum,
        record_id: req.record_id.filter(|id| !id.is_empty()),
        record_type: Some(MEDIA_RECORD_TYPE.to_string()),
        metadata: None,
    })?;

    tracing::debug!(
        attachment_id = %attachment.id,
        key = %attachment.key,
        expires_at = %presigned.expires_at,
        "Issued upload URL"
    );

    Ok(SignedUpload {
        url: presigned.url,
        id: attachment.id,
    })
}
