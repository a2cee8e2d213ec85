use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use ring::hmac;
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{expiry, is_valid_key, ObjectStore, ObjectStoreError, PresignedPut, PutGrant};
use crate::checksum;

/// Local filesystem object store for development and testing.
///
/// Upload URLs point back at this service (`/objects/{key}`) and carry an
/// HMAC over the grant, so the PUT handler can enforce the same constraints a
/// cloud store would: expiry, exact length, content type and checksum.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: String,
    signing_key: hmac::Key,
}

/// Query parameters carried by a local upload URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedPutParams {
    pub expires: i64,
    pub content_type: String,
    pub content_length: u64,
    pub checksum: String,
    pub signature: String,
}

impl LocalStore {
    /// `secret` keys the upload URL signatures; `None` generates a per-process key.
    pub fn new<P: AsRef<Path>>(
        base_path: P,
        public_base_url: &str,
        secret: Option<&str>,
    ) -> Result<Self, ObjectStoreError> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;

        let signing_key = match secret {
            Some(secret) => hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes()),
            None => hmac::Key::generate(hmac::HMAC_SHA256, &SystemRandom::new())
                .map_err(|_| ObjectStoreError::Signing("failed to generate key".to_string()))?,
        };

        Ok(Self {
            base_path,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            signing_key,
        })
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if !is_valid_key(key) {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(key))
    }

    fn string_to_sign(
        key: &str,
        expires: i64,
        content_type: &str,
        content_length: u64,
        checksum: &str,
    ) -> String {
        format!("PUT\n{key}\n{expires}\n{content_type}\n{content_length}\n{checksum}")
    }

    fn sign(&self, message: &str) -> String {
        let tag = hmac::sign(&self.signing_key, message.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag.as_ref())
    }

    /// Check that `params` were issued by this store for `key` and are still valid at `now`.
    pub fn verify_put(
        &self,
        key: &str,
        params: &SignedPutParams,
        now: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&params.signature)
            .map_err(|_| ObjectStoreError::InvalidSignature)?;

        let message = Self::string_to_sign(
            key,
            params.expires,
            &params.content_type,
            params.content_length,
            &params.checksum,
        );
        hmac::verify(&self.signing_key, message.as_bytes(), &tag)
            .map_err(|_| ObjectStoreError::InvalidSignature)?;

        if now.timestamp() > params.expires {
            return Err(ObjectStoreError::Expired);
        }
        Ok(())
    }

    /// Accept a direct upload against a signed URL: verify the signature and the
    /// content against the grant, then store the bytes.
    pub async fn accept_put(
        &self,
        key: &str,
        params: &SignedPutParams,
        content_type: Option<&str>,
        data: Bytes,
        now: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        self.verify_put(key, params, now)?;

        if content_type != Some(params.content_type.as_str()) {
            return Err(ObjectStoreError::Mismatch(format!(
                "content type {:?} does not match {}",
                content_type.unwrap_or(""),
                params.content_type
            )));
        }
        if data.len() as u64 != params.content_length {
            return Err(ObjectStoreError::Mismatch(format!(
                "received {} bytes, expected {}",
                data.len(),
                params.content_length
            )));
        }
        if !checksum::matches(&params.checksum, &data) {
            return Err(ObjectStoreError::Mismatch("checksum mismatch".to_string()));
        }

        self.put(key, data).await
    }

    pub async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.exists() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    pub async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(key)?;
        Ok(path.exists())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn service_name(&self) -> &'static str {
        "local"
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{key}", self.public_base_url)
    }

    async fn presign_put(&self, grant: &PutGrant) -> Result<PresignedPut, ObjectStoreError> {
        if !is_valid_key(&grant.key) {
            return Err(ObjectStoreError::InvalidKey(grant.key.clone()));
        }

        let expires_at = expiry(Utc::now(), grant.expires_in)?;
        let expires = expires_at.timestamp();
        let signature = self.sign(&Self::string_to_sign(
            &grant.key,
            expires,
            &grant.content_type,
            grant.content_length,
            &grant.checksum,
        ));

        let url = format!(
            "{}?expires={expires}&content_type={}&content_length={}&checksum={}&signature={signature}",
            self.object_url(&grant.key),
            urlencoding::encode(&grant.content_type),
            grant.content_length,
            urlencoding::encode(&grant.checksum),
        );

        Ok(PresignedPut { url, expires_at })
    }
}

