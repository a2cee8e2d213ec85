use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::Bucket;

use super::{expiry, is_valid_key, ObjectStore, ObjectStoreError, PresignedPut, PutGrant};
use crate::checksum;
use crate::config::S3Config;

/// Header S3 checks the uploaded body against.
pub const CHECKSUM_HEADER: &str = "x-amz-checksum-sha256";

/// Amazon S3 (or S3-compatible) object store backend.
///
/// Uploads go straight from the client to the bucket through SigV4-presigned
/// PUT URLs. The bucket must allow cross-origin `PUT` and `GET`.
pub struct S3Store {
    bucket: Box<Bucket>,
    /// Prefix for attachment keys
    base_url: String,
}

impl std::fmt::Debug for S3Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket.name())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn map_s3_error(e: S3Error) -> ObjectStoreError {
    ObjectStoreError::Backend(format!("s3: {e}"))
}

impl S3Store {
    pub fn new(config: &S3Config) -> Result<Self, ObjectStoreError> {
        let bucket_name = config
            .bucket
            .as_deref()
            .ok_or_else(|| ObjectStoreError::Backend("bucket name is required".to_string()))?;
        let access_key_id = config
            .access_key_id
            .as_deref()
            .ok_or_else(|| ObjectStoreError::Backend("access key id is required".to_string()))?;
        let secret_access_key = config.secret_access_key.as_deref().ok_or_else(|| {
            ObjectStoreError::Backend("secret access key is required".to_string())
        })?;

        let credentials = Credentials::new(
            Some(access_key_id),
            Some(secret_access_key),
            config.session_token.as_deref(),
            None,
            None,
        )
        .map_err(|e| ObjectStoreError::Backend(format!("credentials: {e}")))?;

        // A custom endpoint means an S3-compatible service: path-style addressing
        let (endpoint, path_style) = match config.endpoint {
            Some(ref endpoint) => (endpoint.trim_end_matches('/').to_string(), true),
            None => (format!("https://s3.{}.amazonaws.com", config.region), false),
        };
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint,
        };

        let mut bucket = Bucket::new(bucket_name, region, credentials).map_err(map_s3_error)?;
        if path_style {
            bucket.set_path_style();
        }

        let base_url = config
            .bucket_base_url
            .clone()
            .unwrap_or_else(|| bucket.url());

        Ok(Self { bucket, base_url })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn service_name(&self) -> &'static str {
        "s3"
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }

    async fn presign_put(&self, grant: &PutGrant) -> Result<PresignedPut, ObjectStoreError> {
        if !is_valid_key(&grant.key) {
            return Err(ObjectStoreError::InvalidKey(grant.key.clone()));
        }

        let expires_at = expiry(Utc::now(), grant.expires_in)?;
        let expiry_secs = u32::try_from(grant.expires_in.as_secs()).map_err(|_| {
            ObjectStoreError::Signing(format!("invalid expiry: {:?}", grant.expires_in))
        })?;

        // Signed alongside host, so storage rejects any other type, length or body
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(grant.content_length));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(&grant.content_type)
                .map_err(|e| ObjectStoreError::Signing(format!("content type: {e}")))?,
        );
        headers.insert(
            CHECKSUM_HEADER,
            HeaderValue::from_str(&checksum::to_base64(&grant.checksum))
                .map_err(|e| ObjectStoreError::Signing(format!("checksum: {e}")))?,
        );

        let url = self
            .bucket
            .presign_put(&grant.key, expiry_secs, Some(headers), None)
            .await
            .map_err(map_s3_error)?;

        Ok(PresignedPut { url, expires_at })
    }
}
