use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Content types accepted for upload when `ALLOWED_CONTENT_TYPES` is unset.
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "video/mp4",
    "video/quicktime",
    "application/pdf",
];

/// 10 MiB
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub uploads: UploadPolicy,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Externally reachable base URL of this service, used to build local upload URLs
    pub public_base_url: String,
    /// HMAC secret for local upload URLs. A random one is generated when unset.
    pub local_signing_secret: Option<String>,
    pub s3: S3Config,
}

#[derive(Clone, Default)]
pub struct S3Config {
    pub access_key_id: Option<String>,
    pub bucket: Option<String>,
    /// Public base URL of the bucket, prefixed onto every attachment key
    pub bucket_base_url: Option<String>,
    /// Custom endpoint for S3-compatible services (path-style addressing)
    pub endpoint: Option<String>,
    pub region: String,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

// Credentials stay out of logs.
impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("bucket_base_url", &self.bucket_base_url)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Rules applied by the issuer to every upload request.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_content_types: Vec<String>,
    /// Maximum declared upload size in bytes
    pub max_upload_size: u64,
    /// How long a signed upload URL stays valid
    pub signed_url_ttl: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            signed_url_ttl: Duration::from_secs(DEFAULT_SIGNED_URL_TTL_SECS),
        }
    }
}

impl UploadPolicy {
    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed == content_type)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
            local_signing_secret: None,
            s3: S3Config {
                region: "us-east-1".to_string(),
                ..Default::default()
            },
        }
    }
}

/// Base URL clients can reach this node at when `PUBLIC_BASE_URL` is unset.
/// A wildcard bind address is not routable, so loopback is used in its place.
pub fn default_public_base_url(bind_address: &str) -> String {
    match bind_address.parse::<SocketAddr>() {
        Ok(addr) if addr.ip().is_unspecified() => {
            let loopback: IpAddr = match addr.ip() {
                IpAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                IpAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            };
            format!("http://{}", SocketAddr::new(loopback, addr.port()))
        }
        _ => format!("http://{bind_address}"),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "s3" => StorageBackend::S3,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| default_public_base_url(&bind_address))
            .trim_end_matches('/')
            .to_string();

        let local_signing_secret = std::env::var("LOCAL_SIGNING_SECRET").ok();

        let s3 = S3Config {
            access_key_id: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            bucket: std::env::var("AWS_BUCKET_NAME").ok(),
            bucket_base_url: std::env::var("AWS_BUCKET_BASE_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string()),
            endpoint: std::env::var("AWS_ENDPOINT_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string()),
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            secret_access_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
            session_token: std::env::var("AWS_SESSION_TOKEN").ok(),
        };

        let allowed_content_types: Vec<String> = std::env::var("ALLOWED_CONTENT_TYPES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| {
                DEFAULT_ALLOWED_CONTENT_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        let signed_url_ttl = std::env::var("SIGNED_URL_TTL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SIGNED_URL_TTL_SECS);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                public_base_url,
                local_signing_secret,
                s3,
            },
            uploads: UploadPolicy {
                allowed_content_types,
                max_upload_size,
                signed_url_ttl: Duration::from_secs(signed_url_ttl),
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.uploads.allowed_content_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_CONTENT_TYPES cannot be empty".to_string(),
            ));
        }

        if self.uploads.signed_url_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "SIGNED_URL_TTL must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::S3 {
            let s3 = &self.storage.s3;
            let missing: Vec<&str> = [
                ("AWS_BUCKET_NAME", s3.bucket.is_none()),
                ("AWS_ACCESS_KEY_ID", s3.access_key_id.is_none()),
                ("AWS_SECRET_ACCESS_KEY", s3.secret_access_key.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            if !missing.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} required when STORAGE_BACKEND=s3",
                    missing.join(", ")
                )));
            }
        }

        if self.storage.backend == StorageBackend::Local
            && self.storage.local_signing_secret.is_none()
        {
            tracing::warn!(
                "LOCAL_SIGNING_SECRET is not set. Upload URLs will not survive a restart."
            );
        }

        Ok(())
    }
}
