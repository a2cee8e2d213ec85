//! attachment-uploads - Presigned direct-to-storage uploads with attachment records
//!
//! This crate provides:
//! - An issuer that validates upload requests, signs time-boxed PUT URLs and
//!   records an attachment for each one
//! - Swappable object storage backends (local filesystem, S3 via SigV4 presigning)
//! - redb embedded database for attachment metadata
//! - A client-side upload orchestrator with per-file progress tracking

pub mod api;
pub mod checksum;
pub mod client;
pub mod config;
pub mod issuer;
pub mod object_store;
pub mod storage;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use config::Config;
use object_store::{LocalStore, ObjectStore};
use storage::Database;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn ObjectStore>,
    /// Set when the local backend is active; it also receives the uploads
    pub local_store: Option<Arc<LocalStore>>,
}
