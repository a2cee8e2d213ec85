//! Shared test helpers for in-crate handler tests.

use std::sync::Arc;

use crate::config::{Config, NodeConfig, StorageConfig, UploadPolicy};
use crate::object_store::LocalStore;
use crate::storage::Database;
use crate::AppState;

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            local_signing_secret: Some("test-secret".to_string()),
            ..Default::default()
        },
        uploads: UploadPolicy::default(),
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let store = Arc::new(
        LocalStore::new(
            &files_dir,
            &config.storage.public_base_url,
            config.storage.local_signing_secret.as_deref(),
        )
        .expect("Failed to create test object store"),
    );

    Arc::new(AppState {
        config,
        db,
        object_store: store.clone(),
        local_store: Some(store),
    })
}
