use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attachment_uploads::{
    api,
    config::{Config, StorageBackend},
    object_store as obj,
    storage::Database,
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "attachment-uploads starting");

    // Load configuration
    let config = Config::load()?;

    // Open the attachment store. The handle lives in AppState until shutdown.
    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    // Initialize object store backend
    let (object_store, local_store): (Arc<dyn obj::ObjectStore>, Option<Arc<obj::LocalStore>>) =
        match config.storage.backend {
            StorageBackend::Local => {
                let store = Arc::new(obj::LocalStore::new(
                    &config.storage.local_storage_path,
                    &config.storage.public_base_url,
                    config.storage.local_signing_secret.as_deref(),
                )?);
                info!(
                    "Using local storage backend at: {}, uploads via {}",
                    config.storage.local_storage_path, config.storage.public_base_url
                );
                (store.clone() as Arc<dyn obj::ObjectStore>, Some(store))
            }
            StorageBackend::S3 => {
                let store = obj::S3Store::new(&config.storage.s3)?;
                info!(
                    "Using S3 storage backend, bucket: {}, region: {}",
                    config.storage.s3.bucket.as_deref().unwrap_or_default(),
                    config.storage.s3.region
                );
                (Arc::new(store) as Arc<dyn obj::ObjectStore>, None)
            }
        };

    info!(
        allowed_types = ?config.uploads.allowed_content_types,
        max_upload_size = config.uploads.max_upload_size,
        signed_url_ttl_secs = config.uploads.signed_url_ttl.as_secs(),
        "Upload policy"
    );

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        object_store,
        local_store,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Release the database before exit
    drop(state);

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
