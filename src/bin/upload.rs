use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use attachment_uploads::client::{UploadOrchestrator, UploadSource, UploadStatus};

#[derive(Debug, Parser)]
#[command(
    name = "attachment-upload",
    about = "Upload files directly to storage through presigned URLs"
)]
struct Args {
    /// Issuance endpoint
    #[arg(
        long,
        env = "UPLOAD_ENDPOINT",
        default_value = "http://127.0.0.1:8080/api/upload"
    )]
    endpoint: String,

    /// Record the uploads are attached to
    #[arg(long)]
    record_id: Option<String>,

    /// How often to log progress (milliseconds)
    #[arg(long, default_value = "500")]
    progress_interval: u64,

    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut sources = Vec::with_capacity(args.files.len());
    for path in &args.files {
        sources.push(UploadSource::from_path(path).await?);
    }

    let mut orchestrator = UploadOrchestrator::new(&args.endpoint)?
        .on_complete(|id| info!(attachment_id = %id, "Attachment ready"));
    if let Some(record_id) = args.record_id {
        orchestrator = orchestrator.with_record_id(record_id);
    }

    let handles = orchestrator.add_files(sources);
    let mut all_done = Box::pin(futures::future::join_all(handles));

    let mut ticker = tokio::time::interval(Duration::from_millis(args.progress_interval.max(1)));
    loop {
        tokio::select! {
            _ = &mut all_done => break,
            _ = ticker.tick() => {
                for upload in orchestrator.uploads() {
                    if upload.status == UploadStatus::Transferring {
                        info!(
                            name = %upload.name,
                            progress = %upload.progress.map(|p| format!("{p:.2}%")).unwrap_or_default(),
                            "Uploading"
                        );
                    }
                }
            }
        }
    }

    let tracked = orchestrator.tracker().len();
    let failed = orchestrator.tracker().failures();

    if !failed.is_empty() {
        for (name, reason) in &failed {
            warn!("{name}: {reason}");
        }
        anyhow::bail!("{} of {} uploads failed", failed.len(), tracked);
    }

    info!(count = tracked, "All uploads complete");
    Ok(())
}
