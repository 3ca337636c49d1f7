//! CLI entry point for the uploader tool.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::Parser;
use tracing::{debug, info, warn};
use uploader_core::{
    EngineOptions, HttpClient, NewUpload, SnapshotStore, StaticTokenProvider, TokenFileProvider,
    TokenProvider, UploadEngine, UploadPolicy, UploadStatus, detect_content_type,
    title_from_filename,
};
use url::Url;

mod cli;
mod progress;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Uploader starting");

    if args.files.is_empty() {
        info!("No files provided. Pass files to upload as arguments.");
        info!("Example: uploader -e http://localhost:8000/api/pdfs/upload --token <TOKEN> report.pdf");
        return Ok(());
    }

    let endpoint = Url::parse(&args.endpoint)
        .with_context(|| format!("invalid endpoint URL: {}", args.endpoint))?;

    let tokens: Arc<dyn TokenProvider> = match (&args.token, &args.token_file) {
        (Some(token), _) => Arc::new(StaticTokenProvider::new(token.clone())),
        (None, Some(path)) => Arc::new(TokenFileProvider::new(path.clone())),
        (None, None) => bail!("either --token or --token-file is required"),
    };

    let policy = UploadPolicy {
        max_file_size: args.max_file_size_mb * 1024 * 1024,
        ..UploadPolicy::default()
    };
    let options = EngineOptions {
        policy: policy.clone(),
        snapshots: args.state_dir.as_ref().map(SnapshotStore::new),
        ..EngineOptions::default()
    };

    let engine = UploadEngine::new_with_options(
        endpoint.as_str(),
        HttpClient::new(),
        tokens,
        options,
    );

    let restored = engine.restore().await;
    if restored > 0 {
        info!(restored, "Restored unfinished items from the previous run");
    }

    // Split input into files queued as one batch and files recorded as
    // pre-failed items: unreadable paths and anything the policy rejects
    // up front (wrong type, empty, oversize).
    let mut valid = Vec::new();
    let mut rejected = Vec::new();
    for path in &args.files {
        let upload = match tokio::fs::read(path).await {
            Ok(data) => NewUpload {
                file_name: display_file_name(path),
                content_type: detect_content_type(path).to_string(),
                payload: Bytes::from(data),
            },
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Failed to read file");
                rejected.push((
                    NewUpload {
                        file_name: display_file_name(path),
                        content_type: detect_content_type(path).to_string(),
                        payload: Bytes::new(),
                    },
                    format!("Error reading file: {err}"),
                ));
                continue;
            }
        };
        match policy.validate(&upload.content_type, upload.payload.len() as u64) {
            Ok(()) => valid.push(upload),
            Err(err) => {
                warn!(file = %upload.file_name, error = %err, "File rejected before queueing");
                rejected.push((upload, err.to_string()));
            }
        }
    }

    let base_title = args
        .title
        .clone()
        .unwrap_or_else(|| title_from_filename(&display_file_name(&args.files[0])));

    if !valid.is_empty() {
        engine
            .add_items(valid, &base_title, args.description.as_deref(), None)
            .await;
    }
    for (upload, reason) in rejected {
        let title = title_from_filename(&upload.file_name);
        engine
            .add_items(vec![upload], &title, args.description.as_deref(), Some(&reason))
            .await;
    }

    let total = engine.items().len();
    let use_spinner = !args.no_progress && !args.quiet;
    let (ui_handle, stop) = progress::spawn_progress_ui(use_spinner, engine.clone(), total);

    while engine.is_processing() {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    stop.store(true, Ordering::SeqCst);
    if let Some(handle) = ui_handle {
        let _ = handle.await;
    }

    let items = engine.items();
    let succeeded = items
        .iter()
        .filter(|item| item.status == UploadStatus::Success)
        .count();
    let failed = items
        .iter()
        .filter(|item| item.status == UploadStatus::Error)
        .count();

    for item in &items {
        if item.status == UploadStatus::Error {
            warn!(
                title = %item.title,
                file = %item.file_name,
                error = item.error.as_deref().unwrap_or("unknown error"),
                "Upload failed"
            );
        }
    }

    info!(succeeded, failed, total, "Upload run complete");

    if failed > 0 {
        bail!("{failed} of {total} uploads failed");
    }
    Ok(())
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}
