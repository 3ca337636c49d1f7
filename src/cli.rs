//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Upload documents to a remote library, one at a time.
///
/// Uploader queues the given files and pushes them to the configured
/// endpoint sequentially, with per-file progress, automatic titling,
/// and an optional on-disk record of each run's queue state.
#[derive(Parser, Debug)]
#[command(name = "uploader")]
#[command(author, version, about)]
pub struct Args {
    /// Files to upload, in queue order
    pub files: Vec<PathBuf>,

    /// Remote upload endpoint URL
    #[arg(short, long, env = "UPLOADER_ENDPOINT")]
    pub endpoint: String,

    /// Bearer token for the remote service
    #[arg(short, long, env = "UPLOADER_TOKEN", hide_env_values = true, conflicts_with = "token_file")]
    pub token: Option<String>,

    /// Read the bearer token from a file instead
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Document title (multi-file batches get "Part N" suffixes); derived
    /// from the first file name when omitted
    #[arg(long)]
    pub title: Option<String>,

    /// Optional document description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Directory for the persisted queue snapshot (persistence disabled
    /// when omitted)
    #[arg(long)]
    pub state_dir: Option<PathBuf>,

    /// Maximum file size in megabytes (1-1024)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=1024))]
    pub max_file_size_mb: u64,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
