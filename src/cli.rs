use std::path::PathBuf;

use clap::Parser;

/// Download the summary PDF linked from every page in a seed file.
#[derive(Debug, Parser)]
#[command(name = "fetch-summaries", version, long_about = None)]
pub struct Cli {
    /// Optional TOML settings file.
    #[arg(long, default_value = "fetch-summaries.toml")]
    pub config: PathBuf,

    /// Location of the seed JSON file.
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Directory the PDFs are written to.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Maximum number of concurrent downloads. Values below 1 mean 1, anything
    /// that is not a number means the default.
    #[arg(short = 'c', long, allow_hyphen_values = true)]
    pub concurrency: Option<String>,

    /// Seconds to wait between dispatching downloads.
    #[arg(long)]
    pub interval: Option<u64>,

    /// Per-request timeout in seconds, 0 disables it.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// User-Agent header sent with every request.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Save the body of non-2xx download responses instead of failing.
    #[arg(long)]
    pub accept_error_status: bool,
}
