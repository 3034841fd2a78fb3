use clap::Parser;
use std::path::PathBuf;

/// Watch subreddit feeds for keywords, confirm matches with Gemini and
/// announce them on Discord.
#[derive(Debug, Parser)]
#[command(name = "subwatch", version, about)]
pub struct Cli {
    /// Monitor configuration (JSON, or TOML when the file ends in .toml)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Load secrets from this file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Override the history file from the configuration
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Override the log file from the configuration
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Run one scan, drain the analysis queue and exit
    #[arg(long)]
    pub once: bool,
}
