use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "auto-yt-dlp",
    version,
    about = "Fetch new videos from subscribed channels and playlists with yt-dlp"
)]
pub struct Cli {
    /// Configuration file (overrides the CONFIG environment variable)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every subscription (default)
    Run {
        /// List and filter videos without downloading anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Show configured subscriptions
    List,
}
