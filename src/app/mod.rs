mod archive;
mod episode;
mod fetcher;
mod filter;
mod pipeline;


use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::paths::{config_file_path, default_archives_dir, resolve_fetch_bin};

use self::fetcher::YtDlp;
use self::pipeline::{RunOptions, run_subscriptions};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct VideoInfo {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(rename = "webpage_url", alias = "url")]
    pub(crate) url: String,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Some(Command::Run { dry_run }) => run_fetch(&config, RunOptions { dry_run })?,
        Some(Command::List) => run_list(&config),
        None => run_fetch(&config, RunOptions::default())?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let path = config_file_path(cli.config.clone())?;
    let config = Config::load(&path).context("error loading config")?;
    config.with_default_archives_dir(default_archives_dir)
}

fn run_fetch(config: &Config, options: RunOptions) -> Result<()> {
    info!("Starting...");
    let bin = resolve_fetch_bin().context("required dependencies are missing")?;

    if config.subscriptions.is_empty() {
        info!("No subscriptions found in the configuration.");
        return Ok(());
    }

    let fetcher = YtDlp::new(bin);
    let summary = run_subscriptions(config, &fetcher, options);
    for done in &summary.completed {
        debug!(
            subscription = %done.name,
            listed = done.listed,
            downloaded = done.downloaded,
            failed = done.failed,
            "subscription summary"
        );
    }
    info!(
        "Finished {} subscription(s), {} aborted, {} video(s) downloaded",
        summary.completed.len(),
        summary.aborted,
        summary.downloaded()
    );
    Ok(())
}

fn run_list(config: &Config) {
    if config.subscriptions.is_empty() {
        println!("No subscriptions configured.");
        return;
    }

    println!(
        "{:<20} {:<44} {:<24} {:<5} {:<20}",
        "NAME", "URL", "DESTINATION", "MAX", "FILTER"
    );
    for sub in &config.subscriptions {
        let max = if sub.max_videos == 0 {
            "-".to_string()
        } else {
            sub.max_videos.to_string()
        };
        println!(
            "{:<20} {:<44} {:<24} {:<5} {:<20}",
            truncate(&sub.name, 20),
            truncate(&sub.url, 44),
            truncate(&config.destination(sub).display().to_string(), 24),
            max,
            truncate(sub.filter_pattern().unwrap_or("-"), 20)
        );
    }
    println!("\nArchives: {}", config.archives_dir.display());
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}
