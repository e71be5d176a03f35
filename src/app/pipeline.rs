use std::fs;
use std::path::Path;

use tracing::{error, info, warn};

use super::archive::read_archive_ids;
use super::episode::{count_existing_episodes, output_filename};
use super::fetcher::VideoFetcher;
use super::filter::partition_videos;
use crate::config::{Config, Subscription};
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SubscriptionSummary {
    pub(crate) name: String,
    pub(crate) listed: usize,
    pub(crate) downloaded: usize,
    pub(crate) failed: usize,
    pub(crate) filtered: usize,
    pub(crate) skipped: usize,
    /// Videos that would have been downloaded in a dry run.
    pub(crate) planned: usize,
}

#[derive(Debug, Default)]
pub(crate) struct RunSummary {
    pub(crate) completed: Vec<SubscriptionSummary>,
    pub(crate) aborted: usize,
}

impl RunSummary {
    pub(crate) fn downloaded(&self) -> usize {
        self.completed.iter().map(|summary| summary.downloaded).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RunOptions {
    pub(crate) dry_run: bool,
}

/// Processes every subscription in order. A failing subscription is logged
/// and the run moves on to the next one.
pub(crate) fn run_subscriptions(
    config: &Config,
    fetcher: &impl VideoFetcher,
    options: RunOptions,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for sub in &config.subscriptions {
        match process_subscription(config, fetcher, sub, options) {
            Ok(done) => summary.completed.push(done),
            Err(err) => {
                summary.aborted += 1;
                error!(subscription = %sub.label(), "{}", error_chain(&err));
            }
        }
    }
    summary
}

pub(crate) fn process_subscription(
    config: &Config,
    fetcher: &impl VideoFetcher,
    sub: &Subscription,
    options: RunOptions,
) -> Result<SubscriptionSummary> {
    info!("Handling subscription: {}", sub.label());
    sub.validate()?;

    let archive_file = config.archive_file(sub);
    let destination = config.destination(sub);
    ensure_dir(&config.archives_dir)?;
    ensure_dir(&destination)?;

    let videos = fetcher.list(sub)?;
    info!(
        "Found {} videos for subscription: {}",
        videos.len(),
        sub.name
    );

    let mut summary = SubscriptionSummary {
        name: sub.name.clone(),
        listed: videos.len(),
        ..SubscriptionSummary::default()
    };

    let archived = read_archive_ids(&archive_file);
    let outcome = partition_videos(videos, sub, &archived);
    summary.filtered = outcome.filtered;
    summary.skipped = outcome.skipped;

    if outcome.to_download.is_empty() {
        info!(
            "No videos to download for subscription: {} (Filtered: {}, Skipped: {})",
            sub.name, summary.filtered, summary.skipped
        );
        return Ok(summary);
    }

    let existing = count_existing_episodes(&destination).map_err(|source| Error::ReadDir {
        path: destination.clone(),
        source,
    })?;

    for video in &outcome.to_download {
        let episode = existing + summary.downloaded + summary.planned + 1;
        let output = destination.join(output_filename(sub, episode));

        if options.dry_run {
            summary.planned += 1;
            info!(
                "Would download video: {} (Title: {}) as {}",
                video.id,
                video.title,
                output.display()
            );
            continue;
        }

        if fetcher.download(video, &output, &archive_file) {
            summary.downloaded += 1;
            info!(
                "Downloaded video: {} (Title: {})",
                video.id, video.title
            );
        } else {
            summary.failed += 1;
            warn!(
                subscription = %sub.name,
                "Failed to download video: {} (Title: {})",
                video.id,
                video.title
            );
        }
    }

    if options.dry_run {
        info!(
            "Subscription {} dry run: {} to download, Filtered {}, Skipped {}",
            sub.name, summary.planned, summary.filtered, summary.skipped
        );
    } else {
        info!(
            "Subscription {} completed: Downloaded {} videos, Failed {}, Filtered {}, Skipped {}",
            sub.name, summary.downloaded, summary.failed, summary.filtered, summary.skipped
        );
    }
    Ok(summary)
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|source| Error::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
