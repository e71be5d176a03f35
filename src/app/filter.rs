use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info, warn};

use super::VideoInfo;
use crate::config::Subscription;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FilterOutcome {
    pub(crate) to_download: Vec<VideoInfo>,
    pub(crate) filtered: usize,
    pub(crate) skipped: usize,
}

enum TitleFilter {
    All,
    Pattern(Regex),
    Invalid { pattern: String, reason: String },
}

impl TitleFilter {
    fn for_subscription(sub: &Subscription) -> Self {
        match sub.filter_pattern() {
            None => TitleFilter::All,
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => TitleFilter::Pattern(re),
                Err(err) => TitleFilter::Invalid {
                    pattern: pattern.to_string(),
                    reason: err.to_string(),
                },
            },
        }
    }

    fn admits(&self, sub: &Subscription, video: &VideoInfo) -> bool {
        match self {
            TitleFilter::All => true,
            TitleFilter::Pattern(re) => re.is_match(&video.title),
            TitleFilter::Invalid { pattern, reason } => {
                warn!(
                    subscription = %sub.name,
                    video = %video.id,
                    "invalid filter pattern '{pattern}', treating '{}' as a non-match: {reason}",
                    video.title
                );
                false
            }
        }
    }
}

/// Splits listed videos into those to download, those rejected by the
/// title filter and those already in the archive. Archived videos never
/// reach the filter. Listing order is preserved.
pub(crate) fn partition_videos(
    videos: Vec<VideoInfo>,
    sub: &Subscription,
    archived: &HashSet<String>,
) -> FilterOutcome {
    let filter = TitleFilter::for_subscription(sub);
    let mut outcome = FilterOutcome::default();

    for video in videos {
        if archived.contains(&video.id) {
            outcome.skipped += 1;
            info!(
                "Skipping already downloaded video: {} (Title: {})",
                video.id, video.title
            );
            continue;
        }

        if filter.admits(sub, &video) {
            debug!("Video passed filter: {} (Title: {})", video.id, video.title);
            outcome.to_download.push(video);
        } else {
            outcome.filtered += 1;
        }
    }

    outcome
}
