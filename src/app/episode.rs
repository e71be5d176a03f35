use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::config::Subscription;

static EPISODE_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"E\d+.*\.mp4$").expect("valid episode regex"));

pub(crate) fn is_episode_file(file_name: &str) -> bool {
    EPISODE_FILE.is_match(file_name)
}

/// Counts files in `dir` that look like already numbered episodes.
pub(crate) fn count_existing_episodes(dir: &Path) -> io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read entry in {}: {err}", dir.display());
                continue;
            }
        };
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            warn!(
                "skipping non UTF-8 file name {:?} in {}",
                name,
                dir.display()
            );
            continue;
        };
        if is_episode_file(name) {
            count += 1;
        }
    }
    Ok(count)
}

/// Output template handed to the fetch tool for one episode. `{name}` and
/// `{episode}` are expanded in custom templates; yt-dlp fields pass through.
pub(crate) fn output_filename(sub: &Subscription, episode: usize) -> String {
    let episode = format!("{episode:03}");
    match sub.filename_template.as_deref() {
        Some(template) if !template.is_empty() => template
            .replace("{name}", &sub.name)
            .replace("{episode}", &episode),
        _ => format!("{} E{episode} [%(id)s].%(ext)s", sub.name),
    }
}
