use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

/// Reads the ids recorded in a download archive. A missing or unreadable
/// ledger yields an empty set; invalid UTF-8 only affects the lines it is on.
pub(crate) fn read_archive_ids(path: &Path) -> HashSet<String> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no archive yet at {}", path.display());
            return HashSet::new();
        }
        Err(err) => {
            warn!("failed to read archive at {}: {err}", path.display());
            return HashSet::new();
        }
    };

    let (ids, skipped_lines) = parse_archive(&String::from_utf8_lossy(&raw));
    if skipped_lines > 0 {
        warn!(
            "ignored {skipped_lines} malformed line(s) in {}",
            path.display()
        );
    }
    ids
}

/// Lines look like `youtube dQw4w9WgXcQ`; only the second field matters.
pub(crate) fn parse_archive(raw: &str) -> (HashSet<String>, usize) {
    let mut ids = HashSet::new();
    let mut skipped_lines = 0;
    for line in raw.lines() {
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(_), Some(id)) => {
                ids.insert(id.to_string());
            }
            (Some(_), None) => skipped_lines += 1,
            _ => {}
        }
    }
    (ids, skipped_lines)
}
