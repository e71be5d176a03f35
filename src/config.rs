use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub destination: PathBuf,
    #[serde(default)]
    pub max_videos: usize,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "filenametemplate")]
    pub filename_template: Option<String>,
}

impl Subscription {
    /// Filter pattern, treating an empty string as "no filter".
    pub fn filter_pattern(&self) -> Option<&str> {
        self.filter.as_deref().filter(|pattern| !pattern.is_empty())
    }

    /// Name used in logs, even for an entry that left `name` out.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            "<unnamed>"
        } else {
            &self.name
        }
    }

    /// Rejects an entry missing a key it cannot run without.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("name", self.name.is_empty()),
            ("url", self.url.is_empty()),
            ("destination", self.destination.as_os_str().is_empty()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::InvalidSubscription {
            subscription: self.label().to_string(),
            reason: format!("missing {}", missing.join(", ")),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub archives_dir: PathBuf,
    #[serde(default)]
    pub downloads_dir: PathBuf,
}

impl Config {
    /// Loads the config at `path`. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("Config file not found at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config = Self::parse(&raw).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            subscriptions = config.subscriptions.len(),
            "loaded config from {}",
            path.display()
        );
        Ok(config)
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Fills in `archives_dir` when the file leaves it unset.
    pub fn with_default_archives_dir<E>(
        mut self,
        fallback: impl FnOnce() -> std::result::Result<PathBuf, E>,
    ) -> std::result::Result<Self, E> {
        if self.archives_dir.as_os_str().is_empty() {
            self.archives_dir = fallback()?;
        }
        Ok(self)
    }

    pub fn archive_file(&self, sub: &Subscription) -> PathBuf {
        self.archives_dir.join(format!("{}.txt", sub.name))
    }

    pub fn destination(&self, sub: &Subscription) -> PathBuf {
        self.downloads_dir.join(&sub.destination)
    }
}
