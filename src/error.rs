//! Error types for the subscription pipeline.
//!
//! `MissingDependency` and the config variants are fatal and surface from
//! `main`. Invalid entries, directory and listing failures abort a single
//! subscription.
//! Malformed listing lines, bad filter patterns and failed downloads are
//! never returned as errors; they are logged where they happen.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("required tool `{binary}` was not found, please install yt-dlp")]
    MissingDependency {
        binary: String,
        #[source]
        source: which::Error,
    },

    #[error("failed to read config {}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid subscription {subscription}: {reason}")]
    InvalidSubscription {
        subscription: String,
        reason: String,
    },

    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list videos for {subscription}: {reason}")]
    Listing {
        subscription: String,
        reason: String,
    },
}

impl Error {
    pub(crate) fn listing(subscription: &str, reason: impl Into<String>) -> Self {
        Error::Listing {
            subscription: subscription.to_string(),
            reason: reason.into(),
        }
    }
}
