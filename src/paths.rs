use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::error::Error;

const APP_DIR: &str = "auto-yt-dlp";
const DEFAULT_FETCH_BIN: &str = "yt-dlp";

pub fn config_file_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    config_file_path_from(flag, env::var_os("CONFIG"))
}

pub(crate) fn config_file_path_from(
    flag: Option<PathBuf>,
    env_value: Option<OsString>,
) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    match env_value {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => {
            let base = dirs::config_dir().context("unable to resolve config directory")?;
            Ok(base.join(APP_DIR).join("config.yaml"))
        }
    }
}

pub fn default_archives_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join(APP_DIR).join("archives"))
}

pub(crate) fn fetch_bin_from_env(env_value: Option<OsString>) -> PathBuf {
    match env_value {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_FETCH_BIN),
    }
}

/// Locates the fetch tool, honouring `AUTO_YT_DLP_BIN`.
pub fn resolve_fetch_bin() -> Result<PathBuf, Error> {
    let wanted = fetch_bin_from_env(env::var_os("AUTO_YT_DLP_BIN"));
    which::which(&wanted).map_err(|source| Error::MissingDependency {
        binary: wanted.display().to_string(),
        source,
    })
}
