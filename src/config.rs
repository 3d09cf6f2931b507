//! Runtime settings read from the environment.
//!
//! `.env` files are loaded by the binary before [`Settings::from_env`] runs:
//!
//! ```text
//! LOG_FILE_PATH=logs/seo_gsc_analysis.log
//! GSC_DATA_DIR=/srv/exports
//! ```

use std::env::VarError;
use std::path::PathBuf;

pub const DEFAULT_LOG_FILE_PATH: &str = "logs/seo_gsc_analysis.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Destination of the rolling JSON log file.
    pub log_file_path: PathBuf,
    /// Directory that relative export paths are resolved against.
    /// Falls back to the working directory when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_file_path: PathBuf::from(DEFAULT_LOG_FILE_PATH),
            data_dir: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Builds settings from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Result<String, VarError>) -> Self {
        let var = |key: &str| lookup(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            log_file_path: var("LOG_FILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_PATH)),
            data_dir: var("GSC_DATA_DIR").map(PathBuf::from),
        }
    }
}
