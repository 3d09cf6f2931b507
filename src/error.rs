//! Error types for loading and analyzing search-console exports.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving, reading, or validating an export file.
///
/// Malformed numeric cells are not represented here: the loader repairs them
/// to `0.0` instead of failing.
#[derive(Debug, Error)]
pub enum GscError {
    /// The requested path does not exist on disk.
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The file extension is neither `.csv` nor `.json`.
    #[error("Unsupported file format for {}. Use CSV or JSON.", .0.display())]
    UnsupportedFormat(PathBuf),

    /// One or more required columns are absent. Names are sorted.
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON document parsed but is neither records nor columns.
    #[error("unexpected JSON layout: {0}")]
    JsonLayout(String),
}

impl GscError {
    /// Returns the sorted missing column names for [`GscError::MissingColumns`].
    pub fn missing_columns(&self) -> Option<&[String]> {
        match self {
            GscError::MissingColumns(cols) => Some(cols),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_names() {
        let err = GscError::MissingColumns(vec!["ctr".into(), "page".into()]);
        assert_eq!(err.to_string(), r#"Missing required columns: ["ctr", "page"]"#);
        assert_eq!(err.missing_columns().unwrap(), ["ctr", "page"]);
    }

    #[test]
    fn test_path_not_found_message() {
        let err = GscError::PathNotFound(PathBuf::from("/no/such/file.csv"));
        assert_eq!(err.to_string(), "Path does not exist: /no/such/file.csv");
        assert!(err.missing_columns().is_none());
    }
}
