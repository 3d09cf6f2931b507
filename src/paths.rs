//! Resolution of caller-supplied paths before they reach the loader.

use crate::error::GscError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves `path` to an absolute, existing location.
///
/// A leading `~` expands to `$HOME`. Relative paths are joined to `base_dir`
/// when given, otherwise to the current working directory. The result is
/// canonicalized; anything that does not exist yields
/// [`GscError::PathNotFound`].
pub fn resolve_path(path: &str, base_dir: Option<&Path>) -> Result<PathBuf, GscError> {
    let home = std::env::var("HOME").ok();
    let expanded = expand_home(path, home.as_deref());

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match base_dir {
            Some(base) => base.join(expanded),
            None => std::env::current_dir()
                .map_err(|source| GscError::Io {
                    path: expanded.clone(),
                    source,
                })?
                .join(expanded),
        }
    };

    let resolved = absolute
        .canonicalize()
        .map_err(|_| GscError::PathNotFound(absolute.clone()))?;
    debug!(input = path, resolved = %resolved.display(), "Resolved path");
    Ok(resolved)
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => PathBuf::from(home),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}
