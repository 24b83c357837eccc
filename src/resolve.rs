//! Turning raw arguments into readable absolute paths.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{AuditError, Result};

/// Leading character that marks an argument as a list-file.
pub const LIST_MARKER: char = '@';

/// Resolve `raw` to an existing, readable, absolute path.
///
/// `raw` is tried as given first. Only when it does not exist are the
/// `search_dirs` tried, in order, joined with `raw`; the first existing
/// candidate wins. An existing but unreadable path is reported as such
/// and never falls through to the search directories.
pub async fn resolve(raw: &str, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    if raw.is_empty() {
        return Err(AuditError::invalid_argument(raw, "empty path"));
    }

    let direct = PathBuf::from(raw);
    let candidates = std::iter::once(direct.clone()).chain(
        search_dirs
            .iter()
            .filter(|_| direct.is_relative())
            .map(|dir| dir.join(&direct)),
    );

    for candidate in candidates {
        match fs::metadata(&candidate).await {
            Ok(meta) => {
                check_readable(&candidate, meta.is_dir()).await?;
                return std::path::absolute(&candidate)
                    .map_err(|e| AuditError::not_readable(&candidate, e));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(AuditError::not_readable(&candidate, e)),
        }
    }

    Err(AuditError::NotFound {
        argument: raw.to_string(),
    })
}

/// Prove `path` can be read by actually opening it.
pub async fn check_readable(path: &Path, is_dir: bool) -> Result<()> {
    let opened = if is_dir {
        fs::read_dir(path).await.map(drop)
    } else {
        fs::File::open(path).await.map(drop)
    };
    opened.map_err(|e| AuditError::not_readable(path, e))
}
