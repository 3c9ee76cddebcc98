//! Expansion of text source patterns into file lists.
//!
//! A pattern containing glob metacharacters (`*`, `?`, `[`) is matched against
//! the filesystem; anything else names exactly one file.

use crate::error::{PipelineError, Result};
use glob::glob;
use std::io;
use std::path::PathBuf;

/// Whether `pattern` contains glob metacharacters.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand `pattern` into a sorted list of files.
///
/// # Errors
/// `SourceNotFound` when the pattern is malformed, a match cannot be read, or
/// nothing matches.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    if !is_glob(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }
    let not_found = |kind: io::ErrorKind, msg: String| PipelineError::SourceNotFound {
        path: PathBuf::from(pattern),
        source: io::Error::new(kind, msg),
    };

    let paths = glob(pattern).map_err(|e| not_found(io::ErrorKind::InvalidInput, e.to_string()))?;
    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| PipelineError::SourceNotFound {
            path: e.path().to_path_buf(),
            source: e.into_error(),
        })?;
        // Only include actual files, not directories
        if path.is_file() {
            result.push(path);
        }
    }
    if result.is_empty() {
        return Err(not_found(
            io::ErrorKind::NotFound,
            format!("no files match pattern {pattern}"),
        ));
    }
    result.sort();
    Ok(result)
}

/// Display helper for log lines listing files.
pub(crate) fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
