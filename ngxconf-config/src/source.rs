//! Configuration sources
//!
//! The parser works on text that is already in memory. This module is the
//! glue that turns a path into that text.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Longest prefix of a rejected source shown in errors
const PREVIEW_LEN: usize = 32;

/// Errors raised before tokenizing starts
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not a file path: {preview:?}")]
    NotAPath { preview: String },

    #[error("Config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Config file {} is not valid UTF-8", .path.display())]
    InvalidUtf8 { path: PathBuf },
}

/// Read a configuration file into memory.
///
/// Config text passed in place of a path is rejected: anything empty or
/// containing a newline or NUL is not treated as a path at all.
pub fn read_source(path: impl AsRef<Path>) -> Result<String, SourceError> {
    let path = path.as_ref();
    ensure_path_like(path)?;

    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SourceError::NotFound {
            path: path.to_path_buf(),
        },
        _ => SourceError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let source = String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8 {
        path: path.to_path_buf(),
    })?;

    tracing::debug!(path = %path.display(), bytes = source.len(), "loaded config source");
    Ok(source)
}

fn ensure_path_like(path: &Path) -> Result<(), SourceError> {
    let raw = path.as_os_str().to_string_lossy();
    if raw.is_empty() || raw.contains(['\n', '\0']) {
        return Err(SourceError::NotAPath {
            preview: raw.chars().take(PREVIEW_LEN).collect(),
        });
    }
    Ok(())
}
