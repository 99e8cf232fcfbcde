//! Errors surfaced by the fetch core

use crate::config::ConfigError;
use crate::tooth::ArchiveError;
use crate::url::{DownloadError, UrlError};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Attributable failure class of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Filesystem,
    Network,
    Url,
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Config => "config",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Network => "network",
            ErrorKind::Url => "url",
            ErrorKind::Validation => "validation",
        };
        f.write_str(s)
    }
}

/// A fetched archive does not match the requested identity
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tooth repo path mismatch: expected {expected}, got {actual}")]
    RepoPathMismatch { expected: String, actual: String },

    #[error("tooth version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

/// Errors that can occur while fetching into the cache
#[derive(Debug, Error)]
pub enum FetchError {
    /// Cache directory or proxy URL could not be resolved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Stat of a cache entry failed for a reason other than absence
    #[error("Failed to check if {} exists: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Download of a cache miss failed
    #[error("Failed to download {url}: {source}")]
    Network { url: String, source: DownloadError },

    /// URL malformed or unconstructable
    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    /// Archive could not be opened or its metadata read
    #[error("Failed to open archive {}: {source}", path.display())]
    Archive { path: PathBuf, source: ArchiveError },

    /// Archive identity does not match the request
    #[error("Failed to validate archive {}: {source}", path.display())]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Config(_) => ErrorKind::Config,
            FetchError::Filesystem { .. } => ErrorKind::Filesystem,
            FetchError::Network { .. } => ErrorKind::Network,
            FetchError::Url(_) => ErrorKind::Url,
            FetchError::Archive { .. } | FetchError::Validation { .. } => ErrorKind::Validation,
        }
    }
}
