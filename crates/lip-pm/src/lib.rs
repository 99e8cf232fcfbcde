//! Lip Package Manager Library
//!
//! This crate provides the fetch core of the lip package manager, including:
//! - URL-keyed download cache (check-then-fetch, at most one download per URL)
//! - Go module proxy URLs for tooth archives
//! - GitHub mirror rewriting for companion assets
//! - Tooth archive opening and identity validation
//! - Configuration (config.toml + environment)

pub mod artifact;
pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod semver;
pub mod tooth;
pub mod url;

pub use artifact::{validate_archive, ArtifactFetcher, FetchState, StateObserver};
pub use cache::{cache_key, cache_path, CachedFile, DownloadCache, KeyLocks};
pub use commands::{fetch_teeth, FetchCommandError, FetchSummary, ToothSpecifier};
pub use config::{Config, ConfigError, Context, FetchOptions, Verbosity};
pub use error::{ErrorKind, FetchError, ValidationError};
pub use crate::semver::{SemverError, Version};
pub use tooth::{ArchiveError, ArchiveOpener, ToothArchive, ToothMetadata, ZipArchiveOpener};
pub use crate::url::{
    go_module_zip_url, is_github_url, maybe_rewrite, DownloadError, Downloader, HttpDownloader,
    UrlError,
};
