//! Fetch command
//!
//! Fetches tooth archives and their companion assets into the cache.

use crate::artifact::ArtifactFetcher;
use crate::error::FetchError;
use crate::semver::{SemverError, Version};
use crate::tooth::ArchiveOpener;
use crate::url::Downloader;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while fetching teeth
#[derive(Debug, Error)]
pub enum FetchCommandError {
    /// Specifier is not `<repo path>@<version>`
    #[error("Invalid tooth specifier '{0}': expected <repo path>@<version>")]
    InvalidSpecifier(String),

    /// Version part of a specifier is not semver
    #[error("Invalid version in '{specifier}': {source}")]
    InvalidVersion {
        specifier: String,
        source: SemverError,
    },

    /// Archive fetch failed
    #[error("Failed to fetch {specifier}: {source}")]
    Archive {
        specifier: ToothSpecifier,
        source: FetchError,
    },

    /// Companion asset fetch failed; the archive stays cached
    #[error("Failed to fetch asset of {specifier}: {source}")]
    Asset {
        specifier: ToothSpecifier,
        source: FetchError,
    },
}

/// A requested tooth: `<repo path>@<version>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToothSpecifier {
    pub repo_path: String,
    pub version: Version,
}

impl FromStr for ToothSpecifier {
    type Err = FetchCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (repo_path, version) = s
            .rsplit_once('@')
            .filter(|(path, version)| !path.is_empty() && !version.is_empty())
            .ok_or_else(|| FetchCommandError::InvalidSpecifier(s.to_string()))?;

        let version = Version::parse(version).map_err(|source| FetchCommandError::InvalidVersion {
            specifier: s.to_string(),
            source,
        })?;

        Ok(Self {
            repo_path: repo_path.to_string(),
            version,
        })
    }
}

impl fmt::Display for ToothSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repo_path, self.version)
    }
}

/// Fetch result
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    /// Archives downloaded from the module proxy
    pub downloaded: usize,

    /// Archives served from the cache
    pub cached: usize,

    /// Companion assets present after the run
    pub assets: usize,
}

/// Fetch every specifier's archive and companion asset
///
/// Stops at the first failure. Archives fetched before the failure stay in
/// the cache; nothing is rolled back.
pub fn fetch_teeth<D, O>(
    fetcher: &ArtifactFetcher<D, O>,
    specifiers: &[ToothSpecifier],
) -> Result<FetchSummary, FetchCommandError>
where
    D: Downloader,
    O: ArchiveOpener,
{
    let mut summary = FetchSummary::default();

    for specifier in specifiers {
        let was_cached = fetcher
            .package_archive_url(&specifier.repo_path, &specifier.version)
            .and_then(|url| fetcher.cache().contains(&url))
            .map_err(|source| FetchCommandError::Archive {
                specifier: specifier.clone(),
                source,
            })?;

        let archive = fetcher
            .fetch_package_archive(&specifier.repo_path, &specifier.version)
            .map_err(|source| FetchCommandError::Archive {
                specifier: specifier.clone(),
                source,
            })?;

        if was_cached {
            summary.cached += 1;
        } else {
            summary.downloaded += 1;
        }

        let asset = fetcher
            .fetch_companion_asset(&archive)
            .map_err(|source| FetchCommandError::Asset {
                specifier: specifier.clone(),
                source,
            })?;

        match asset {
            Some(asset) => {
                info!("  {} -> {}", specifier, archive.path().display());
                info!("    asset -> {}", asset.path.display());
                summary.assets += 1;
            }
            None => info!("  {} -> {}", specifier, archive.path().display()),
        }
    }

    Ok(summary)
}
