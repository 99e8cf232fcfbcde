//! Tooth artifact fetching
//!
//! Composes URL building, mirror rewriting and the download cache into the
//! two guarantees an installer needs:
//!
//! - a tooth archive is present locally and declares the requested identity
//! - the archive's companion asset, if it declares one, is present locally
//!
//! Per fetch the flow is
//! `Requested → UrlBuilt → (MirrorChecked) → CacheChecked → {CacheHit | Downloading → Downloaded} → Validated → Ready`,
//! and any step may end in `Failed`.

use crate::cache::{CachedFile, DownloadCache};
use crate::config::{Context, FetchOptions};
use crate::error::{FetchError, ValidationError};
use crate::semver::Version;
use crate::tooth::{ArchiveOpener, ToothArchive, ZipArchiveOpener};
use crate::url::{
    go_module_zip_url, maybe_rewrite, parse_url, DownloadError, Downloader, HttpDownloader,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Progress of a single artifact fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Requested,
    UrlBuilt,
    MirrorChecked,
    CacheChecked,
    CacheHit,
    Downloading,
    Downloaded,
    Validated,
    Ready,
    Failed,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Ready | FetchState::Failed)
    }
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchState::Requested => "requested",
            FetchState::UrlBuilt => "url-built",
            FetchState::MirrorChecked => "mirror-checked",
            FetchState::CacheChecked => "cache-checked",
            FetchState::CacheHit => "cache-hit",
            FetchState::Downloading => "downloading",
            FetchState::Downloaded => "downloaded",
            FetchState::Validated => "validated",
            FetchState::Ready => "ready",
            FetchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Receives every state an artifact fetch passes through
///
/// The first argument names the artifact (`<repo path>@<version>` or
/// `<repo path> asset`).
pub type StateObserver = Arc<dyn Fn(&str, FetchState) + Send + Sync>;

/// Reports the miss when the cache hands a URL to the transport
struct Traced<'a, D, O> {
    fetcher: &'a ArtifactFetcher<D, O>,
    target: &'a str,
}

impl<D: Downloader, O: ArchiveOpener> Downloader for Traced<'_, D, O> {
    fn download(&self, url: &Url, dest: &Path, show_progress: bool) -> Result<(), DownloadError> {
        self.fetcher.transition(self.target, FetchState::CacheChecked);
        self.fetcher.transition(self.target, FetchState::Downloading);
        self.fetcher.downloader.download(url, dest, show_progress)
    }
}

/// Check that an archive declares the requested identity
pub fn validate_archive(
    archive: &ToothArchive,
    repo_path: &str,
    version: &Version,
) -> Result<(), ValidationError> {
    let metadata = archive.metadata();
    if metadata.tooth_repo_path() != repo_path {
        return Err(ValidationError::RepoPathMismatch {
            expected: repo_path.to_string(),
            actual: metadata.tooth_repo_path().to_string(),
        });
    }
    if metadata.version() != version {
        return Err(ValidationError::VersionMismatch {
            expected: version.to_string(),
            actual: metadata.version().to_string(),
        });
    }
    Ok(())
}

/// Fetches tooth archives and their companion assets through the cache
pub struct ArtifactFetcher<D = HttpDownloader, O = ZipArchiveOpener> {
    cache: DownloadCache,
    go_module_proxy_url: Url,
    github_mirror_url: Option<Url>,
    options: FetchOptions,
    observer: Option<StateObserver>,
    downloader: D,
    opener: O,
}

impl<D: fmt::Debug, O: fmt::Debug> fmt::Debug for ArtifactFetcher<D, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactFetcher")
            .field("cache", &self.cache)
            .field("go_module_proxy_url", &self.go_module_proxy_url)
            .field("github_mirror_url", &self.github_mirror_url)
            .field("options", &self.options)
            .field("downloader", &self.downloader)
            .field("opener", &self.opener)
            .finish_non_exhaustive()
    }
}

impl<D: Downloader, O: ArchiveOpener> ArtifactFetcher<D, O> {
    /// Create a fetcher
    ///
    /// # Arguments
    /// * `cache` - Download cache to fetch into
    /// * `go_module_proxy_url` - Module proxy serving tooth archives
    /// * `github_mirror_url` - Mirror substituted for GitHub asset URLs, if any
    /// * `downloader` - Transport used on cache misses
    /// * `opener` - Reader for downloaded archives
    pub fn new(
        cache: DownloadCache,
        go_module_proxy_url: Url,
        github_mirror_url: Option<Url>,
        downloader: D,
        opener: O,
    ) -> Self {
        Self {
            cache,
            go_module_proxy_url,
            github_mirror_url,
            options: FetchOptions::default(),
            observer: None,
            downloader,
            opener,
        }
    }

    /// Create a fetcher from resolved configuration
    pub fn from_context(ctx: &Context, downloader: D, opener: O) -> Result<Self, FetchError> {
        Ok(Self::new(
            DownloadCache::new(ctx.cache_dir()?),
            ctx.go_module_proxy_url()?,
            ctx.github_mirror_url()?,
            downloader,
            opener,
        ))
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    /// Report every state transition to `observer`
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str, FetchState) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Module proxy URL of a tooth archive
    pub fn package_archive_url(&self, repo_path: &str, version: &Version) -> Result<Url, FetchError> {
        Ok(go_module_zip_url(&self.go_module_proxy_url, repo_path, version)?)
    }

    /// Make sure the archive of `repo_path@version` is cached and matches that identity
    ///
    /// # Returns
    /// * `Ok(ToothArchive)` - The opened, validated archive
    /// * `Err(FetchError)` - Url, Filesystem, Network or Validation failure
    pub fn fetch_package_archive(
        &self,
        repo_path: &str,
        version: &Version,
    ) -> Result<ToothArchive, FetchError> {
        let target = format!("{}@{}", repo_path, version);
        self.transition(&target, FetchState::Requested);
        self.try_fetch_package_archive(&target, repo_path, version)
            .inspect_err(|e| self.fail(&target, e))
    }

    fn try_fetch_package_archive(
        &self,
        target: &str,
        repo_path: &str,
        version: &Version,
    ) -> Result<ToothArchive, FetchError> {
        let url = self.package_archive_url(repo_path, version)?;
        self.transition(target, FetchState::UrlBuilt);

        let cached = self.ensure_cached(target, &url)?;

        let archive = self
            .opener
            .open(&cached.path)
            .map_err(|source| FetchError::Archive {
                path: cached.path.clone(),
                source,
            })?;

        validate_archive(&archive, repo_path, version).map_err(|source| {
            FetchError::Validation {
                path: cached.path.clone(),
                source,
            }
        })?;
        self.transition(target, FetchState::Validated);
        self.transition(target, FetchState::Ready);

        Ok(archive)
    }

    /// Make sure the companion asset declared by `archive` is cached
    ///
    /// GitHub URLs are rewritten onto the configured mirror before the cache
    /// lookup. A failure here does not affect the archive itself.
    ///
    /// # Returns
    /// * `Ok(None)` - The archive declares no asset; nothing was fetched
    /// * `Ok(Some(CachedFile))` - The asset is cached
    /// * `Err(FetchError)` - Url, Filesystem or Network failure
    pub fn fetch_companion_asset(
        &self,
        archive: &ToothArchive,
    ) -> Result<Option<CachedFile>, FetchError> {
        let metadata = archive.metadata();
        let asset_url = metadata.asset_url();
        if asset_url.is_empty() {
            debug!(tooth = metadata.tooth_repo_path(), "no companion asset");
            return Ok(None);
        }

        let target = format!("{} asset", metadata.tooth_repo_path());
        self.transition(&target, FetchState::Requested);
        self.try_fetch_asset(&target, asset_url)
            .map(Some)
            .inspect_err(|e| self.fail(&target, e))
    }

    fn try_fetch_asset(&self, target: &str, asset_url: &str) -> Result<CachedFile, FetchError> {
        let url = parse_url(asset_url)?;
        self.transition(target, FetchState::UrlBuilt);

        let url = maybe_rewrite(&url, self.github_mirror_url.as_ref())?;
        self.transition(target, FetchState::MirrorChecked);

        let cached = self.ensure_cached(target, &url)?;
        self.transition(target, FetchState::Ready);
        Ok(cached)
    }

    fn ensure_cached(&self, target: &str, url: &Url) -> Result<CachedFile, FetchError> {
        let downloader = Traced {
            fetcher: self,
            target,
        };
        let cached = self.cache.ensure_cached(url, &downloader, self.options)?;
        if cached.hit {
            self.transition(target, FetchState::CacheChecked);
            self.transition(target, FetchState::CacheHit);
        } else {
            self.transition(target, FetchState::Downloaded);
        }
        Ok(cached)
    }

    fn transition(&self, target: &str, state: FetchState) {
        if state.is_terminal() {
            debug!(artifact = target, state = %state, "fetch finished");
        } else {
            debug!(artifact = target, state = %state, "fetch state");
        }
        if let Some(observer) = &self.observer {
            observer(target, state);
        }
    }

    fn fail(&self, target: &str, err: &FetchError) {
        warn!(artifact = target, state = %FetchState::Failed, kind = %err.kind(), "{}", err);
        if let Some(observer) = &self.observer {
            observer(target, FetchState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(FetchState::Ready.is_terminal());
        assert!(FetchState::Failed.is_terminal());
        assert!(!FetchState::CacheHit.is_terminal());
        assert!(!FetchState::Requested.is_terminal());
        assert_eq!(FetchState::MirrorChecked.to_string(), "mirror-checked");
    }
}
