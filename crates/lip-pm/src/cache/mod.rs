//! Download cache
//!
//! Maps remote URLs to files in a single flat cache directory and fetches
//! them at most once.
//!
//! Directory structure:
//! ```text
//! <cache dir>/
//! ├── https%3A%2F%2Fgoproxy.io%2Fgithub.com%2F%21tooth-%21hub%2Fexample%2F%40v%2Fv1.0.0.zip
//! ├── https%3A%2F%2Fgithub.com%2Fowner%2Frepo%2Freleases%2Fdownload%2Fv1.0.0%2Fasset.zip
//! └── ...
//! ```
//!
//! The file name is the percent-escaped URL string, so the mapping is a pure
//! function of the URL. Nothing in this module ever deletes an entry.

mod lock;

pub use lock::{KeyGuard, KeyLocks};

use crate::config::FetchOptions;
use crate::error::FetchError;
use crate::url::Downloader;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Bytes left unescaped in cache file names
///
/// Everything except ASCII alphanumerics and `-._~` is escaped, which keeps
/// names free of path separators and reserved characters on every platform.
const CACHE_KEY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Escape a URL into a cache file name
pub fn cache_key(url: &Url) -> String {
    utf8_percent_encode(url.as_str(), CACHE_KEY_ESCAPE).to_string()
}

/// Path of the cache entry for `url` inside `cache_dir`
pub fn cache_path(cache_dir: &Path, url: &Url) -> PathBuf {
    cache_dir.join(cache_key(url))
}

/// A file guaranteed present in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    /// URL the file was fetched from
    pub url: Url,
    /// Local path of the cached file
    pub path: PathBuf,
    /// `true` when no download was needed
    pub hit: bool,
}

/// Flat, URL-keyed download cache
#[derive(Debug)]
pub struct DownloadCache {
    /// Cache root directory
    root: PathBuf,
    locks: KeyLocks,
}

impl DownloadCache {
    /// Create a cache rooted at `root`
    ///
    /// The directory is created lazily by the downloader on the first miss.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            locks: KeyLocks::new(),
        }
    }

    /// Get the cache root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the cache entry for `url`
    pub fn cache_path(&self, url: &Url) -> PathBuf {
        cache_path(&self.root, url)
    }

    /// Check whether `url` is already cached
    pub fn contains(&self, url: &Url) -> Result<bool, FetchError> {
        let path = self.cache_path(url);
        match fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(FetchError::Filesystem { path, source }),
        }
    }

    /// Make sure `url` is present in the cache, downloading it on a miss
    ///
    /// # Returns
    /// * `Ok(CachedFile)` - Local path, with `hit` telling whether the network was used
    /// * `Err(FetchError::Filesystem)` - The entry could not be checked; nothing was downloaded
    /// * `Err(FetchError::Network)` - The download failed
    pub fn ensure_cached<D>(
        &self,
        url: &Url,
        downloader: &D,
        options: FetchOptions,
    ) -> Result<CachedFile, FetchError>
    where
        D: Downloader + ?Sized,
    {
        let key = cache_key(url);
        let path = self.root.join(&key);
        let _guard = self.locks.acquire(&key);

        match fs::metadata(&path) {
            Ok(_) => {
                debug!(url = %url, path = %path.display(), "cache hit");
                Ok(CachedFile {
                    url: url.clone(),
                    path,
                    hit: true,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("Downloading {}...", url);
                downloader
                    .download(url, &path, options.show_progress)
                    .map_err(|source| FetchError::Network {
                        url: url.to_string(),
                        source,
                    })?;
                Ok(CachedFile {
                    url: url.clone(),
                    path,
                    hit: false,
                })
            }
            Err(source) => Err(FetchError::Filesystem { path, source }),
        }
    }
}
