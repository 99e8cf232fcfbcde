//! Remote URL handling
//!
//! Builds module proxy download URLs for tooth archives and rewrites GitHub
//! URLs onto a configured mirror.
//!
//! ## URL formats
//!
//! - `https://goproxy.io/github.com/!tooth-!hub/example/@v/v1.0.0.zip` - tooth archive
//!   on a Go module proxy (uppercase letters escaped as `!` + lowercase)
//! - `https://github.com/owner/repo/releases/download/v1.0.0/asset.zip` - companion asset
//! - `https://mirror.example.com/owner/repo/releases/download/v1.0.0/asset.zip` - same asset
//!   after mirror rewriting
//!
//! Rewriting always happens before the cache key is derived, so the mirror and
//! the origin are cached as distinct entries.

pub mod fetch;

pub use fetch::{DownloadError, Downloader, HttpDownloader, CONNECT_TIMEOUT, REQUEST_TIMEOUT};

use crate::semver::Version;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Host recognized as GitHub
pub const GITHUB_HOST: &str = "github.com";

/// Errors that can occur while building or rewriting URLs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    /// URL could not be parsed
    #[error("Invalid URL {url}: {reason}")]
    Parse { url: String, reason: String },

    /// URL cannot serve as a base for path joining
    #[error("URL cannot be used as a base: {0}")]
    NotABase(String),

    /// Repository path rejected by module path rules
    #[error("Invalid tooth repository path: {0}")]
    InvalidRepoPath(String),
}

/// Parse an absolute URL
pub fn parse_url(s: &str) -> Result<Url, UrlError> {
    Url::parse(s).map_err(|e| UrlError::Parse {
        url: s.to_string(),
        reason: e.to_string(),
    })
}

/// Check whether a URL points at GitHub
pub fn is_github_url(url: &Url) -> bool {
    url.host_str() == Some(GITHUB_HOST)
}

/// Substitute the mirror's scheme and host (and path prefix) into `url`
///
/// The original path, query and fragment are kept as-is.
pub fn github_mirror_url(url: &Url, mirror: &Url) -> Result<Url, UrlError> {
    if mirror.cannot_be_a_base() || mirror.host_str().is_none() {
        return Err(UrlError::NotABase(mirror.to_string()));
    }

    let mut rewritten = mirror.clone();
    let prefix = mirror.path().trim_end_matches('/');
    rewritten.set_path(&format!("{}{}", prefix, url.path()));
    rewritten.set_query(url.query());
    rewritten.set_fragment(url.fragment());
    Ok(rewritten)
}

/// Rewrite `url` onto `mirror` when it points at GitHub
///
/// Returns the input unchanged when no mirror is configured or the host is
/// not recognized.
pub fn maybe_rewrite(url: &Url, mirror: Option<&Url>) -> Result<Url, UrlError> {
    match mirror {
        Some(mirror) if is_github_url(url) => {
            let rewritten = github_mirror_url(url, mirror)?;
            info!("GitHub URL detected. Rewrite URL to {}", rewritten);
            Ok(rewritten)
        }
        _ => Ok(url.clone()),
    }
}

/// Escape a module path the way Go module proxies expect
///
/// Every uppercase ASCII letter becomes `!` followed by its lowercase form.
/// The path must be non-empty, must not start or end with `/`, must not
/// contain empty, `.` or `..` segments, and may only use `[A-Za-z0-9-._~/]`.
pub fn escape_module_path(path: &str) -> Result<String, UrlError> {
    let invalid = || UrlError::InvalidRepoPath(path.to_string());

    if path.is_empty() || path.starts_with('/') || path.ends_with('/') {
        return Err(invalid());
    }
    if path
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(invalid());
    }

    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        match c {
            'A'..='Z' => {
                escaped.push('!');
                escaped.push(c.to_ascii_lowercase());
            }
            'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' | '/' => escaped.push(c),
            _ => return Err(invalid()),
        }
    }
    Ok(escaped)
}

/// Escape a Go module version (`!` + lowercase for uppercase letters)
fn escape_version(version: &str) -> String {
    let mut escaped = String::with_capacity(version.len());
    for c in version.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Build the module proxy URL of a tooth archive
///
/// `<proxy>/<escaped repo path>/@v/<go version>.zip`
pub fn go_module_zip_url(proxy: &Url, repo_path: &str, version: &Version) -> Result<Url, UrlError> {
    let escaped_path = escape_module_path(repo_path)?;
    let go_version = escape_version(&version.to_go_module_version());

    let mut url = proxy.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| UrlError::NotABase(proxy.to_string()))?;
        segments.pop_if_empty();
        for segment in escaped_path.split('/') {
            segments.push(segment);
        }
        segments.push("@v");
        segments.push(&format!("{}.zip", go_version));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
