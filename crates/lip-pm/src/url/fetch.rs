//! File downloads for cache misses
//!
//! Streams a remote URL into a destination path. Content is written to a
//! temporary sibling first and renamed into place, so a failed download never
//! leaves a partial file at the destination.

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during a download
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { status: u16, url: String },

    /// IO error while writing the destination
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// URL scheme the downloader cannot serve
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}

/// Overall request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport used by the cache on a miss
///
/// Implementations must be atomic: on error, nothing may be left at
/// `dest`.
pub trait Downloader {
    fn download(&self, url: &Url, dest: &Path, show_progress: bool) -> Result<(), DownloadError>;
}

impl<T: Downloader + ?Sized> Downloader for &T {
    fn download(&self, url: &Url, dest: &Path, show_progress: bool) -> Result<(), DownloadError> {
        (**self).download(url, dest, show_progress)
    }
}

impl<T: Downloader + ?Sized> Downloader for Box<T> {
    fn download(&self, url: &Url, dest: &Path, show_progress: bool) -> Result<(), DownloadError> {
        (**self).download(url, dest, show_progress)
    }
}

/// Blocking HTTP(S) downloader
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Create a new HTTP downloader
    pub fn new() -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("lip-pm/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Create a downloader around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn stream_to(
        &self,
        url: &Url,
        tmp_path: &Path,
        show_progress: bool,
    ) -> Result<(), DownloadError> {
        let mut response = self.client.get(url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let progress = if show_progress {
            Some(new_progress_bar(response.content_length()))
        } else {
            None
        };

        let mut file = fs::File::create(tmp_path)?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])?;
            if let Some(ref pb) = progress {
                pb.inc(n as u64);
            }
        }
        file.sync_all()?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &Url, dest: &Path, show_progress: bool) -> Result<(), DownloadError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(DownloadError::UnsupportedScheme(url.scheme().to_string()));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = temp_path_for(dest);
        match self.stream_to(url, &tmp_path, show_progress) {
            Ok(()) => {
                fs::rename(&tmp_path, dest).inspect_err(|_| {
                    let _ = fs::remove_file(&tmp_path);
                })?;
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                Err(e)
            }
        }
    }
}

/// Characters of the destination name kept in a temp file name
const TEMP_NAME_PREFIX_LEN: usize = 32;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Temporary sibling of `dest`
///
/// The name is short whatever the length of `dest`'s name, and unique per
/// process and call.
fn temp_path_for(dest: &Path) -> PathBuf {
    let prefix: String = dest
        .file_name()
        .map(|n| n.to_string_lossy().chars().take(TEMP_NAME_PREFIX_LEN).collect())
        .unwrap_or_default();
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    dest.with_file_name(format!(".{}-{}-{}.tmp", prefix, std::process::id(), seq))
}

fn new_progress_bar(len: Option<u64>) -> ProgressBar {
    match len {
        Some(len) => {
            let pb = ProgressBar::new(len);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} {bytes_per_sec}")
            {
                pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {bytes}") {
                pb.set_style(style);
            }
            pb
        }
    }
}
