//! Integration tests for the download cache
//!
//! Tests key derivation, check-then-fetch behavior and per-key serialization.

use lip_pm::{cache_key, cache_path, DownloadCache, DownloadError, Downloader, FetchOptions};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Writes the URL into the destination after a short delay
#[derive(Default)]
struct SlowDownloader {
    downloads: AtomicUsize,
}

impl Downloader for SlowDownloader {
    fn download(&self, url: &Url, dest: &Path, _show_progress: bool) -> Result<(), DownloadError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        fs::create_dir_all(dest.parent().unwrap())?;
        fs::write(dest, url.as_str())?;
        Ok(())
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn test_cache_path_is_deterministic() {
    let dir = Path::new("/tmp/lip-cache");
    let u = url("https://goproxy.io/github.com/!lite!l!dev/!tooth/@v/v2.0.0+incompatible.zip");

    assert_eq!(cache_path(dir, &u), cache_path(dir, &u.clone()));
    assert_eq!(
        cache_key(&u),
        "https%3A%2F%2Fgoproxy.io%2Fgithub.com%2F%21lite%21l%21dev%2F%21tooth%2F%40v%2Fv2.0.0%2Bincompatible.zip"
    );
}

#[test]
fn test_cache_keys_do_not_collide() {
    let urls = [
        "https://goproxy.io/example.com/a/@v/v1.0.0.zip",
        "https://goproxy.io/example.com/a/@v/v1.0.1.zip",
        "https://goproxy.io/example.com/A/@v/v1.0.0.zip",
        "https://goproxy.io/example.com/a/b/@v/v1.0.0.zip",
        "https://goproxy.io/example.com/a%2Fb/@v/v1.0.0.zip",
        "https://github.com/owner/repo/releases/download/v1.0.0/a.zip",
        "https://mirror.example.com/owner/repo/releases/download/v1.0.0/a.zip",
        "https://example.com/file?version=1",
        "https://example.com/file?version=2",
    ];
    let keys: HashSet<String> = urls.iter().map(|u| cache_key(&url(u))).collect();
    assert_eq!(keys.len(), urls.len());
}

#[test]
fn test_existing_file_is_never_redownloaded() {
    let temp = TempDir::new().unwrap();
    let cache = DownloadCache::new(temp.path().to_path_buf());
    let downloader = SlowDownloader::default();
    let u = url("https://example.com/prefilled.zip");

    // Any existing file counts as present, whatever its contents.
    fs::write(cache.cache_path(&u), b"stale").unwrap();
    assert!(cache.contains(&u).unwrap());

    let cached = cache
        .ensure_cached(&u, &downloader, FetchOptions::default())
        .unwrap();
    assert!(cached.hit);
    assert_eq!(fs::read(&cached.path).unwrap(), b"stale");
    assert_eq!(downloader.downloads.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_requests_for_one_url_download_once() {
    let temp = TempDir::new().unwrap();
    let cache = DownloadCache::new(temp.path().join("cache"));
    let downloader = SlowDownloader::default();
    let u = url("https://goproxy.io/example.com/pkg/@v/v1.2.3.zip");

    let hits = thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    cache
                        .ensure_cached(&u, &downloader, FetchOptions::default())
                        .unwrap()
                        .hit
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|hit| *hit)
            .count()
    });

    assert_eq!(downloader.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(hits, 7);
    assert_eq!(fs::read_to_string(cache.cache_path(&u)).unwrap(), u.as_str());
}

#[test]
fn test_concurrent_requests_for_distinct_urls() {
    let temp = TempDir::new().unwrap();
    let cache = DownloadCache::new(temp.path().to_path_buf());
    let downloader = SlowDownloader::default();
    let urls: Vec<Url> = (0..4)
        .map(|i| url(&format!("https://example.com/file-{}.zip", i)))
        .collect();

    thread::scope(|s| {
        for u in &urls {
            let cache = &cache;
            let downloader = &downloader;
            s.spawn(move || {
                cache
                    .ensure_cached(u, downloader, FetchOptions::default())
                    .unwrap()
            });
        }
    });

    assert_eq!(downloader.downloads.load(Ordering::SeqCst), urls.len());
    for u in &urls {
        assert!(cache.contains(u).unwrap());
    }
}
