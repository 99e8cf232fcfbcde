//! Configuration (config.toml)
//!
//! Loads the user configuration and resolves it into a read-only [`Context`]
//! consumed by the fetch core.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

/// Default Go module proxy
pub const DEFAULT_GO_MODULE_PROXY_URL: &str = "https://goproxy.io";

/// Environment variable overriding the cache directory
pub const ENV_CACHE_DIR: &str = "LIP_CACHE_DIR";

/// Environment variable overriding the Go module proxy
pub const ENV_GO_MODULE_PROXY_URL: &str = "LIP_GO_MODULE_PROXY_URL";

/// Environment variable overriding the GitHub mirror
pub const ENV_GITHUB_MIRROR_URL: &str = "LIP_GITHUB_MIRROR_URL";

/// Errors that can occur while loading or resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// No cache directory configured and none could be derived
    #[error("Could not determine cache directory")]
    NoCacheDir,

    /// A configured URL is malformed
    #[error("Invalid {field}: {value} ({reason})")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
}

/// User configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Cache directory (defaults to the platform cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Go module proxy serving tooth archives
    #[serde(default = "default_go_module_proxy_url")]
    pub go_module_proxy_url: String,

    /// GitHub mirror base; empty disables rewriting
    #[serde(default)]
    pub github_mirror_url: String,
}

fn default_go_module_proxy_url() -> String {
    DEFAULT_GO_MODULE_PROXY_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: None,
            go_module_proxy_url: default_go_module_proxy_url(),
            github_mirror_url: String::new(),
        }
    }
}

impl Config {
    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Load configuration from `path`, or the default location when `None`
    ///
    /// An explicit path must be readable. Only a missing file at the default
    /// location yields the defaults. Environment overrides are applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) => Self::from_file_or_default(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Like [`Config::from_file`], but a missing file yields the defaults
    fn from_file_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_str(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::IoError {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(proxy) = lookup(ENV_GO_MODULE_PROXY_URL).filter(|v| !v.is_empty()) {
            self.go_module_proxy_url = proxy;
        }
        if let Some(mirror) = lookup(ENV_GITHUB_MIRROR_URL) {
            self.github_mirror_url = mirror;
        }
    }
}

/// Default config file location (`<config dir>/lip/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lip").join("config.toml"))
}

/// Resolved, read-only configuration surface
#[derive(Debug, Clone)]
pub struct Context {
    config: Config,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Cache root directory
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.config.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|d| d.join("lip"))
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Go module proxy base URL
    pub fn go_module_proxy_url(&self) -> Result<Url, ConfigError> {
        parse_base_url("go_module_proxy_url", &self.config.go_module_proxy_url)
    }

    /// GitHub mirror base URL, `None` when unset
    pub fn github_mirror_url(&self) -> Result<Option<Url>, ConfigError> {
        let raw = self.config.github_mirror_url.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_base_url("github_mirror_url", raw).map(Some)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn parse_base_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid("expected an http(s) URL with a host".to_string()));
    }
    Ok(url)
}

/// Output verbosity chosen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl Verbosity {
    /// Build from `-v` / `-q` counts
    pub fn from_flags(verbose: u8, quiet: u8) -> Self {
        let level = 3i16 + i16::from(verbose) - i16::from(quiet);
        match level {
            i16::MIN..=0 => Verbosity::Silent,
            1 => Verbosity::Error,
            2 => Verbosity::Warn,
            3 => Verbosity::Info,
            4 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    /// Progress bars are only drawn at info and more verbose
    pub fn shows_progress(self) -> bool {
        self >= Verbosity::Info
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Silent => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warn => LevelFilter::WARN,
            Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Per-call fetch options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Draw a progress indicator while downloading
    pub show_progress: bool,
}

impl FetchOptions {
    pub fn for_verbosity(verbosity: Verbosity) -> Self {
        Self {
            show_progress: verbosity.shows_progress(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.go_module_proxy_url, DEFAULT_GO_MODULE_PROXY_URL);
        assert!(config.github_mirror_url.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_str(
            r#"
cache_dir = "/var/cache/lip"
go_module_proxy_url = "https://proxy.golang.org"
github_mirror_url = "https://mirror.example.com"
"#,
        )
        .unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/lip")));

        let ctx = Context::new(config);
        assert_eq!(ctx.cache_dir().unwrap(), PathBuf::from("/var/cache/lip"));
        assert_eq!(
            ctx.go_module_proxy_url().unwrap().as_str(),
            "https://proxy.golang.org/"
        );
        assert_eq!(
            ctx.github_mirror_url().unwrap().unwrap().host_str(),
            Some("mirror.example.com")
        );
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("typo").join("config.toml");
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(
            matches!(&err, ConfigError::IoError { path: p, source } if *p == path && source.kind() == io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn test_explicit_file_is_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "go_module_proxy_url = \"https://proxy.golang.org\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.go_module_proxy_url, "https://proxy.golang.org");
    }

    #[test]
    fn test_missing_default_location_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = Config::from_file_or_default(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unreadable_default_location_is_error() {
        let temp = TempDir::new().unwrap();
        // A directory where the file should be cannot be read as a file.
        let path = temp.path().join("config.toml");
        fs::create_dir(&path).unwrap();
        assert!(matches!(
            Config::from_file_or_default(&path),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENV_CACHE_DIR => Some("/tmp/lip-cache".to_string()),
            ENV_GITHUB_MIRROR_URL => Some("https://gh.example.com".to_string()),
            _ => None,
        });
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/lip-cache")));
        assert_eq!(config.go_module_proxy_url, DEFAULT_GO_MODULE_PROXY_URL);
        assert_eq!(config.github_mirror_url, "https://gh.example.com");
    }

    #[test]
    fn test_invalid_urls_are_config_errors() {
        let ctx = Context::new(Config {
            go_module_proxy_url: "not a url".to_string(),
            github_mirror_url: "ftp://mirror.example.com".to_string(),
            ..Config::default()
        });
        assert!(matches!(
            ctx.go_module_proxy_url(),
            Err(ConfigError::InvalidUrl { field: "go_module_proxy_url", .. })
        ));
        assert!(matches!(
            ctx.github_mirror_url(),
            Err(ConfigError::InvalidUrl { field: "github_mirror_url", .. })
        ));
    }

    #[test]
    fn test_empty_mirror_is_none() {
        let ctx = Context::new(Config {
            github_mirror_url: "  ".to_string(),
            ..Config::default()
        });
        assert_eq!(ctx.github_mirror_url().unwrap(), None);
    }

    #[test]
    fn test_verbosity_progress_threshold() {
        assert!(Verbosity::Trace.shows_progress());
        assert!(Verbosity::Debug.shows_progress());
        assert!(Verbosity::Info.shows_progress());
        assert!(!Verbosity::Warn.shows_progress());
        assert!(!Verbosity::Error.shows_progress());
        assert!(!Verbosity::Silent.shows_progress());
        assert!(!FetchOptions::for_verbosity(Verbosity::Warn).show_progress);
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(0, 0), Verbosity::Info);
        assert_eq!(Verbosity::from_flags(1, 0), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(5, 0), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(0, 1), Verbosity::Warn);
        assert_eq!(Verbosity::from_flags(0, 9), Verbosity::Silent);
    }
}
