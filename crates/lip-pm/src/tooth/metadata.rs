//! Tooth metadata (tooth.json)
//!
//! Declared identity and companion asset of a tooth archive.

use crate::semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The only tooth.json format this crate understands
pub const FORMAT_VERSION: u32 = 2;

/// Errors that can occur while parsing tooth metadata
#[derive(Debug, Error)]
pub enum MetadataError {
    /// JSON deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported format_version
    #[error("Unsupported format version: {0}")]
    UnsupportedFormat(u32),

    /// Version field is not semver
    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] crate::semver::SemverError),

    /// Repository path is empty
    #[error("Missing tooth repository path")]
    MissingTooth,
}

/// Raw tooth.json document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawMetadata {
    pub format_version: u32,

    /// Repository path (e.g. `github.com/tooth-hub/example`)
    pub tooth: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ToothInfo>,

    /// Companion asset URL; empty when the tooth has none
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_url: String,

    /// Dependencies: repository path -> version range
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Per-platform overrides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<PlatformMetadata>,
}

/// Descriptive info block
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToothInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Platform-specific override, keyed by Go platform names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformMetadata {
    pub goos: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub goarch: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub asset_url: String,
}

/// Validated tooth metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToothMetadata {
    raw: RawMetadata,
    version: Version,
}

impl ToothMetadata {
    /// Parse metadata from tooth.json bytes
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, MetadataError> {
        let raw: RawMetadata = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    /// Validate a raw document
    pub fn from_raw(raw: RawMetadata) -> Result<Self, MetadataError> {
        if raw.format_version != FORMAT_VERSION {
            return Err(MetadataError::UnsupportedFormat(raw.format_version));
        }
        if raw.tooth.trim().is_empty() {
            return Err(MetadataError::MissingTooth);
        }
        let version = Version::parse(&raw.version)?;
        Ok(Self { raw, version })
    }

    /// Declared repository path
    pub fn tooth_repo_path(&self) -> &str {
        &self.raw.tooth
    }

    /// Declared version
    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn info(&self) -> Option<&ToothInfo> {
        self.raw.info.as_ref()
    }

    pub fn dependencies(&self) -> &BTreeMap<String, String> {
        &self.raw.dependencies
    }

    /// Companion asset URL for the host platform; empty means none
    pub fn asset_url(&self) -> &str {
        self.asset_url_for(go_os(), go_arch())
    }

    /// Companion asset URL for a given Go platform
    ///
    /// A platform entry matching `goos` (and `goarch`, when the entry names
    /// one) takes precedence over the top-level `asset_url`.
    pub fn asset_url_for(&self, goos: &str, goarch: &str) -> &str {
        self.raw
            .platforms
            .iter()
            .find(|p| p.goos == goos && (p.goarch.is_empty() || p.goarch == goarch))
            .map(|p| p.asset_url.as_str())
            .unwrap_or(self.raw.asset_url.as_str())
    }

    pub fn raw(&self) -> &RawMetadata {
        &self.raw
    }
}

/// Go's name for the host OS
pub fn go_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go's name for the host architecture
pub fn go_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "format_version": 2,
        "tooth": "github.com/tooth-hub/example",
        "version": "1.2.3",
        "info": {"name": "Example", "description": "An example", "author": "someone", "tags": ["demo"]},
        "asset_url": "https://github.com/tooth-hub/example/releases/download/v1.2.3/generic.zip",
        "dependencies": {"github.com/tooth-hub/dep": ">=1.0.0"},
        "platforms": [
            {"goos": "windows", "goarch": "amd64", "asset_url": "https://example.com/win64.zip"},
            {"goos": "linux", "asset_url": "https://example.com/linux.zip"}
        ]
    }"#;

    #[test]
    fn test_parse_full() {
        let meta = ToothMetadata::from_json_bytes(FULL.as_bytes()).unwrap();
        assert_eq!(meta.tooth_repo_path(), "github.com/tooth-hub/example");
        assert_eq!(meta.version(), &Version::new(1, 2, 3));
        assert_eq!(meta.info().unwrap().name, "Example");
        assert_eq!(meta.dependencies().len(), 1);
    }

    #[test]
    fn test_asset_url_platform_override() {
        let meta = ToothMetadata::from_json_bytes(FULL.as_bytes()).unwrap();
        assert_eq!(meta.asset_url_for("windows", "amd64"), "https://example.com/win64.zip");
        assert_eq!(meta.asset_url_for("linux", "arm64"), "https://example.com/linux.zip");
        assert_eq!(
            meta.asset_url_for("windows", "arm64"),
            "https://github.com/tooth-hub/example/releases/download/v1.2.3/generic.zip"
        );
    }

    #[test]
    fn test_asset_url_defaults_to_empty() {
        let meta = ToothMetadata::from_json_bytes(
            br#"{"format_version": 2, "tooth": "example.com/pkg", "version": "0.1.0"}"#,
        )
        .unwrap();
        assert_eq!(meta.asset_url(), "");
        assert!(meta.info().is_none());
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            ToothMetadata::from_json_bytes(br#"{"format_version": 1, "tooth": "a", "version": "1.0.0"}"#),
            Err(MetadataError::UnsupportedFormat(1))
        ));
        assert!(matches!(
            ToothMetadata::from_json_bytes(br#"{"format_version": 2, "tooth": "", "version": "1.0.0"}"#),
            Err(MetadataError::MissingTooth)
        ));
        assert!(matches!(
            ToothMetadata::from_json_bytes(br#"{"format_version": 2, "tooth": "a", "version": "one"}"#),
            Err(MetadataError::InvalidVersion(_))
        ));
        assert!(matches!(
            ToothMetadata::from_json_bytes(b"not json"),
            Err(MetadataError::JsonError(_))
        ));
    }
}
