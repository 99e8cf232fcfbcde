//! Semantic versioning for tooth identities
//!
//! Wraps [`semver::Version`] with the two things tooth identities need on top
//! of it: a tolerated `v` prefix, and the Go-module version form used when
//! addressing archives on a module proxy.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A string that is not a semantic version
#[derive(Debug, Error)]
#[error("Invalid version '{input}': {source}")]
pub struct SemverError {
    input: String,
    source: semver::Error,
}

impl SemverError {
    /// The rejected input
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Semantic version (MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD])
///
/// Equality and ordering follow semver precedence, so build metadata is
/// carried for display but never distinguishes two versions.
#[derive(Debug, Clone)]
pub struct Version(semver::Version);

impl Version {
    /// Parse a version string
    ///
    /// A leading `v` is accepted, so both `1.2.3` and `v1.2.3` parse.
    pub fn parse(s: &str) -> Result<Self, SemverError> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        semver::Version::parse(trimmed)
            .map(Version)
            .map_err(|source| SemverError {
                input: s.to_string(),
                source,
            })
    }

    /// Create a release version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version(semver::Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// Pre-release identifiers, `None` for a release
    pub fn prerelease(&self) -> Option<&str> {
        (!self.0.pre.is_empty()).then(|| self.0.pre.as_str())
    }

    /// Build metadata, `None` when absent
    pub fn build(&self) -> Option<&str> {
        (!self.0.build.is_empty()).then(|| self.0.build.as_str())
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }

    /// Version string as served by a Go module proxy
    ///
    /// Tooth repositories carry no go.mod, so any major version above 1 is
    /// published by the proxy with the `+incompatible` suffix. Build
    /// metadata is not part of a module version.
    pub fn to_go_module_version(&self) -> String {
        let mut s = format!("v{}.{}.{}", self.0.major, self.0.minor, self.0.patch);
        if let Some(pre) = self.prerelease() {
            s.push('-');
            s.push_str(pre);
        }
        if self.0.major >= 2 {
            s.push_str("+incompatible");
        }
        s
    }
}

impl From<semver::Version> for Version {
    fn from(v: semver::Version) -> Self {
        Version(v)
    }
}

impl FromStr for Version {
    type Err = SemverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}
