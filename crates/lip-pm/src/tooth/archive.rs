//! Tooth archives
//!
//! A tooth archive is a zip file. Archives served by a Go module proxy prefix
//! every entry with `<module path>@<version>/`, so tooth.json may sit either
//! at the root or under that common prefix.

use super::metadata::{MetadataError, ToothMetadata};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the metadata file inside an archive
pub const METADATA_FILE: &str = "tooth.json";

/// Upper bound on tooth.json size
const MAX_METADATA_SIZE: u64 = 1024 * 1024;

/// Errors that can occur while opening an archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Not a readable zip file
    #[error("Invalid zip archive: {0}")]
    ZipError(#[from] zip::result::ZipError),

    /// No tooth.json at the root or under the common entry prefix
    #[error("Archive does not contain tooth.json")]
    MissingMetadata,

    /// tooth.json larger than accepted
    #[error("tooth.json too large: {0} bytes")]
    MetadataTooLarge(u64),

    /// tooth.json could not be parsed
    #[error("Invalid tooth.json: {0}")]
    Metadata(#[from] MetadataError),
}

/// An opened tooth archive
#[derive(Debug, Clone)]
pub struct ToothArchive {
    path: PathBuf,
    metadata: ToothMetadata,
    prefix: String,
    file_paths: Vec<String>,
}

impl ToothArchive {
    /// Open a zip file and read its metadata
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        let mut zip = zip::ZipArchive::new(file)?;

        let names: Vec<String> = zip.file_names().map(String::from).collect();
        let prefix = find_prefix(&names)?;

        let metadata_name = format!("{}{}", prefix, METADATA_FILE);
        let mut entry = zip.by_name(&metadata_name)?;
        if entry.size() > MAX_METADATA_SIZE {
            return Err(ArchiveError::MetadataTooLarge(entry.size()));
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        let metadata = ToothMetadata::from_json_bytes(&bytes)?;

        let mut file_paths: Vec<String> = names
            .iter()
            .filter(|n| !n.ends_with('/'))
            .filter_map(|n| n.strip_prefix(prefix.as_str()))
            .map(String::from)
            .collect();
        file_paths.sort();

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            prefix,
            file_paths,
        })
    }

    /// Local path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &ToothMetadata {
        &self.metadata
    }

    /// Common entry prefix (empty or ending with `/`)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// File entries relative to the prefix, sorted
    pub fn file_paths(&self) -> &[String] {
        &self.file_paths
    }
}

/// Locate tooth.json and return the prefix it lives under
///
/// The prefix must be shared by every entry. Module paths contain slashes, so
/// the prefix may span several directory levels.
fn find_prefix(names: &[String]) -> Result<String, ArchiveError> {
    names
        .iter()
        .filter_map(|n| n.strip_suffix(METADATA_FILE))
        .filter(|p| p.is_empty() || p.ends_with('/'))
        .filter(|p| names.iter().all(|n| n.starts_with(p)))
        .min_by_key(|p| p.len())
        .map(String::from)
        .ok_or(ArchiveError::MissingMetadata)
}

/// Opens downloaded files as tooth archives
pub trait ArchiveOpener {
    fn open(&self, path: &Path) -> Result<ToothArchive, ArchiveError>;
}

impl<T: ArchiveOpener + ?Sized> ArchiveOpener for &T {
    fn open(&self, path: &Path) -> Result<ToothArchive, ArchiveError> {
        (**self).open(path)
    }
}

/// Default opener reading zip files from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveOpener;

impl ArchiveOpener for ZipArchiveOpener {
    fn open(&self, path: &Path) -> Result<ToothArchive, ArchiveError> {
        ToothArchive::open(path)
    }
}
