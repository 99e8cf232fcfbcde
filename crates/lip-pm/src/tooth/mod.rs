//! Tooth packages
//!
//! A tooth is identified by its repository path and semver version and ships
//! as a zip archive carrying a tooth.json metadata file.

mod archive;
mod metadata;

pub use archive::{ArchiveError, ArchiveOpener, ToothArchive, ZipArchiveOpener, METADATA_FILE};
pub use metadata::{
    go_arch, go_os, MetadataError, PlatformMetadata, RawMetadata, ToothInfo, ToothMetadata,
    FORMAT_VERSION,
};
