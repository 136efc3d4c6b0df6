mod tar_gz;
mod zip;

use crate::runtime::Runtime;
use anyhow::Result;
use std::path::Path;

pub use tar_gz::TarGzMetadataReader;
pub use zip::ZipMetadataReader;

/// Trait for format-specific readers of the metadata file embedded in a
/// distribution archive (`METADATA` in wheels, `PKG-INFO` in sdists and eggs).
pub trait MetadataReader: Send + Sync {
    /// Check if this reader understands the given archive format
    fn can_handle(&self, archive_path: &Path) -> bool;

    /// Return the text of the embedded metadata file, or `None` when the
    /// archive carries none.
    fn read_metadata<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
    ) -> Result<Option<String>>;
}

/// Dispatcher that selects the appropriate reader based on archive format.
pub struct ArchiveMetadataReader {
    tar_gz: TarGzMetadataReader,
    zip: ZipMetadataReader,
}

impl Default for ArchiveMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveMetadataReader {
    pub fn new() -> Self {
        Self {
            tar_gz: TarGzMetadataReader,
            zip: ZipMetadataReader,
        }
    }
}

impl MetadataReader for ArchiveMetadataReader {
    fn can_handle(&self, archive_path: &Path) -> bool {
        self.tar_gz.can_handle(archive_path) || self.zip.can_handle(archive_path)
    }

    /// Unknown formats carry no readable metadata, which is not an error.
    #[tracing::instrument(skip(self, runtime))]
    fn read_metadata<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
    ) -> Result<Option<String>> {
        if self.tar_gz.can_handle(archive_path) {
            return self.tar_gz.read_metadata(runtime, archive_path);
        }
        if self.zip.can_handle(archive_path) {
            return self.zip.read_metadata(runtime, archive_path);
        }
        log::debug!("No metadata reader for {:?}", archive_path);
        Ok(None)
    }
}

/// Lower-cased file name of the archive, used for extension checks.
fn archive_name(archive_path: &Path) -> String {
    archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
