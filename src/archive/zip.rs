use crate::runtime::Runtime;
use anyhow::{Context, Result};
use log::debug;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use super::{MetadataReader, archive_name};

/// Reader for zip-based distributions: wheels, eggs and zip sdists.
pub struct ZipMetadataReader;

/// Where the metadata file sits inside a zip-based distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// `<name>-<version>.dist-info/METADATA`
    Wheel,
    /// `EGG-INFO/PKG-INFO`
    Egg,
    /// `<name>-<version>/PKG-INFO`
    Sdist,
}

impl Layout {
    fn of(archive_path: &Path) -> Option<Self> {
        let name = archive_name(archive_path);
        if name.ends_with(".whl") {
            Some(Layout::Wheel)
        } else if name.ends_with(".egg") {
            Some(Layout::Egg)
        } else if name.ends_with(".zip") {
            Some(Layout::Sdist)
        } else {
            None
        }
    }

    fn matches(self, entry_name: &str) -> bool {
        let parts: Vec<&str> = entry_name.split('/').collect();
        match self {
            Layout::Wheel => {
                parts.len() == 2 && parts[0].ends_with(".dist-info") && parts[1] == "METADATA"
            }
            Layout::Egg => parts == ["EGG-INFO", "PKG-INFO"],
            Layout::Sdist => parts.len() <= 2 && parts.last() == Some(&"PKG-INFO"),
        }
    }
}

impl MetadataReader for ZipMetadataReader {
    fn can_handle(&self, archive_path: &Path) -> bool {
        Layout::of(archive_path).is_some()
    }

    fn read_metadata<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
    ) -> Result<Option<String>> {
        let Some(layout) = Layout::of(archive_path) else {
            return Ok(None);
        };

        let file = runtime.open(archive_path)?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("Failed to parse ZIP archive {:?}", archive_path))?;

        // Shallowest match wins, so a vendored PKG-INFO never shadows the real one
        let Some(entry_name) = archive
            .file_names()
            .filter(|name| layout.matches(name))
            .min_by_key(|name| (name.matches('/').count(), name.to_string()))
            .map(str::to_string)
        else {
            debug!("No {:?} metadata found in {:?}", layout, archive_path);
            return Ok(None);
        };

        debug!("Reading {} from {:?}", entry_name, archive_path);
        let mut entry = archive
            .by_name(&entry_name)
            .with_context(|| format!("Failed to open {} in {:?}", entry_name, archive_path))?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read {} in {:?}", entry_name, archive_path))?;

        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}
