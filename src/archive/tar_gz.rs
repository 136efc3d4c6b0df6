use crate::runtime::Runtime;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

use super::{MetadataReader, archive_name};

/// Reader for gzip-compressed tarball sdists.
pub struct TarGzMetadataReader;

impl MetadataReader for TarGzMetadataReader {
    fn can_handle(&self, archive_path: &Path) -> bool {
        let name = archive_name(archive_path);
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }

    fn read_metadata<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
    ) -> Result<Option<String>> {
        let file = runtime.open(archive_path)?;
        let mut archive = Archive::new(GzDecoder::new(file));

        let entries = archive
            .entries()
            .with_context(|| format!("Failed to read tar archive {:?}", archive_path))?;

        // Streaming format: the first PKG-INFO at most one directory deep wins
        for entry in entries {
            let mut entry =
                entry.with_context(|| format!("Failed to read entry in {:?}", archive_path))?;
            let path = entry
                .path()
                .with_context(|| format!("Invalid entry path in {:?}", archive_path))?
                .into_owned();

            if !is_sdist_pkg_info(&path) {
                continue;
            }

            debug!("Reading {:?} from {:?}", path, archive_path);
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .with_context(|| format!("Failed to read {:?} in {:?}", path, archive_path))?;
            return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
        }

        debug!("No PKG-INFO found in {:?}", archive_path);
        Ok(None)
    }
}

/// `PKG-INFO` or `<top>/PKG-INFO`.
fn is_sdist_pkg_info(path: &Path) -> bool {
    let parts: Vec<&std::ffi::OsStr> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    parts.len() <= 2 && parts.last().is_some_and(|last| *last == "PKG-INFO")
}
