//! Dependency extraction from downloaded artifacts.

pub mod headers;
mod requirement;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::path::Path;

use crate::archive::{ArchiveMetadataReader, MetadataReader};
use crate::package::{Artifact, Package};
use crate::runtime::Runtime;

pub use requirement::{RequirementParseError, parse_requirement_name};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DependencyExtractor: Send + Sync {
    /// Declared dependencies of an artifact already downloaded to `path`.
    ///
    /// Duplicates are kept. Missing metadata yields an empty list; a
    /// requirement without a leading name fails the whole call.
    async fn dependencies_of(&self, artifact: &Artifact, path: &Path) -> Result<Vec<Package>>;
}

/// Reads dependencies out of the archive's embedded metadata. Archive I/O
/// runs on the blocking thread pool so in-flight downloads keep streaming.
pub struct MetadataExtractor<R: Runtime> {
    runtime: R,
}

impl<R: Runtime + Clone + 'static> MetadataExtractor<R> {
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl<R: Runtime + Clone + 'static> DependencyExtractor for MetadataExtractor<R> {
    #[tracing::instrument(skip(self, artifact), fields(artifact = %artifact))]
    async fn dependencies_of(&self, artifact: &Artifact, path: &Path) -> Result<Vec<Package>> {
        let runtime = self.runtime.clone();
        let archive_path = path.to_path_buf();
        let artifact = artifact.clone();

        tokio::task::spawn_blocking(move || extract(&runtime, &artifact, &archive_path))
            .await
            .context("Metadata extraction task failed")?
    }
}

fn extract<R: Runtime + 'static>(
    runtime: &R,
    artifact: &Artifact,
    path: &Path,
) -> Result<Vec<Package>> {
    let Some(text) = ArchiveMetadataReader::new().read_metadata(runtime, path)? else {
        debug!("{} has no metadata", artifact);
        return Ok(Vec::new());
    };

    let dependencies = headers::requires_dist(&text)
        .iter()
        .map(|requirement| parse_requirement_name(requirement))
        .collect::<Result<Vec<Package>, RequirementParseError>>()
        .map_err(|e| anyhow::Error::new(e).context(format!("Bad metadata in {}", artifact)))?;

    debug!("{} declares {} dependencies", artifact, dependencies.len());
    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::test_archives::{tar_gz_bytes, zip_bytes};
    use crate::runtime::RealRuntime;
    use std::fs;
    use tempfile::tempdir;

    async fn dependencies(full_name: &str, bytes: Vec<u8>) -> Result<Vec<Package>> {
        let dir = tempdir().unwrap();
        let path = dir.path().join(full_name);
        fs::write(&path, bytes).unwrap();

        let artifact = Artifact::new(Package::new("pkg-a"), full_name, "i", "u");
        MetadataExtractor::new(RealRuntime)
            .dependencies_of(&artifact, &path)
            .await
    }

    fn names(packages: Vec<Package>) -> Vec<String> {
        packages.into_iter().map(|p| p.name).collect()
    }

    #[tokio::test]
    async fn test_wheel_dependencies_keep_duplicates() {
        let deps = dependencies(
            "pkg_a-1.0-py3-none-any.whl",
            zip_bytes(&[(
                "pkg_a-1.0.dist-info/METADATA",
                "Metadata-Version: 2.1\nName: pkg-a\n\
                 Requires-Dist: pkg-b>=1.0,<2.0\n\
                 Requires-Dist: pkg_c[fast]; python_version < \"3.9\"\n\
                 Requires-Dist: pkg-b[extra]; extra == \"all\"\n\n\
                 Long description\n",
            )]),
        )
        .await
        .unwrap();

        assert_eq!(names(deps), vec!["pkg-b", "pkg_c", "pkg-b"]);
    }

    #[tokio::test]
    async fn test_sdist_dependencies() {
        let deps = dependencies(
            "pkg_a-1.0.tar.gz",
            tar_gz_bytes(&[(
                "pkg_a-1.0/PKG-INFO",
                "Metadata-Version: 2.2\nName: pkg-a\nRequires-Dist: six\n",
            )]),
        )
        .await
        .unwrap();

        assert_eq!(names(deps), vec!["six"]);
    }

    #[tokio::test]
    async fn test_no_requirements() {
        let deps = dependencies(
            "pkg_a-1.0.tar.gz",
            tar_gz_bytes(&[("pkg_a-1.0/PKG-INFO", "Metadata-Version: 1.0\nName: pkg-a\n")]),
        )
        .await
        .unwrap();
        assert!(deps.is_empty());
    }

    #[tokio::test]
    async fn test_no_metadata() {
        let deps = dependencies("pkg_a-1.0.zip", zip_bytes(&[("pkg_a-1.0/setup.py", "")]))
            .await
            .unwrap();
        assert!(deps.is_empty());

        let deps = dependencies("pkg_a-1.0.tar.bz2", b"opaque".to_vec())
            .await
            .unwrap();
        assert!(deps.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_requirement_fails_the_call() {
        let err = dependencies(
            "pkg_a-1.0-py3-none-any.whl",
            zip_bytes(&[(
                "pkg_a-1.0.dist-info/METADATA",
                "Name: pkg-a\nRequires-Dist: pkg-b\nRequires-Dist: >=1.0\n",
            )]),
        )
        .await
        .unwrap_err();

        let parse_error = err.downcast_ref::<RequirementParseError>().unwrap();
        assert_eq!(parse_error.requirement, ">=1.0");
        assert!(err.to_string().contains("pkg_a-1.0-py3-none-any.whl"));
    }
}
