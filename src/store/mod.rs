//! Local artifact store.
//!
//! Artifacts live at `<download_root>/<package>/<file name>`. The presence of
//! that file is the only record that an artifact was mirrored: if it exists the
//! download is skipped without any checksum or size check.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::http::HttpClient;
use crate::package::Artifact;
use crate::runtime::Runtime;

/// Suffix of the file a download is streamed into before being renamed.
const PARTIAL_SUFFIX: &str = ".part";

/// What `ensure_downloaded` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The destination already existed; nothing was fetched.
    AlreadyPresent,
    /// The artifact was fetched and written to its destination.
    Fetched { bytes: u64 },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Where the artifact lives on disk. Pure; performs no I/O.
    fn destination(&self, artifact: &Artifact) -> PathBuf;

    /// Download the artifact unless its destination already exists.
    async fn ensure_downloaded(&self, artifact: &Artifact) -> Result<DownloadOutcome>;
}

pub struct LocalStore<R: Runtime> {
    runtime: R,
    http: HttpClient,
    download_root: PathBuf,
    cleanup_ctx: SharedCleanupContext,
}

impl<R: Runtime> LocalStore<R> {
    pub fn new(
        runtime: R,
        http: HttpClient,
        download_root: PathBuf,
        cleanup_ctx: SharedCleanupContext,
    ) -> Self {
        Self {
            runtime,
            http,
            download_root,
            cleanup_ctx,
        }
    }

    async fn fetch(&self, artifact: &Artifact, dest: &Path) -> Result<u64> {
        let partial = partial_path(dest);
        let guard = CleanupGuard::new(self.cleanup_ctx.clone(), partial.clone());

        let result = self
            .http
            .download_file(&artifact.url, || {
                self.runtime
                    .create_file(&partial)
                    .with_context(|| format!("Failed to create {:?}", partial))
            })
            .await
            .and_then(|bytes| {
                self.runtime.rename(&partial, dest)?;
                Ok(bytes)
            });

        if result.is_err() && self.runtime.exists(&partial) {
            debug!("Removing partial download {:?}", partial);
            let _ = self.runtime.remove_file(&partial);
        }
        // Either renamed into place or removed above
        guard.success();

        result
    }
}

#[async_trait]
impl<R: Runtime> ArtifactStore for LocalStore<R> {
    fn destination(&self, artifact: &Artifact) -> PathBuf {
        self.download_root
            .join(&artifact.package.name)
            .join(&artifact.full_name)
    }

    #[tracing::instrument(skip(self, artifact), fields(artifact = %artifact))]
    async fn ensure_downloaded(&self, artifact: &Artifact) -> Result<DownloadOutcome> {
        check_path_component(&artifact.package.name)
            .with_context(|| format!("Refusing to store {}", artifact))?;
        check_path_component(&artifact.full_name)
            .with_context(|| format!("Refusing to store {}", artifact))?;

        let dest = self.destination(artifact);
        if let Some(parent) = dest.parent() {
            self.runtime.create_dir_all(parent)?;
        }

        if self.runtime.exists(&dest) {
            debug!("{:?} already exists, skipping download", dest);
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        info!("Downloading {} from {}...", artifact, artifact.url);
        let bytes = self
            .fetch(artifact, &dest)
            .await
            .with_context(|| format!("Failed to download {}", artifact))?;

        Ok(DownloadOutcome::Fetched { bytes })
    }
}

/// `<dest>.part`, next to the destination so the final rename stays on one filesystem.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Names coming from the index become path components; they must not be able
/// to point outside the download root.
fn check_path_component(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        bail!("invalid file name {:?}", name);
    }
    if name.contains('/') || name.contains('\\') {
        bail!("file name {:?} contains a path separator", name);
    }
    Ok(())
}
