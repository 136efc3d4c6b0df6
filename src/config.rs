use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

use crate::index::DEFAULT_INDEX_URL;
use crate::traversal::DEFAULT_JOBS;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything a mirror run needs, resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root package to mirror.
    pub package: String,
    /// Artifacts are stored under `<download_dir>/<package>/<file name>`.
    pub download_dir: PathBuf,
    /// Index base URL; the `/simple` API is expected beneath it.
    pub repository: String,
    /// Maximum number of concurrent jobs.
    pub jobs: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Suppress per-artifact progress lines.
    pub quiet: bool,
}

impl Config {
    pub fn new(package: impl Into<String>, download_dir: PathBuf) -> Self {
        Self {
            package: package.into(),
            download_dir,
            repository: DEFAULT_INDEX_URL.to_string(),
            jobs: DEFAULT_JOBS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            quiet: false,
        }
    }

    /// Builds the HTTP client shared by the index and the store.
    pub fn http_client(&self) -> Result<Client> {
        let user_agent = format!("pypi-download/{}", env!("PYPI_DOWNLOAD_VERSION"));
        debug!("Using user agent {} with a {:?} timeout", user_agent, self.timeout);

        Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}
