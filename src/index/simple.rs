use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};

use super::PackageIndex;
use super::html::{self, Link};
use crate::http::{HttpClient, Page};
use crate::package::{Artifact, Package};

/// Client for a "simple" repository API index such as PyPI.
#[derive(Clone)]
pub struct SimpleIndex {
    http: HttpClient,
    base_url: String,
}

impl SimpleIndex {
    #[tracing::instrument(skip(http))]
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the root listing page.
    pub fn root_url(&self) -> String {
        format!("{}/simple", self.base_url)
    }

    /// URL of a package's listing page; the name is percent-encoded.
    pub fn package_url(&self, package: &Package) -> String {
        format!(
            "{}/simple/{}",
            self.base_url,
            urlencoding::encode(&package.name)
        )
    }

    /// Lists the artifacts of a package given either a [`Package`] or a bare name.
    #[tracing::instrument(skip(self, package))]
    pub async fn artifacts_of(&self, package: impl Into<Package>) -> Result<Vec<Artifact>> {
        let package = package.into();
        let url = self.package_url(&package);
        debug!("Listing artifacts of {} from {}...", package, url);

        let page = self
            .http
            .get_page(&url)
            .await
            .with_context(|| format!("Failed to list artifacts of {}", package))?;

        let artifacts: Vec<Artifact> = html::links(&page.body)
            .into_iter()
            .filter_map(|link| self.artifact_from_link(&package, &page, link))
            .collect();

        debug!("{} lists {} artifact(s)", package, artifacts.len());
        Ok(artifacts)
    }

    fn artifact_from_link(&self, package: &Package, page: &Page, link: Link) -> Option<Artifact> {
        let Some(href) = link.href else {
            debug!("Skipping anchor {:?} without href on {}", link.text, page.url);
            return None;
        };
        if link.text.is_empty() {
            debug!("Skipping anchor to {} without text on {}", href, page.url);
            return None;
        }

        match page.url.join(&href) {
            Ok(url) => Some(Artifact::new(
                package.clone(),
                link.text,
                self.base_url.clone(),
                url.to_string(),
            )),
            Err(e) => {
                warn!("Skipping {}: invalid link {:?} ({})", link.text, href, e);
                None
            }
        }
    }
}

#[async_trait]
impl PackageIndex for SimpleIndex {
    #[tracing::instrument(skip(self))]
    async fn list_packages(&self) -> Result<Vec<Package>> {
        let url = self.root_url();
        debug!("Listing packages from {}...", url);

        let page = self
            .http
            .get_page(&url)
            .await
            .context("Failed to list packages on the index")?;

        Ok(html::links(&page.body)
            .into_iter()
            .filter(|link| !link.text.is_empty())
            .map(|link| Package::new(link.text))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn list_artifacts(&self, package: &Package) -> Result<Vec<Artifact>> {
        self.artifacts_of(package).await
    }
}
