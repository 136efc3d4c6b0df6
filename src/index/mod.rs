//! Package index client.
//!
//! The only protocol spoken is the "simple" repository API: a root page whose
//! anchors name packages, and one page per package whose anchors point at the
//! package's downloadable files.

pub mod html;
mod simple;

use anyhow::Result;
use async_trait::async_trait;

use crate::package::{Artifact, Package};

pub use simple::SimpleIndex;

/// Default index root.
pub const DEFAULT_INDEX_URL: &str = "https://pypi.org";

/// Read-only query interface over a package index.
///
/// Implementations must not cache: every call is a fresh request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// List every package named on the index root page.
    async fn list_packages(&self) -> Result<Vec<Package>>;

    /// List every artifact on the package's page.
    ///
    /// A page with no anchors yields an empty list; a non-success status is an error.
    async fn list_artifacts(&self, package: &Package) -> Result<Vec<Artifact>>;
}
