use std::fmt;
use std::hash::{Hash, Hasher};

use super::Package;

/// One downloadable file of a package (a wheel, an sdist, an egg...).
///
/// Two artifacts are the same traversal node when they share the package
/// and the file name, regardless of the index or URL they were listed with.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub package: Package,
    /// File name as listed on the index; also the on-disk file name.
    pub full_name: String,
    /// Base URL of the index that listed this artifact.
    pub index_url: String,
    pub url: String,
}

impl Artifact {
    pub fn new(
        package: Package,
        full_name: impl Into<String>,
        index_url: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            package,
            full_name: full_name.into(),
            index_url: index_url.into(),
            url: url.into(),
        }
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.package == other.package && self.full_name == other.full_name
    }
}

impl Eq for Artifact {}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.package.hash(state);
        self.full_name.hash(state);
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name)
    }
}
