//! Package and artifact value types.

mod artifact;

use std::fmt;

pub use artifact::Artifact;

/// A package on the index, identified only by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Package {
    pub name: String,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Package {
    fn from(name: &str) -> Self {
        Package::new(name)
    }
}

impl From<String> for Package {
    fn from(name: String) -> Self {
        Package::new(name)
    }
}

impl From<&Package> for Package {
    fn from(package: &Package) -> Self {
        package.clone()
    }
}
