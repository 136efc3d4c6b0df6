use regex::Regex;
use std::sync::LazyLock;

use crate::package::Package;

/// Leading project name of a requirement string. Everything after it
/// (extras, version specifiers, markers) is ignored.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]*").expect("valid name regex"));

/// A requirement string with no recognizable package name in front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementParseError {
    pub requirement: String,
}

impl std::fmt::Display for RequirementParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Couldn't parse requirement {:?}", self.requirement)
    }
}

impl std::error::Error for RequirementParseError {}

/// Reduces a requirement such as `foo[bar]>=1.0; python_version<"3.8"` to `foo`.
pub fn parse_requirement_name(requirement: &str) -> Result<Package, RequirementParseError> {
    let name = NAME_RE
        .find(requirement)
        .map(|m| m.as_str().trim_end_matches(['-', '.']))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RequirementParseError {
            requirement: requirement.to_string(),
        })?;
    Ok(Package::new(name))
}
