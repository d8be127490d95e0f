//! Hard version constraints that override requirement specifiers.

use std::fmt;

use crate::error::ParseError;
use crate::name::PackageName;
use crate::requirement::Requirement;
use crate::version::Version;

/// The version a constraint pins a package to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintVersion {
    Exact(Version),
    /// The package is listed (and so covered) but any version is acceptable.
    Unconstrained,
}

/// A single constraint entry: `name==version` or a bare `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: PackageName,
    pub version: ConstraintVersion,
}

impl Constraint {
    pub fn exact(name: PackageName, version: Version) -> Self {
        Self {
            name,
            version: ConstraintVersion::Exact(version),
        }
    }

    pub fn unconstrained(name: PackageName) -> Self {
        Self {
            name,
            version: ConstraintVersion::Unconstrained,
        }
    }

    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::from_requirement(&Requirement::parse(line)?)
    }

    /// Convert a parsed constraints-file entry. Only `==version` (or `===`)
    /// and bare names are accepted; extras are ignored.
    pub fn from_requirement(req: &Requirement) -> Result<Self, ParseError> {
        if req.specifier.is_empty() {
            return Ok(Self::unconstrained(req.name.clone()));
        }
        match req.specifier.as_exact() {
            Some(version) => Ok(Self::exact(req.name.clone(), version.clone())),
            None => Err(ParseError::NotExactConstraint {
                requirement: req.to_string(),
            }),
        }
    }

    /// Normalized name used for lookups.
    pub fn key(&self) -> &str {
        self.name.normalized()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            ConstraintVersion::Exact(v) => write!(f, "{}=={v}", self.name),
            ConstraintVersion::Unconstrained => write!(f, "{}", self.name),
        }
    }
}
