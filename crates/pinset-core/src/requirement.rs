//! PEP 508 requirement strings: `name[extra1,extra2] specifiers ; marker`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::marker::{MarkerEnvironment, MarkerTree};
use crate::name::{normalize, PackageName};
use crate::specifier::SpecifierSet;

/// A request for a package, optionally narrowed by version, extras and marker.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub name: PackageName,
    pub specifier: SpecifierSet,
    /// Requested extras, normalized.
    pub extras: BTreeSet<String>,
    pub marker: Option<MarkerTree>,
    /// Name of the package that declared this requirement; `None` for roots.
    pub source: Option<String>,
}

impl Requirement {
    /// A requirement for any version of `name`.
    pub fn new(name: PackageName) -> Self {
        Self {
            name,
            specifier: SpecifierSet::default(),
            extras: BTreeSet::new(),
            marker: None,
            source: None,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        let invalid = |reason: String| ParseError::InvalidRequirement {
            requirement: input.to_string(),
            reason,
        };

        let (body, marker) = match input.split_once(';') {
            Some((body, marker)) => (body.trim(), Some(marker.trim())),
            None => (input, None),
        };
        if body.contains('@') || body.contains("://") {
            return Err(invalid("direct URL requirements are not supported".to_string()));
        }

        let name_end = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(body.len());
        let name = PackageName::new(&body[..name_end]).map_err(|e| invalid(e.to_string()))?;
        let mut rest = body[name_end..].trim_start();

        let mut extras = BTreeSet::new();
        if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| invalid("missing ']' after extras".to_string()))?;
            for extra in after[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
                PackageName::new(extra).map_err(|_| invalid(format!("invalid extra {extra:?}")))?;
                extras.insert(normalize(extra));
            }
            rest = after[close + 1..].trim_start();
        }

        let spec_text = match rest.strip_prefix('(') {
            Some(inner) => inner
                .strip_suffix(')')
                .ok_or_else(|| invalid("missing ')' after version specifiers".to_string()))?,
            None => rest,
        };
        let specifier = SpecifierSet::parse(spec_text).map_err(|e| invalid(e.to_string()))?;

        let marker = match marker {
            Some(m) if !m.is_empty() => Some(MarkerTree::parse(m)?),
            _ => None,
        };

        Ok(Self {
            name,
            specifier,
            extras,
            marker,
            source: None,
        })
    }

    /// Tag this requirement with the package that declared it.
    pub fn with_source(mut self, parent: &str) -> Self {
        self.source = Some(parent.to_string());
        self
    }

    /// Normalized name used for lookups.
    pub fn key(&self) -> &str {
        self.name.normalized()
    }

    /// Whether the marker (if any) holds for `env` with the parent's `extras`.
    pub fn applies_to(&self, env: &MarkerEnvironment, extras: &BTreeSet<String>) -> bool {
        self.marker
            .as_ref()
            .map_or(true, |marker| marker.evaluate(env, extras))
    }
}

impl FromStr for Requirement {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        write!(f, "{}", self.specifier)?;
        if let Some(marker) = &self.marker {
            write!(f, "; {marker}")?;
        }
        Ok(())
    }
}
