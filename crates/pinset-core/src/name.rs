//! Package name validation and PEP 503 normalization.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ParseError;

/// A package name as written, together with its normalized lookup key.
///
/// Equality, ordering and hashing use the normalized key only.
#[derive(Debug, Clone)]
pub struct PackageName {
    normalized: String,
    original: String,
}

impl PackageName {
    /// Validate `name` against the PEP 508 name grammar.
    pub fn new(name: &str) -> Result<Self, ParseError> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(ParseError::InvalidName {
                name: name.to_string(),
            });
        }
        Ok(Self {
            normalized: normalize(name),
            original: name.to_string(),
        })
    }

    /// The name as it was written by the user or the index.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// Lowercased name with runs of `-`, `_` and `.` collapsed to `-`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// PEP 503 normalization, also used for extra names (PEP 685).
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.trim().chars() {
        if matches!(ch, '-' | '_' | '.') {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('-');
        }
        pending_sep = false;
        out.push(ch.to_ascii_lowercase());
    }
    out
}

fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}
