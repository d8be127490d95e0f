//! Report of requirement specifiers that were overridden or ignored.
//!
//! Neither case is an error: a constraint pin always wins over a requirement,
//! and a package is only resolved once per run. The report lets callers show
//! what was set aside.

use std::fmt;

/// Every specifier set aside during one resolution run, in discovery order.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<SpecifierConflict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// A constraint pin replaced the requirement's specifier.
    ConstraintOverride,
    /// The package was already resolved to a version outside the specifier.
    AlreadyResolved,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictReason::ConstraintOverride => f.write_str("pinned by constraint"),
            ConflictReason::AlreadyResolved => f.write_str("already resolved"),
        }
    }
}

/// A requirement specifier the resolved version does not satisfy.
#[derive(Debug, Clone)]
pub struct SpecifierConflict {
    pub name: String,
    pub requested: String,
    pub resolved: String,
    pub required_by: Option<String>,
    pub reason: ConflictReason,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: SpecifierConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpecifierConflict> {
        self.conflicts.iter()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No specifier conflicts.");
        }
        writeln!(f, "Specifier conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SpecifierConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.requested)?;
        if let Some(parent) = &self.required_by {
            write!(f, " (required by {parent})")?;
        }
        write!(f, " resolved to {} ({})", self.resolved, self.reason)
    }
}
