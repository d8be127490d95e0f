//! The constraint table: exact pins that override requirement specifiers.

use indexmap::IndexMap;
use pinset_core::constraint::{Constraint, ConstraintVersion};
use pinset_core::name::normalize;
use pinset_core::version::Version;

use crate::error::ResolveError;

/// Result of looking a package up in the [`ConstraintTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Pinned(&'a Version),
    /// Listed without a version: covered, any version acceptable.
    Unconstrained,
    Absent,
}

/// Constraints keyed by normalized package name. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    entries: IndexMap<String, Constraint>,
}

impl ConstraintTable {
    /// An empty table: every lookup is [`Lookup::Absent`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from constraint entries in file order.
    ///
    /// Identical repeats are ignored and an exact pin always beats a bare
    /// entry for the same name. Two different pins fail with
    /// [`ResolveError::DuplicateConstraint`] unless `allow_double` is set, in
    /// which case the last one wins.
    pub fn load<I>(constraints: I, allow_double: bool) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let mut entries: IndexMap<String, Constraint> = IndexMap::new();
        for constraint in constraints {
            let Some(existing) = entries.get_mut(constraint.key()) else {
                entries.insert(constraint.key().to_string(), constraint);
                continue;
            };
            match (&existing.version, &constraint.version) {
                (ConstraintVersion::Unconstrained, ConstraintVersion::Unconstrained) => {}
                (ConstraintVersion::Exact(a), ConstraintVersion::Exact(b)) if a == b => {}
                (ConstraintVersion::Exact(_), ConstraintVersion::Unconstrained) => {}
                (ConstraintVersion::Unconstrained, ConstraintVersion::Exact(_)) => {
                    *existing = constraint;
                }
                (ConstraintVersion::Exact(_), ConstraintVersion::Exact(_)) => {
                    if !allow_double {
                        return Err(ResolveError::DuplicateConstraint {
                            name: constraint.name.to_string(),
                            first: existing.to_string(),
                            second: constraint.to_string(),
                        });
                    }
                    tracing::warn!("constraint {constraint} replaces {existing}");
                    *existing = constraint;
                }
            }
        }
        Ok(Self { entries })
    }

    /// Look up a package by any spelling of its name.
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.entries.get(&normalize(name)) {
            Some(Constraint {
                version: ConstraintVersion::Exact(v),
                ..
            }) => Lookup::Pinned(v),
            Some(_) => Lookup::Unconstrained,
            None => Lookup::Absent,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in the order they were first loaded.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraints(lines: &[&str]) -> Vec<Constraint> {
        lines.iter().map(|l| Constraint::parse(l).unwrap()).collect()
    }

    #[test]
    fn lookup_normalizes_names() {
        let table = ConstraintTable::load(constraints(&["MarkupSafe==0.23", "Flask"]), false).unwrap();
        assert_eq!(table.len(), 2);
        match table.lookup("markupsafe") {
            Lookup::Pinned(v) => assert_eq!(v.to_string(), "0.23"),
            other => panic!("unexpected lookup {other:?}"),
        }
        assert_eq!(table.lookup("FLASK"), Lookup::Unconstrained);
        assert_eq!(table.lookup("Jinja2"), Lookup::Absent);
        assert!(table.contains("MARKUPSAFE"));
        assert!(!table.contains("Markup-Safe2"));
    }

    #[test]
    fn identical_duplicates_are_ignored() {
        let table =
            ConstraintTable::load(constraints(&["Jinja2==2.8", "jinja2==2.8.0"]), false).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn repeated_bare_names_collapse() {
        let table = ConstraintTable::load(constraints(&["Flask", "flask"]), false).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("Flask"), Lookup::Unconstrained);
    }

    #[test]
    fn differing_pins_fail_without_allow_double() {
        let err = ConstraintTable::load(constraints(&["Jinja2==2.8", "Jinja2==2.9"]), false)
            .unwrap_err();
        match err {
            ResolveError::DuplicateConstraint { first, second, .. } => {
                assert_eq!(first, "Jinja2==2.8");
                assert_eq!(second, "Jinja2==2.9");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn last_pin_wins_with_allow_double() {
        let table =
            ConstraintTable::load(constraints(&["Jinja2==2.8", "Jinja2==2.9"]), true).unwrap();
        match table.lookup("Jinja2") {
            Lookup::Pinned(v) => assert_eq!(v.to_string(), "2.9"),
            other => panic!("unexpected lookup {other:?}"),
        }
    }

    #[test]
    fn exact_pin_beats_bare_name_in_either_order() {
        for lines in [["Flask", "Flask==0.11.1"], ["Flask==0.11.1", "Flask"]] {
            let table = ConstraintTable::load(constraints(&lines), false).unwrap();
            assert!(matches!(table.lookup("flask"), Lookup::Pinned(_)));
        }
    }

    #[test]
    fn iteration_keeps_load_order() {
        let table =
            ConstraintTable::load(constraints(&["b==1", "a==1", "c", "A==1"]), false).unwrap();
        let names: Vec<String> = table.iter().map(|c| c.name.to_string()).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }
}
