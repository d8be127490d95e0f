use miette::Diagnostic;
use thiserror::Error;

/// Why a resolution run failed. Every variant aborts the run; no partial
/// graph is returned.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error(
        "no version of {name} matches {request}{}",
        required_by.as_ref().map(|p| format!(" (required by {p})")).unwrap_or_default()
    )]
    #[diagnostic(help("check the package name and the version constraints"))]
    PackageNotFound {
        name: String,
        request: String,
        required_by: Option<String>,
    },

    #[error("packages not covered by the constraints: {}", names.join(", "))]
    #[diagnostic(help("add an entry (name==version, or the bare name) for each package to a constraints file"))]
    UncoveredRequirement { names: Vec<String> },

    #[error("{name} resolved to {existing} but another requirement selects {requested}")]
    VersionConflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("conflicting constraints for {name}: {first} and {second}")]
    #[diagnostic(help("pass --allow-double to let the last entry win"))]
    DuplicateConstraint {
        name: String,
        first: String,
        second: String,
    },

    #[error("failed to fetch metadata for {name}: {message}")]
    Provider { name: String, message: String },
}
