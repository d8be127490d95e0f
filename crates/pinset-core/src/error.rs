use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors produced while parsing names, versions, requirements and files.
#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("invalid package name {name:?}")]
    InvalidName { name: String },

    #[error("invalid version {version:?}")]
    #[diagnostic(help("versions follow PEP 440, e.g. 1.0, 2.1.3rc1, 1.0.post2"))]
    InvalidVersion { version: String },

    #[error("invalid version specifier {specifier:?}: {reason}")]
    InvalidSpecifier { specifier: String, reason: String },

    #[error("invalid environment marker {marker:?}: {reason}")]
    InvalidMarker { marker: String, reason: String },

    #[error("invalid requirement {requirement:?}: {reason}")]
    InvalidRequirement { requirement: String, reason: String },

    #[error("constraint {requirement:?} must pin an exact version (name==version) or name the package alone")]
    NotExactConstraint { requirement: String },

    #[error("{}:{line}: {source}", path.display())]
    AtLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<ParseError>,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("requirements file {} includes itself", path.display())]
    IncludeCycle { path: PathBuf },
}
