use std::path::PathBuf;

use miette::Diagnostic;
use pinset_core::error::ParseError;
use thiserror::Error;

/// Errors loading a local index file.
#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("failed to read index {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid index {}: {message}", path.display())]
    #[diagnostic(help("an index is a list of [[package]] tables with name, version and requires"))]
    Toml { path: PathBuf, message: String },

    #[error("invalid entry {name} {version} in {}: {source}", path.display())]
    Entry {
        path: PathBuf,
        name: String,
        version: String,
        #[source]
        source: ParseError,
    },
}
