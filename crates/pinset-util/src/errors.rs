use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for application-level pinset operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PinsetError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A requirements, constraints or index file could not be parsed.
    #[error("Parse error: {message}")]
    #[diagnostic(help("Check the file for syntax errors"))]
    Parse { message: String },

    /// Invalid configuration or command-line option combination.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Dependency resolution failed (missing packages, uncovered constraints, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// Network request to a package index failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type PinsetResult<T> = miette::Result<T>;
