//! Core data types for pinset.
//!
//! This crate defines the structured inputs of a resolution run: normalized
//! package names, PEP 440 versions and specifier sets, PEP 508 environment
//! markers, requirements and constraints, the pip requirements-file parser,
//! and the global configuration.
//!
//! This crate is intentionally free of network I/O.

pub mod config;
pub mod constraint;
pub mod error;
pub mod marker;
pub mod name;
pub mod reqfile;
pub mod requirement;
pub mod specifier;
pub mod version;
