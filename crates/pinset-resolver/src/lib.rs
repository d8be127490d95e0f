//! Dependency resolution engine: breadth-first discovery over a pluggable
//! metadata provider, exact-pin constraints that override requirement
//! specifiers, strict constraint coverage, and the resulting dependency graph.

pub mod conflict;
pub mod constraints;
pub mod error;
pub mod graph;
pub mod provider;
pub mod resolver;

pub use constraints::{ConstraintTable, Lookup};
pub use error::ResolveError;
pub use graph::{DependencyGraph, ResolvedPackage};
pub use provider::{MetadataProvider, PackageMetadata, ProviderError, VersionRequest};
pub use resolver::{resolve, resolve_with_report, Resolution, ResolveOptions};
