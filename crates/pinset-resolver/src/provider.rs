//! The metadata capability the engine resolves against.
//!
//! A [`MetadataProvider`] answers one question: for a package name and a
//! version request, which single version is selected and what does that
//! version depend on. Concrete providers (local index, PyPI) live in
//! `pinset-index`; [`MemoryProvider`] serves fixed in-memory metadata and
//! [`CachedProvider`] memoizes any provider.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use miette::Diagnostic;
use pinset_core::error::ParseError;
use pinset_core::name::PackageName;
use pinset_core::requirement::Requirement;
use pinset_core::specifier::SpecifierSet;
use pinset_core::version::Version;
use thiserror::Error;

/// What the engine asks a provider for.
#[derive(Debug, Clone)]
pub enum VersionRequest {
    /// Exactly this version, imposed by a constraint.
    Pinned(Version),
    /// The best version admitted by the set (empty = any).
    Matching(SpecifierSet),
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRequest::Pinned(v) => write!(f, "=={v}"),
            VersionRequest::Matching(spec) if spec.is_empty() => f.write_str("any version"),
            VersionRequest::Matching(spec) => write!(f, "{spec}"),
        }
    }
}

/// The selected version of a package and its declared dependencies.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub name: PackageName,
    pub version: Version,
    /// Declared requirements, markers not yet evaluated.
    pub dependencies: Vec<Requirement>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// No version of the package satisfies the request.
    #[error("no version of {name} matches {request}")]
    NotFound { name: String, request: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("invalid metadata for {name}: {message}")]
    InvalidMetadata { name: String, message: String },
}

impl ProviderError {
    pub fn not_found(name: &PackageName, request: &VersionRequest) -> Self {
        ProviderError::NotFound {
            name: name.to_string(),
            request: request.to_string(),
        }
    }
}

/// Source of package metadata.
pub trait MetadataProvider {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for &P {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        (**self).fetch(name, request)
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Box<P> {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        (**self).fetch(name, request)
    }
}

/// One published version of a package.
#[derive(Debug, Clone)]
pub struct Release {
    pub name: PackageName,
    pub version: Version,
    pub requires: Vec<Requirement>,
    pub yanked: bool,
}

/// A provider over a fixed set of releases.
///
/// `Matching` requests pick the highest non-yanked release the specifier
/// admits; `Pinned` requests are honoured even for yanked releases.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    releases: HashMap<String, Vec<Release>>,
    prereleases: bool,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consider pre-releases even when the specifier does not name one.
    pub fn allow_prereleases(mut self, allow: bool) -> Self {
        self.prereleases = allow;
        self
    }

    pub fn add(&mut self, release: Release) {
        self.releases
            .entry(release.name.normalized().to_string())
            .or_default()
            .push(release);
    }

    /// Convenience builder: add `name==version` depending on `requires`.
    pub fn with_package(
        mut self,
        name: &str,
        version: &str,
        requires: &[&str],
    ) -> Result<Self, ParseError> {
        let release = Release {
            name: PackageName::new(name)?,
            version: Version::parse(version)?,
            requires: requires
                .iter()
                .map(|r| Requirement::parse(r))
                .collect::<Result<_, _>>()?,
            yanked: false,
        };
        self.add(release);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.releases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    fn select(&self, releases: &[Release], request: &VersionRequest) -> Option<usize> {
        match request {
            VersionRequest::Pinned(version) => releases.iter().position(|r| r.version == *version),
            VersionRequest::Matching(spec) => {
                let candidates = releases.iter().filter(|r| !r.yanked).map(|r| &r.version);
                let best = spec.best_match(candidates, self.prereleases)?;
                releases
                    .iter()
                    .position(|r| !r.yanked && r.version == *best)
            }
        }
    }
}

impl MetadataProvider for MemoryProvider {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        let releases = self
            .releases
            .get(name.normalized())
            .ok_or_else(|| ProviderError::not_found(name, request))?;
        let idx = self
            .select(releases, request)
            .ok_or_else(|| ProviderError::not_found(name, request))?;
        let release = &releases[idx];
        Ok(PackageMetadata {
            name: release.name.clone(),
            version: release.version.clone(),
            dependencies: release.requires.clone(),
        })
    }
}

/// Memoizes `(name, request)` lookups of an inner provider.
///
/// Only successful lookups are cached. The memo sits behind a [`Mutex`] so a
/// single cache can be shared by independent resolution runs.
pub struct CachedProvider<P> {
    inner: P,
    memo: Mutex<HashMap<(String, String), PackageMetadata>>,
}

impl<P: MetadataProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Number of memoized lookups.
    pub fn cached(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl<P: MetadataProvider> MetadataProvider for CachedProvider<P> {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        let key = (name.normalized().to_string(), request.to_string());
        if let Ok(memo) = self.memo.lock() {
            if let Some(hit) = memo.get(&key) {
                tracing::trace!("provider cache hit for {} {}", name, request);
                return Ok(hit.clone());
            }
        }
        let metadata = self.inner.fetch(name, request)?;
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(key, metadata.clone());
        }
        Ok(metadata)
    }
}
