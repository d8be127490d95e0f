//! A package index stored in a single TOML file.
//!
//! ```toml
//! [[package]]
//! name = "Jinja2"
//! version = "2.8"
//! requires = ["MarkupSafe"]
//!
//! [[package]]
//! name = "MarkupSafe"
//! version = "0.23"
//! yanked = false
//! ```

use std::path::{Path, PathBuf};

use pinset_core::name::PackageName;
use pinset_core::requirement::Requirement;
use pinset_core::version::Version;
use pinset_resolver::provider::{MemoryProvider, Release};
use pinset_resolver::{MetadataProvider, PackageMetadata, ProviderError, VersionRequest};
use serde::Deserialize;

use crate::error::IndexError;

#[derive(Debug, Deserialize)]
struct IndexFile {
    #[serde(default, rename = "package")]
    packages: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    name: String,
    version: String,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    yanked: bool,
}

/// Metadata provider over a local TOML index.
#[derive(Debug, Clone)]
pub struct LocalIndex {
    path: PathBuf,
    releases: MemoryProvider,
}

impl LocalIndex {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let content = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse index content; `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, IndexError> {
        let file: IndexFile = toml::from_str(content).map_err(|e| IndexError::Toml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut releases = MemoryProvider::new();
        for entry in file.packages {
            let invalid = |source| IndexError::Entry {
                path: path.to_path_buf(),
                name: entry.name.clone(),
                version: entry.version.clone(),
                source,
            };
            let release = Release {
                name: PackageName::new(&entry.name).map_err(invalid)?,
                version: Version::parse(&entry.version).map_err(invalid)?,
                requires: entry
                    .requires
                    .iter()
                    .map(|r| Requirement::parse(r))
                    .collect::<Result<_, _>>()
                    .map_err(invalid)?,
                yanked: entry.yanked,
            };
            releases.add(release);
        }
        tracing::debug!("loaded {} releases from {}", releases.len(), path.display());

        Ok(Self {
            path: path.to_path_buf(),
            releases,
        })
    }

    /// Consider pre-releases even when the specifier does not name one.
    pub fn allow_prereleases(mut self, allow: bool) -> Self {
        self.releases = self.releases.allow_prereleases(allow);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of releases in the index.
    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

impl MetadataProvider for LocalIndex {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        self.releases.fetch(name, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinset_core::specifier::SpecifierSet;

    const INDEX: &str = r#"
[[package]]
name = "Jinja2"
version = "2.8"
requires = ["MarkupSafe"]

[[package]]
name = "Jinja2"
version = "2.9"
requires = ["MarkupSafe>=0.23"]
yanked = true

[[package]]
name = "MarkupSafe"
version = "0.23"
"#;

    fn any() -> VersionRequest {
        VersionRequest::Matching(SpecifierSet::default())
    }

    #[test]
    fn parses_entries() {
        let index = LocalIndex::parse(INDEX, Path::new("index.toml")).unwrap();
        assert_eq!(index.len(), 3);
        let meta = index.fetch(&PackageName::new("jinja2").unwrap(), &any()).unwrap();
        assert_eq!(meta.version.to_string(), "2.8");
        assert_eq!(meta.dependencies[0].name.as_str(), "MarkupSafe");
    }

    #[test]
    fn yanked_only_when_pinned() {
        let index = LocalIndex::parse(INDEX, Path::new("index.toml")).unwrap();
        let pinned = VersionRequest::Pinned(Version::parse("2.9").unwrap());
        let meta = index.fetch(&PackageName::new("Jinja2").unwrap(), &pinned).unwrap();
        assert_eq!(meta.version.to_string(), "2.9");
    }

    #[test]
    fn empty_index_is_valid() {
        let index = LocalIndex::parse("", Path::new("index.toml")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn bad_entries_are_reported() {
        let err = LocalIndex::parse(
            "[[package]]\nname = \"pkg\"\nversion = \"not-a-version\"\n",
            Path::new("index.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::Entry { .. }));
        assert!(err.to_string().contains("pkg not-a-version"));

        let err = LocalIndex::parse("[[package]]\nversion = \"1.0\"\n", Path::new("index.toml"))
            .unwrap_err();
        assert!(matches!(err, IndexError::Toml { .. }));
    }
}
