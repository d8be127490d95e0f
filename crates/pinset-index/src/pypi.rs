//! Package metadata from a PyPI-compatible JSON API.
//!
//! `{base}/{name}/json` lists a project's releases and `{base}/{name}/{version}/json`
//! carries the `requires_dist` of one release. Release bodies never change and
//! are cached indefinitely; listings are refetched once older than the
//! provider's listing TTL.

use std::collections::HashMap;
use std::time::Duration;

use pinset_core::name::PackageName;
use pinset_core::requirement::Requirement;
use pinset_core::version::Version;
use pinset_resolver::{MetadataProvider, PackageMetadata, ProviderError, VersionRequest};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::cache::HttpCache;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// How long a cached project listing is trusted by default.
pub const DEFAULT_LISTING_TTL: Duration = Duration::from_secs(600);

/// Build a blocking reqwest client for index requests.
pub fn build_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("pinset/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ProviderError::Network {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseFile {
    #[serde(default)]
    yanked: bool,
}

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    info: ReleaseInfo,
}

#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    name: String,
    version: String,
    #[serde(default)]
    requires_dist: Option<Vec<String>>,
}

/// A release named in a project listing.
#[derive(Debug, Clone)]
pub struct ListedRelease {
    /// The version as the index spells it.
    pub version: Version,
    /// At least one file exists and not every file is yanked.
    pub installable: bool,
}

/// Every release of a project listing, sorted by version. Versions that are
/// not valid PEP 440 are skipped.
pub fn parse_project_listing(body: &str) -> Result<Vec<ListedRelease>, serde_json::Error> {
    let project: ProjectResponse = serde_json::from_str(body)?;
    let mut releases: Vec<ListedRelease> = project
        .releases
        .iter()
        .filter_map(|(raw, files)| match Version::parse(raw) {
            Ok(version) => Some(ListedRelease {
                version,
                installable: files.iter().any(|f| !f.yanked),
            }),
            Err(_) => {
                tracing::debug!("skipping non-PEP 440 release {raw:?}");
                None
            }
        })
        .collect();
    releases.sort_by(|a, b| a.version.cmp(&b.version));
    Ok(releases)
}

/// Installable versions from a project listing, sorted.
pub fn parse_project_versions(body: &str) -> Result<Vec<Version>, serde_json::Error> {
    Ok(parse_project_listing(body)?
        .into_iter()
        .filter(|r| r.installable)
        .map(|r| r.version)
        .collect())
}

/// Name, version and declared requirements of a single release. Malformed
/// requirement strings are skipped with a warning.
pub fn parse_release(body: &str) -> Result<(String, String, Vec<Requirement>), serde_json::Error> {
    let release: ReleaseResponse = serde_json::from_str(body)?;
    let info = release.info;
    let requires = info
        .requires_dist
        .unwrap_or_default()
        .iter()
        .filter_map(|raw| match Requirement::parse(raw) {
            Ok(req) => Some(req),
            Err(e) => {
                tracing::warn!("{} {}: skipping requirement: {e}", info.name, info.version);
                None
            }
        })
        .collect();
    Ok((info.name, info.version, requires))
}

/// Metadata provider backed by the PyPI JSON API.
pub struct PypiProvider {
    client: Client,
    base_url: String,
    cache: HttpCache,
    listing_ttl: Duration,
    prereleases: bool,
}

impl PypiProvider {
    pub fn new(base_url: &str, cache: HttpCache, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            listing_ttl: DEFAULT_LISTING_TTL,
            prereleases: false,
        })
    }

    /// Maximum age of a cached project listing before it is fetched again.
    pub fn with_listing_ttl(mut self, ttl: Duration) -> Self {
        self.listing_ttl = ttl;
        self
    }

    /// Consider pre-releases even when the specifier does not name one.
    pub fn allow_prereleases(mut self, allow: bool) -> Self {
        self.prereleases = allow;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn project_url(&self, name: &PackageName) -> String {
        format!("{}/{}/json", self.base_url, name.normalized())
    }

    pub fn release_url(&self, name: &PackageName, version: &Version) -> String {
        format!("{}/{}/{}/json", self.base_url, name.normalized(), version)
    }

    /// GET `url`, consulting the cache first. Cached bodies older than
    /// `max_age` are ignored. `Ok(None)` means 404.
    fn get(&self, url: &str, max_age: Option<Duration>) -> Result<Option<String>, ProviderError> {
        let cached = match max_age {
            Some(max_age) => self.cache.get_fresh(url, max_age),
            None => self.cache.get(url),
        };
        if let Some(body) = cached {
            return Ok(Some(body));
        }
        let body = self.download(url)?;
        if let Some(body) = &body {
            self.cache.put(url, body);
        }
        Ok(body)
    }

    fn download(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                std::thread::sleep(RETRY_DELAY * attempt);
            }
            tracing::debug!("GET {url}");

            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Ok(None);
                    }
                    if status.is_server_error() {
                        last_err = format!("HTTP {status} from {url}");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(ProviderError::Network {
                            message: format!("HTTP {status} fetching {url}"),
                        });
                    }
                    let body = resp.text().map_err(|e| ProviderError::Network {
                        message: format!("Failed to read response from {url}: {e}"),
                    })?;
                    return Ok(Some(body));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = format!("{e}");
                    continue;
                }
                Err(e) => {
                    return Err(ProviderError::Network {
                        message: format!("Request to {url} failed: {e}"),
                    });
                }
            }
        }

        Err(ProviderError::Network {
            message: format!("Failed after {MAX_RETRIES} retries for {url}: {last_err}"),
        })
    }

    /// Pick the release to fetch. A pin is matched against the listing so
    /// that the URL uses the index's spelling (`2.8.0` finds `2.8`); yanked
    /// releases still satisfy a pin.
    fn select_version(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<Version, ProviderError> {
        let url = self.project_url(name);
        let body = self
            .get(&url, Some(self.listing_ttl))?
            .ok_or_else(|| ProviderError::not_found(name, request))?;
        let listing = parse_project_listing(&body).map_err(|e| invalid(name, &url, e))?;

        match request {
            VersionRequest::Pinned(pin) => Ok(listing
                .into_iter()
                .map(|r| r.version)
                .find(|v| v == pin)
                .unwrap_or_else(|| pin.clone())),
            VersionRequest::Matching(spec) => {
                let versions: Vec<Version> = listing
                    .into_iter()
                    .filter(|r| r.installable)
                    .map(|r| r.version)
                    .collect();
                spec.best_match(&versions, self.prereleases)
                    .cloned()
                    .ok_or_else(|| ProviderError::not_found(name, request))
            }
        }
    }
}

fn invalid(name: &PackageName, url: &str, e: serde_json::Error) -> ProviderError {
    ProviderError::InvalidMetadata {
        name: name.to_string(),
        message: format!("unexpected response from {url}: {e}"),
    }
}

impl MetadataProvider for PypiProvider {
    fn fetch(
        &self,
        name: &PackageName,
        request: &VersionRequest,
    ) -> Result<PackageMetadata, ProviderError> {
        let version = self.select_version(name, request)?;
        let url = self.release_url(name, &version);
        let body = self
            .get(&url, None)?
            .ok_or_else(|| ProviderError::not_found(name, request))?;
        let (project, _, dependencies) = parse_release(&body).map_err(|e| invalid(name, &url, e))?;
        Ok(PackageMetadata {
            name: PackageName::new(&project).unwrap_or_else(|_| name.clone()),
            version,
            dependencies,
        })
    }
}
