use pinset_util::errors::PinsetError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::marker::MarkerEnvironment;

/// Global user configuration loaded from `~/.pinset/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub environment: EnvironmentConfig,
}

/// Package index settings from `[index]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_timeout", rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            timeout_secs: default_timeout(),
        }
    }
}

pub const DEFAULT_INDEX_URL: &str = "https://pypi.org/pypi";

fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// HTTP response cache configuration from `[cache]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds a cached project listing stays fresh. Release metadata is
    /// immutable and never expires.
    #[serde(default = "default_listing_ttl", rename = "listing-ttl-secs")]
    pub listing_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            enabled: true,
            listing_ttl_secs: default_listing_ttl(),
        }
    }
}

impl CacheConfig {
    /// The cache directory with a leading `~` expanded to the home directory.
    pub fn resolved_dir(&self) -> PathBuf {
        match self.dir.strip_prefix("~/") {
            Some(rest) => home_dir().join(rest),
            None if self.dir == "~" => home_dir(),
            None => PathBuf::from(&self.dir),
        }
    }
}

fn default_cache_dir() -> String {
    "~/.pinset/cache".to_string()
}

fn default_listing_ttl() -> u64 {
    600
}

fn default_true() -> bool {
    true
}

/// Resolution defaults from `[resolve]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Allow pre-releases when choosing versions.
    #[serde(default)]
    pub pre: bool,
}

/// Marker environment overrides from `[environment]`. Unset keys keep the
/// defaults of [`MarkerEnvironment`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default, rename = "python-version")]
    pub python_version: Option<String>,
    #[serde(default, rename = "sys-platform")]
    pub sys_platform: Option<String>,
    #[serde(default, rename = "platform-system")]
    pub platform_system: Option<String>,
    #[serde(default, rename = "platform-machine")]
    pub platform_machine: Option<String>,
    #[serde(default, rename = "os-name")]
    pub os_name: Option<String>,
    #[serde(default, rename = "implementation-name")]
    pub implementation_name: Option<String>,
}

impl EnvironmentConfig {
    /// Build the marker environment used for evaluating requirement markers.
    pub fn to_marker_environment(&self) -> MarkerEnvironment {
        let mut env = MarkerEnvironment::default();
        if let Some(version) = &self.python_version {
            env = env.with_python_version(version);
        }
        let overrides = [
            (&self.sys_platform, &mut env.sys_platform),
            (&self.platform_system, &mut env.platform_system),
            (&self.platform_machine, &mut env.platform_machine),
            (&self.os_name, &mut env.os_name),
            (&self.implementation_name, &mut env.implementation_name),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
        env
    }
}

impl GlobalConfig {
    /// Load the global configuration from `~/.pinset/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| PinsetError::Config {
            message: format!("Failed to read global config {}: {e}", path.display()),
        })?;
        toml::from_str(&content).map_err(|e| {
            PinsetError::Config {
                message: format!("Failed to parse global config {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}

/// Returns the path to the pinset data directory (`~/.pinset/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".pinset")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sections() {
        let config: GlobalConfig = toml::from_str("").unwrap();
        assert_eq!(config.index.url, DEFAULT_INDEX_URL);
        assert_eq!(config.index.timeout_secs, 30);
        assert!(config.cache.enabled);
        assert!(!config.resolve.pre);
        assert!(config.environment.python_version.is_none());
    }

    #[test]
    fn environment_overrides() {
        let config: GlobalConfig = toml::from_str(
            r#"
[environment]
python-version = "3.8"
sys-platform = "win32"
"#,
        )
        .unwrap();
        let env = config.environment.to_marker_environment();
        assert_eq!(env.python_version, "3.8");
        assert_eq!(env.python_full_version, "3.8.0");
        assert_eq!(env.sys_platform, "win32");
    }

    #[test]
    fn absolute_cache_dir_is_untouched() {
        let cache = CacheConfig {
            dir: "/var/cache/pinset".to_string(),
            ..Default::default()
        };
        assert_eq!(cache.resolved_dir(), PathBuf::from("/var/cache/pinset"));
    }
}
