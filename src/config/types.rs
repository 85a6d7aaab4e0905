//! Root configuration for `mosi.yaml`.

use super::parse_duration_string;
use crate::cache::{Manifest, DEFAULT_CACHE_VERSION, DEFAULT_MANIFEST};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default storage root, relative to the home directory.
pub const DEFAULT_DATA_DIR: &str = ".mosi";

/// Default origin the shell's own assets are served from.
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

/// Default per-candidate probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: &str = "5s";

/// Root configuration structure for `mosi.yaml`.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Storage root for history and cache buckets. `~/` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "default_cache_version")]
    pub version: String,

    /// Asset paths pre-populated on install, relative to `origin`.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,
}

fn default_probe_timeout() -> String {
    DEFAULT_PROBE_TIMEOUT.to_string()
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_cache_version() -> String {
    DEFAULT_CACHE_VERSION.to_string()
}

fn default_manifest() -> Vec<String> {
    DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            probe_timeout: default_probe_timeout(),
            origin: default_origin(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_cache_version(),
            manifest: default_manifest(),
        }
    }
}

impl Config {
    /// Resolved storage root.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => expand_home(dir),
            None => home_dir().map(|home| home.join(DEFAULT_DATA_DIR)),
        }
    }

    /// Directory holding key/value storage (connection history).
    pub fn storage_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("storage"))
    }

    /// Directory holding asset cache buckets.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("caches"))
    }

    pub fn probe_timeout(&self) -> Result<Duration> {
        parse_duration_string(&self.probe_timeout).ok_or_else(|| {
            Error::Validation(format!(
                "Invalid probe_timeout '{}'. Use a duration like '5s' or '500ms'",
                self.probe_timeout
            ))
        })
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin)
            .map_err(|e| Error::Validation(format!("Invalid origin '{}': {}", self.origin, e)))
    }

    pub fn manifest(&self) -> Manifest {
        Manifest::new(self.cache.version.clone(), self.cache.manifest.clone())
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        Error::Config("Could not determine home directory; set data_dir in mosi.yaml".to_string())
    })
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
