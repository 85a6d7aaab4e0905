use super::fetcher::AssetFetcher;
use super::manifest::Manifest;
use super::response::AssetResponse;
use super::storage::CacheStorage;
use crate::error::{Error, Result};
use crate::orchestrator::LOCAL_SUFFIX;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Lifecycle of the asset cache.
///
/// `Uninstalled → Installing → Installed → Activating → Active`. A failed
/// install returns to `Uninstalled`; whatever generation was serving before
/// keeps serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Uninstalled => "uninstalled",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        };
        f.write_str(s)
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Network failed and nothing matched; the cached root document was served.
    OfflineFallback,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineFallback => "offline-fallback",
        };
        f.write_str(s)
    }
}

/// Result of intercepting a request.
#[derive(Debug, Clone)]
pub enum Interception {
    /// Appliance traffic: the caller must go straight to the network.
    Bypass,
    Respond {
        response: AssetResponse,
        source: ResponseSource,
    },
}

/// Summary of the cache for status output.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub state: LifecycleState,
    pub version: String,
    pub current_bucket: String,
    pub current_entries: Option<usize>,
    pub buckets: Vec<String>,
}

/// Versioned cache of the shell's own static assets.
///
/// The host drives three transitions: [`install`](Self::install) fills the
/// bucket for the manifest's version, [`activate`](Self::activate) deletes
/// every other bucket, and [`intercept`](Self::intercept) answers individual
/// requests. Requests to `*.local` hosts are never served from or written
/// to any bucket.
pub struct AssetCacheManager {
    manifest: Manifest,
    origin: Url,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn AssetFetcher>,
    state: Mutex<LifecycleState>,
}

impl AssetCacheManager {
    /// Create a manager, deriving the starting state from existing buckets.
    ///
    /// A current bucket with no stale siblings is `Active`; a current bucket
    /// alongside stale ones is `Installed` (awaiting activation); no current
    /// bucket is `Uninstalled`.
    pub fn new(
        manifest: Manifest,
        origin: Url,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Result<Self> {
        let current = manifest.bucket_name();
        let keys = storage.keys()?;
        let state = if !keys.contains(&current) {
            LifecycleState::Uninstalled
        } else if keys.iter().any(|k| k != &current) {
            LifecycleState::Installed
        } else {
            LifecycleState::Active
        };

        Ok(Self {
            manifest,
            origin,
            storage,
            fetcher,
            state: Mutex::new(state),
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn current_bucket(&self) -> String {
        self.manifest.bucket_name()
    }

    fn set_state(&self, state: LifecycleState) {
        let mut current = self.state.lock();
        tracing::debug!(from = %*current, to = %state, "Cache lifecycle transition");
        *current = state;
    }

    /// Fetch every manifest asset and commit them as the current bucket.
    ///
    /// All or nothing: if any asset fails to fetch or answers with a
    /// non-success status, nothing is committed and the state returns to
    /// `Uninstalled`.
    pub async fn install(&self) -> Result<usize> {
        let version = self.manifest.version.clone();
        self.set_state(LifecycleState::Installing);

        match self.fetch_manifest().await {
            Ok(responses) => {
                if let Err(e) = self.storage.commit(&self.current_bucket(), &responses) {
                    self.set_state(LifecycleState::Uninstalled);
                    return Err(Error::CacheInstallFailure {
                        version,
                        reason: e.to_string(),
                    });
                }
                self.set_state(LifecycleState::Installed);
                tracing::info!(
                    bucket = %self.current_bucket(),
                    assets = responses.len(),
                    "Installed asset cache"
                );
                Ok(responses.len())
            }
            Err(reason) => {
                self.set_state(LifecycleState::Uninstalled);
                Err(Error::CacheInstallFailure { version, reason })
            }
        }
    }

    async fn fetch_manifest(&self) -> std::result::Result<Vec<AssetResponse>, String> {
        let urls = self.manifest.urls(&self.origin).map_err(|e| e.to_string())?;
        let mut responses = Vec::with_capacity(urls.len());

        for url in urls {
            let response = self
                .fetcher
                .fetch(&url)
                .await
                .map_err(|e| format!("{}: {}", url, e))?;
            if !response.is_ok() {
                return Err(format!("{}: HTTP {}", url, response.status));
            }
            responses.push(response);
        }
        Ok(responses)
    }

    /// Install hook for the host: absorbs failure so the shell keeps working.
    ///
    /// Returns whether the new generation was installed. On failure the
    /// previous generation (if any) keeps serving.
    pub async fn handle_install(&self) -> bool {
        match self.install().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Offline cache not updated, keeping previous generation: {}", e);
                false
            }
        }
    }

    /// Delete every bucket not belonging to the current version, then take control.
    ///
    /// Returns the names of the deleted buckets.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let current = self.current_bucket();
        if !self.storage.has(&current)? {
            return Err(Error::Cache(format!(
                "Cannot activate '{}': it is not installed",
                current
            )));
        }

        self.set_state(LifecycleState::Activating);
        let mut deleted = Vec::new();
        for bucket in self.storage.keys()? {
            if bucket == current {
                continue;
            }
            match self.storage.delete(&bucket) {
                Ok(_) => deleted.push(bucket),
                Err(e) => {
                    self.set_state(LifecycleState::Installed);
                    return Err(e);
                }
            }
        }

        // Control is claimed only once stale generations are gone
        self.set_state(LifecycleState::Active);
        tracing::info!(bucket = %current, deleted = deleted.len(), "Activated asset cache");
        Ok(deleted)
    }

    /// Whether `url` targets an appliance rather than the shell itself.
    pub fn is_appliance_traffic(url: &Url) -> bool {
        url.host_str()
            .map(|host| {
                // A fully qualified `em1234.local.` names the same host
                let host = host.strip_suffix('.').unwrap_or(host);
                host.to_ascii_lowercase().ends_with(LOCAL_SUFFIX)
            })
            .unwrap_or(false)
    }

    /// Answer a GET request for `url`.
    ///
    /// Cache first; on a miss the network response is returned and, when it
    /// is a plain same-origin 200, stored in the current bucket beforehand.
    /// If the network fails and nothing matches, the cached root document is
    /// served instead.
    pub async fn intercept(&self, url: &Url) -> Result<Interception> {
        if Self::is_appliance_traffic(url) {
            tracing::debug!(url = %url, "Bypassing cache for appliance traffic");
            return Ok(Interception::Bypass);
        }

        let current = self.current_bucket();
        if let Some(response) = self.cached(&current, url) {
            return Ok(Interception::Respond {
                response,
                source: ResponseSource::Cache,
            });
        }

        match self.fetcher.fetch(url).await {
            Ok(response) => {
                if response.is_cacheable() {
                    self.store(&current, &response);
                }
                Ok(Interception::Respond {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(e) => {
                tracing::info!(url = %url, "Network fetch failed, trying offline fallback: {}", e);
                let root = self
                    .origin
                    .join("/")
                    .map_err(|e| Error::Parse(format!("Invalid origin: {}", e)))?;
                match self.cached(&current, &root) {
                    Some(response) => Ok(Interception::Respond {
                        response,
                        source: ResponseSource::OfflineFallback,
                    }),
                    None => Err(Error::Offline(url.to_string())),
                }
            }
        }
    }

    fn cached(&self, current: &str, url: &Url) -> Option<AssetResponse> {
        match self.storage.lookup_any(current, url) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %url, "Cache lookup failed: {}", e);
                None
            }
        }
    }

    fn store(&self, current: &str, response: &AssetResponse) {
        // Runtime caching only adds to an installed generation
        match self.storage.has(current) {
            Ok(true) => {
                if let Err(e) = self.storage.put(current, response) {
                    tracing::warn!(url = %response.url, "Failed to cache response: {}", e);
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Failed to inspect cache buckets: {}", e),
        }
    }

    pub fn status(&self) -> Result<CacheStatus> {
        let current = self.current_bucket();
        Ok(CacheStatus {
            state: self.state(),
            version: self.manifest.version.clone(),
            current_entries: self.storage.entry_count(&current)?,
            current_bucket: current,
            buckets: self.storage.keys()?,
        })
    }
}
