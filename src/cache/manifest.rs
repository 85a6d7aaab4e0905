use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Prefix shared by every bucket this application creates.
pub const CACHE_PREFIX: &str = "mosi-controller";

/// Version tag of the assets shipped with this build.
pub const DEFAULT_CACHE_VERSION: &str = "v2";

/// The shell's own static assets, pre-populated on install.
pub const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/mosi-controller/index.html",
    "/mosi-controller/app.js",
    "/mosi-controller/manifest.json",
    "/mosi-controller/icon-192.svg",
    "/mosi-controller/icon-512.svg",
    "/mosi-controller/share.svg",
    "/mosi-controller/splash-640x1136.png",
    "/mosi-controller/splash-750x1334.png",
    "/mosi-controller/splash-1242x2208.png",
    "/mosi-controller/splash-1125x2436.png",
];

/// A cache version tag bound to an ordered list of asset paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub assets: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_string(),
            assets: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Manifest {
    pub fn new(version: impl Into<String>, assets: Vec<String>) -> Self {
        Self {
            version: version.into(),
            assets,
        }
    }

    /// Name of the bucket holding this version's assets.
    pub fn bucket_name(&self) -> String {
        format!("{}-{}", CACHE_PREFIX, self.version)
    }

    /// Asset URLs resolved against `origin`, in manifest order.
    pub fn urls(&self, origin: &Url) -> Result<Vec<Url>> {
        self.assets
            .iter()
            .map(|path| {
                origin.join(path).map_err(|e| {
                    Error::Config(format!("Invalid manifest entry '{}': {}", path, e))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = Manifest::default();
        assert_eq!(manifest.bucket_name(), "mosi-controller-v2");
        assert_eq!(manifest.assets.len(), 11);
        assert_eq!(manifest.assets[0], "/");
    }

    #[test]
    fn test_urls_resolve_against_origin() {
        let manifest = Manifest::new("v9", vec!["/".into(), "/mosi-controller/app.js".into()]);
        let origin = Url::parse("https://example.com/").unwrap();
        let urls = manifest.urls(&origin).unwrap();
        assert_eq!(urls[0].as_str(), "https://example.com/");
        assert_eq!(urls[1].as_str(), "https://example.com/mosi-controller/app.js");
        assert_eq!(manifest.bucket_name(), "mosi-controller-v9");
    }
}
