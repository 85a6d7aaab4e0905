use serde::{Deserialize, Serialize};
use url::Url;

/// How a response relates to the requesting origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response; the only kind eligible for runtime caching.
    Basic,
    /// Cross-origin response.
    Cors,
    /// Cross-origin response whose status and body are hidden.
    Opaque,
}

/// A fetched or cached asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub url: Url,
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Plain, successful, same-origin responses are stored for offline use.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }
}

/// Cache key for `url`: fragments never reach the network, so they are ignored.
pub fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, kind: ResponseKind) -> AssetResponse {
        AssetResponse {
            url: Url::parse("https://example.com/app.js").unwrap(),
            status,
            kind,
            content_type: None,
            body: Vec::new(),
        }
    }

    #[test]
    fn test_only_basic_200_is_cacheable() {
        assert!(response(200, ResponseKind::Basic).is_cacheable());
        assert!(!response(200, ResponseKind::Cors).is_cacheable());
        assert!(!response(200, ResponseKind::Opaque).is_cacheable());
        assert!(!response(204, ResponseKind::Basic).is_cacheable());
        assert!(!response(404, ResponseKind::Basic).is_cacheable());
    }

    #[test]
    fn test_cache_key_drops_fragment() {
        let url = Url::parse("https://example.com/index.html?x=1#top").unwrap();
        assert_eq!(cache_key(&url), "https://example.com/index.html?x=1");
    }
}
