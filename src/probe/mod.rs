mod http;

pub use http::HttpProber;

use crate::error::Result;
use async_trait::async_trait;
use url::Url;

/// Reachability check against a single endpoint.
///
/// A probe answers one question: did the endpoint respond at all? The
/// response status and body are not inspected. Deadlines are enforced by
/// the caller, which drops the probe future when it expires, so
/// implementations must not spawn work that outlives the future.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `url`, returning `Ok(())` if a response was received.
    async fn probe(&self, url: &Url) -> Result<()>;
}
