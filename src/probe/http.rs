use super::Prober;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, redirect, Client};
use std::sync::OnceLock;
use url::Url;

/// Global shared HTTP client for probes.
///
/// No client-level timeout is set: the orchestrator bounds every probe with
/// its own deadline and drops the request future when it expires.
static SHARED_HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_shared_client() -> &'static Client {
    SHARED_HTTP_CLIENT.get_or_init(|| {
        build_client().expect("Failed to create shared HTTP client")
    })
}

fn build_client() -> reqwest::Result<Client> {
    // A redirect is already proof the appliance answered
    Client::builder()
        .redirect(redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
}

/// HTTP reachability prober.
///
/// Any HTTP response, whatever its status, counts as reachable. A refused
/// connection, DNS failure, or failed TLS handshake is a probe failure.
#[derive(Clone)]
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    /// Create a prober with its own client.
    pub fn new() -> Result<Self> {
        let client = build_client()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a prober using the global shared client.
    pub fn with_shared_client() -> Self {
        Self {
            client: get_shared_client().clone(),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &Url) -> Result<()> {
        let response = self
            .client
            .get(url.clone())
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| Error::ProbeFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(url = %url, status = %response.status(), "Probe received response");
        Ok(())
    }
}
