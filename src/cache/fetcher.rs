use super::response::{AssetResponse, ResponseKind};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use url::Url;

/// Network access for the asset cache.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch `url`. Transport failures are errors; any HTTP status is a response.
    async fn fetch(&self, url: &Url) -> Result<AssetResponse>;
}

/// reqwest-backed fetcher.
///
/// Responses from `origin` are classified as [`ResponseKind::Basic`], all
/// others as [`ResponseKind::Cors`].
pub struct HttpFetcher {
    client: Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(origin: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, origin })
    }

    fn classify(&self, url: &Url) -> ResponseKind {
        if url.origin() == self.origin.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<AssetResponse> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status().as_u16();
        // Classify by where we ended up after redirects
        let kind = self.classify(response.url());
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        tracing::debug!(url = %url, status, ?kind, bytes = body.len(), "Fetched asset");

        Ok(AssetResponse {
            url: url.clone(),
            status,
            kind,
            content_type,
            body,
        })
    }
}
