//! Open-data API client
//!
//! Thin HTTP/JSON client for the Assembly open-data platform. Payload shapes
//! vary across endpoint generations, so everything is fetched as raw
//! `serde_json::Value` and handed to the normalization layer; this module
//! only owns transport concerns (URLs, timeouts, rate limiting, status
//! handling).

use governor::{Quota, RateLimiter};
use hemicycle_common::config::OpenDataConfig;
use hemicycle_common::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;

/// Open-data API client
///
/// Rate limiting is enforced per client instance: the platform asks for
/// polite consumers, and a token bucket keeps bursts of drill-down fetches
/// from hammering it.
pub struct OpenDataClient {
    /// HTTP client with configured timeouts
    client: Client,
    base_url: String,
    user_agent: String,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl OpenDataClient {
    /// Create a client from configuration
    pub fn new(config: &OpenDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second.max(1))
            .unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: format!(
                "Hemicycle/{} (+https://github.com/hemicycle/hemicycle)",
                env!("CARGO_PKG_VERSION")
            ),
            rate_limiter,
        })
    }

    /// Ballot detail payload (any of the historical shapes)
    pub async fn fetch_scrutin(&self, legislature: u32, ballot_id: &str) -> Result<Value> {
        let url = format!("{}/scrutins/{}/{}", self.base_url, legislature, ballot_id);
        self.get_json(&url).await
    }

    /// One group's detailed vote breakdown for one ballot
    pub async fn fetch_group_detail(
        &self,
        legislature: u32,
        ballot_id: &str,
        group_id: &str,
    ) -> Result<Value> {
        let url = format!(
            "{}/scrutins/{}/{}/groupes/{}",
            self.base_url, legislature, ballot_id, group_id
        );
        self.get_json(&url).await
    }

    /// Organs listing for one legislature (political groups among them)
    pub async fn fetch_organes(&self, legislature: u32) -> Result<Value> {
        let url = format!("{}/legislatures/{}/organes", self.base_url, legislature);
        self.get_json(&url).await
    }

    /// Full actors listing for one legislature
    pub async fn fetch_acteurs(&self, legislature: u32) -> Result<Value> {
        let url = format!("{}/legislatures/{}/acteurs", self.base_url, legislature);
        self.get_json(&url).await
    }

    /// Single actor record; `Ok(None)` when the platform has no such actor
    pub async fn fetch_acteur(&self, legislator_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/acteurs/{}", self.base_url, legislator_id);
        match self.get_json(&url).await {
            Ok(payload) => Ok(Some(payload)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET one URL as JSON, with rate limiting and status mapping
    async fn get_json(&self, url: &str) -> Result<Value> {
        // Async-waits until a token is available
        self.rate_limiter.until_ready().await;

        tracing::debug!(url, "Querying open-data API");

        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "Open-data API returned status {} for {}",
                status, url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to parse response from {}: {}", url, e)))
    }

    #[cfg(test)]
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }
}
