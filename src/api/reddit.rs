//! Reddit listing client.
//!
//! Fetches the hot listing of the subreddit through the public JSON
//! endpoint (`www.reddit.com/r/<sub>/hot.json`). No authentication is
//! needed, but Reddit expects a descriptive User-Agent.

use reqwest::Client;
use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::models::Listing;

/// Base URL for the Reddit JSON API.
const API_BASE_URL: &str = "https://www.reddit.com";

/// Subreddit the images are taken from.
pub const SUBREDDIT: &str = "earthporn";

/// Largest page the listing endpoint returns.
pub const MAX_LIMIT: u32 = 100;

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("script:earthporn:v", env!("CARGO_PKG_VERSION"));

/// Reddit listing client.
#[derive(Debug, Clone)]
pub struct RedditApi {
    client: Client,
    base_url: String,
}

impl RedditApi {
    /// Create a client against the live API.
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, API_BASE_URL)
    }

    /// Create a client against another host, e.g. a mock server.
    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the hot listing.
    pub fn hot_url(&self) -> String {
        format!("{}/r/{}/hot.json", self.base_url, SUBREDDIT)
    }

    /// Fetch the hot listing with up to `limit` threads.
    pub async fn hot(&self, limit: u32) -> Result<Listing> {
        let url = self.hot_url();
        let limit = limit.min(MAX_LIMIT).to_string();
        info!("Getting url {} with limit {}", url, limit);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("limit", limit.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status, url });
        }

        let body = response.text().await?;
        let listing: Listing = serde_json::from_str(&body)?;
        debug!("Listing holds {} threads", listing.data.children.len());

        Ok(listing)
    }
}
