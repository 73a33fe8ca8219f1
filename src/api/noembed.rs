//! Flickr image resolution through noembed.
//!
//! Flickr links point to a photo page rather than to the image itself.
//! noembed.com turns such a page into an oEmbed document that carries the
//! direct media URL and its dimensions.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{FetchError, Result};
use crate::models::listing::{dimension, SourceImage};
use crate::models::{Resolution, Thread};

/// Base URL of the noembed service.
const API_BASE_URL: &str = "https://noembed.com";

/// Flickr photo page, from Reddit Enhancement Suite.
static FLICKR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:\w+\.)?flickr\.com/(?:.+)/(\d{10,})(?:/|$)")
        .expect("flickr pattern is valid")
});

/// Whether a thread links a Flickr photo page.
pub fn is_flickr_photo(thread: &Thread) -> bool {
    thread.domain == "flickr.com" && FLICKR_RE.is_match(&thread.url)
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    media_url: Option<String>,
    #[serde(default)]
    width: Value,
    #[serde(default)]
    height: Value,
}

/// noembed client.
#[derive(Debug, Clone)]
pub struct NoembedApi {
    client: Client,
    base_url: String,
}

impl NoembedApi {
    /// Create a client against the live service.
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

    /// Resolve a photo page URL to its full-size image.
    pub async fn embed(&self, page_url: &str) -> Result<SourceImage> {
        let url = format!("{}/embed", self.base_url);
        debug!("GET {} for {}", url, page_url);

        let response = self
            .client
            .get(&url)
            .query(&[("url", page_url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status, url });
        }

        let embed: EmbedResponse = response.json().await?;
        let no_image = || FetchError::NoImage(page_url.to_string());

        let media_url = embed.media_url.ok_or_else(no_image)?;
        let width = dimension(&embed.width).ok_or_else(no_image)?;
        let height = dimension(&embed.height).ok_or_else(no_image)?;

        Ok(SourceImage {
            url: media_url,
            resolution: Resolution::new(width, height),
        })
    }
}
