//! Unified fetcher interface.
//!
//! Ties the feed clients, the resolution filter and the storage helpers
//! into the fetch → filter → download → prune pipeline.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api::reddit::{MAX_LIMIT, USER_AGENT};
use crate::api::{noembed, NoembedApi, RedditApi};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::filter::keep_image;
use crate::models::{ImageCandidate, Listing, SourceImage, Thread};
use crate::storage::{self, PruneResult, SaveOutcome};

/// Upper bound for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Result of saving a batch of images.
#[derive(Debug, Default)]
pub struct BatchSaveResult {
    /// Destination directory.
    pub directory: PathBuf,
    /// Images that were downloaded or already present.
    pub successful: Vec<SaveOutcome>,
    /// Failed image titles with error messages.
    pub failed: Vec<(String, String)>,
}

impl BatchSaveResult {
    /// Total number of images attempted.
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Number of newly downloaded images.
    pub fn downloaded(&self) -> usize {
        self.successful
            .iter()
            .filter(|o| matches!(o, SaveOutcome::Saved { .. }))
            .count()
    }

    /// Check if all images were saved.
    pub fn all_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Summary of a full run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Outcome of the download step.
    pub saved: BatchSaveResult,
    /// Outcome of the pruning step, if it ran.
    pub pruned: Option<PruneResult>,
}

/// Main fetcher interface.
///
/// # Example
///
/// ```rust,no_run
/// use earthporn::{Config, Fetcher};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = Fetcher::new(Config::default())?;
///     let summary = fetcher.run().await?;
///     println!("Downloaded {} images", summary.saved.downloaded());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Fetcher {
    config: Config,
    client: Client,
    reddit: RedditApi,
    noembed: NoembedApi,
}

impl Fetcher {
    /// Create a fetcher for the live services.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        let reddit = RedditApi::new(client.clone());
        let noembed = NoembedApi::new(client.clone());

        Ok(Self {
            config,
            client,
            reddit,
            noembed,
        })
    }

    /// Create a fetcher with custom API clients, e.g. pointed at a mock server.
    pub fn with_apis(config: Config, reddit: RedditApi, noembed: NoembedApi) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            reddit,
            noembed,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the listing and pick the images to download.
    pub async fn fetch_candidates(&self) -> Result<Vec<ImageCandidate>> {
        let listing = self.reddit.hot(MAX_LIMIT).await?;
        Ok(self.select(&listing).await)
    }

    /// Pick up to `count` suitable images from a listing, in listing order.
    pub async fn select(&self, listing: &Listing) -> Vec<ImageCandidate> {
        let count = self.config.count as usize;
        let target = self.config.resolution;
        let mut selected = Vec::with_capacity(count);

        for thread in listing.threads() {
            if selected.len() >= count {
                break;
            }
            if thread.stickied {
                debug!("{:?} Skipping stickied thread", thread.title);
                continue;
            }

            let source = match self.source_image(thread).await {
                Ok(source) => source,
                Err(e) => {
                    debug!("{:?} Skipping: {}", thread.title, e);
                    continue;
                }
            };

            if !keep_image(&thread.title, source.resolution, target) {
                continue;
            }

            selected.push(ImageCandidate {
                id: thread.id.clone(),
                title: thread.title.clone(),
                url: source.url,
                resolution: source.resolution,
            });
        }

        info!(
            "Selected {} of {} requested images for {}",
            selected.len(),
            count,
            target
        );
        selected
    }

    /// Resolve the full-size image of a thread.
    async fn source_image(&self, thread: &Thread) -> Result<SourceImage> {
        if noembed::is_flickr_photo(thread) {
            return self.noembed.embed(&thread.url).await;
        }
        thread
            .preview_source()
            .ok_or_else(|| FetchError::NoImage(thread.id.clone()))
    }

    /// Download candidates sequentially into the destination directory.
    ///
    /// A failing image is logged and recorded; the rest still get saved.
    pub async fn save(&self, candidates: &[ImageCandidate]) -> Result<BatchSaveResult> {
        let dest = self.config.dest_dir();
        if !dest.is_dir() {
            fs::create_dir_all(&dest)?;
        }

        let mut result = BatchSaveResult {
            directory: dest.clone(),
            ..Default::default()
        };

        for candidate in candidates {
            match storage::save_image(&self.client, candidate, &dest).await {
                Ok(outcome) => result.successful.push(outcome),
                Err(e) => {
                    warn!("Failed to save {:?}: {}", candidate.title, e);
                    result.failed.push((candidate.title.clone(), e.to_string()));
                }
            }
        }

        Ok(result)
    }

    /// Prune the destination directory if a retention count applies.
    pub fn prune(&self) -> Result<Option<PruneResult>> {
        match self.config.prune_limit() {
            Some(keep) => storage::keep_at_most(&self.config.dest_dir(), keep).map(Some),
            None => Ok(None),
        }
    }

    /// Run the whole pipeline once.
    pub async fn run(&self) -> Result<RunSummary> {
        let candidates = self.fetch_candidates().await?;
        let saved = self.save(&candidates).await?;
        let pruned = self.prune()?;

        Ok(RunSummary { saved, pruned })
    }
}

fn build_client(config: &Config) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT.min(config.timeout()))
        .timeout(config.timeout())
        .build()?)
}
