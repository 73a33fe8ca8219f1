//! # earthporn
//!
//! Keeps a wallpaper directory stocked with the top images from
//! [r/EarthPorn](https://www.reddit.com/r/EarthPorn).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use earthporn::{Config, Fetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         count: 5,
//!         dest: "~/Pictures/Wallpapers".to_string(),
//!         keepcount: 40,
//!         ..Default::default()
//!     };
//!
//!     let summary = Fetcher::new(config)?.run().await?;
//!     println!("Downloaded {} images", summary.saved.downloaded());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. Fetch the hot listing ([`RedditApi`]), resolving Flickr links
//!    through [`NoembedApi`]
//! 2. Keep images that suit the display ([`filter::keep_image`])
//! 3. Download them one after another into the destination directory
//! 4. Delete the oldest `DOWN-*.jpg` files beyond the retention count
//!
//! The [`schedule`] module installs the binary as a cron job or a Windows
//! scheduled task.

pub mod api;
pub mod config;
pub mod error;
mod fetcher;
pub mod filter;
pub mod models;
pub mod naming;
pub mod schedule;
pub mod storage;

// Main interface (recommended)
pub use config::Config;
pub use fetcher::{BatchSaveResult, Fetcher, RunSummary};

// Low-level APIs
pub use api::{NoembedApi, RedditApi};
pub use error::FetchError;
pub use models::{ImageCandidate, Resolution};
pub use storage::{PruneResult, SaveOutcome};
