//! HTTP clients for the image feed.
//!
//! - [`RedditApi`]: hot listing of the subreddit
//! - [`NoembedApi`]: resolves Flickr photo pages to direct image URLs

pub mod noembed;
pub mod reddit;

pub use noembed::NoembedApi;
pub use reddit::RedditApi;
