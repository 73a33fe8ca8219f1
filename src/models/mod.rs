//! Data models for feed responses and selected images.

pub mod common;
pub mod listing;

// Re-exports for convenience
pub use common::{ImageCandidate, Resolution};
pub use listing::{Listing, SourceImage, Thread};
