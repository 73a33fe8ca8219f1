//! Reddit listing payloads.
//!
//! Only the fields needed to pick an image are modelled. The listing
//! envelope (`data.children`) is required, so an error body fails to parse.
//! Below that every field is optional or defaulted so that one odd thread
//! never fails the whole listing; unusable threads are skipped during
//! selection instead.

use serde::Deserialize;
use serde_json::Value;

use super::common::Resolution;

/// Top level of `/r/<sub>/hot.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

impl Listing {
    /// Threads in listing order.
    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.data.children.iter().map(|child| &child.data)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    pub children: Vec<ListingChild>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingChild {
    #[serde(default)]
    pub data: Thread,
}

/// A single submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Thread {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub stickied: bool,
    pub preview: Option<Preview>,
}

impl Thread {
    /// Source image of the first preview, if present.
    pub fn preview_source(&self) -> Option<SourceImage> {
        let source = &self.preview.as_ref()?.images.first()?.source;
        let width = dimension(&source.width)?;
        let height = dimension(&source.height)?;

        Some(SourceImage {
            url: unescape_html(source.url.as_deref()?),
            resolution: Resolution::new(width, height),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewImage {
    #[serde(default)]
    pub source: RawSource,
}

/// Source entry as sent by the API; dimensions are kept raw.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSource {
    pub url: Option<String>,
    #[serde(default)]
    pub width: Value,
    #[serde(default)]
    pub height: Value,
}

/// Resolved full-size image of a thread.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub url: String,
    pub resolution: Resolution,
}

/// Read a positive pixel dimension given either as a number or a numeric string.
pub fn dimension(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// Reddit escapes `&` in preview URLs.
fn unescape_html(url: &str) -> String {
    url.replace("&amp;", "&")
}
