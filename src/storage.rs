//! Writing images into the destination directory and pruning old ones.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::error::{FetchError, Result};
use crate::models::ImageCandidate;
use crate::naming;

/// Outcome of saving a single image.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Image was downloaded.
    Saved {
        /// Path of the new file.
        path: PathBuf,
        /// File size in bytes.
        size: u64,
    },
    /// File already existed; only its modification time was refreshed.
    AlreadyPresent(PathBuf),
}

impl SaveOutcome {
    /// Path of the image on disk.
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Saved { path, .. } => path,
            SaveOutcome::AlreadyPresent(path) => path,
        }
    }
}

/// Result of a pruning pass.
#[derive(Debug, Default)]
pub struct PruneResult {
    /// Files that were removed.
    pub deleted: Vec<PathBuf>,
    /// Files that could not be removed, with the error message.
    pub failed: Vec<(PathBuf, String)>,
}

/// Save one image into `dest`, skipping it if it is already there.
pub async fn save_image(
    client: &Client,
    candidate: &ImageCandidate,
    dest: &Path,
) -> Result<SaveOutcome> {
    let stem = naming::image_stem(&candidate.id, &candidate.title);
    let path = naming::image_path(dest, &stem);
    info!("Saving image {:?} to {}", stem, path.display());

    if path.exists() {
        debug!("Already saved. Skipping...");
        touch(&path)?;
        return Ok(SaveOutcome::AlreadyPresent(path));
    }

    let size = download_to(client, &candidate.url, &path).await?;
    Ok(SaveOutcome::Saved { path, size })
}

/// Stream `url` into `path`.
///
/// The body goes to a sibling `.part` file first, so an interrupted
/// transfer never leaves a truncated image under the final name.
pub async fn download_to(client: &Client, url: &str, path: &Path) -> Result<u64> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            status,
            url: url.to_string(),
        });
    }

    let part = path.with_extension("part");
    let written = match write_stream(response, &part).await {
        Ok(written) => written,
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e);
        }
    };

    tokio::fs::rename(&part, path).await?;
    debug!("Wrote {} bytes to {}", written, path.display());
    Ok(written)
}

async fn write_stream(response: reqwest::Response, part: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(part).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Set the modification time of `path` to now.
pub fn touch(path: &Path) -> Result<()> {
    let file = fs::File::options().append(true).open(path)?;
    file.set_modified(SystemTime::now())?;
    Ok(())
}

/// Managed images in `dest`, newest first.
pub fn managed_images(dest: &Path) -> Result<Vec<PathBuf>> {
    let mut images: Vec<(SystemTime, PathBuf)> = fs::read_dir(dest)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| naming::is_managed(&entry.file_name().to_string_lossy()))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .collect();

    images.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(images.into_iter().map(|(_, path)| path).collect())
}

/// Delete all but the `keep` most recently modified managed images.
pub fn keep_at_most(dest: &Path, keep: usize) -> Result<PruneResult> {
    let mut result = PruneResult::default();

    for path in managed_images(dest)?.into_iter().skip(keep) {
        info!("Deleting image {}", path.display());
        match fs::remove_file(&path) {
            Ok(()) => result.deleted.push(path),
            Err(e) => {
                error!("Failed to delete {}: {}", path.display(), e);
                result.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(result)
}
