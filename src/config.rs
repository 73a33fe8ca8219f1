//! Run configuration.
//!
//! Settings come from a YAML file (`earthporn.yaml`) and can be overridden
//! on the command line. Every field is optional in the file:
//!
//! ```yaml
//! count: 10
//! dest: ~/Pictures
//! keepcount: 50
//! resolution: 1920x1080
//! log_level: info
//! timeout_secs: 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::reddit::MAX_LIMIT;
use crate::error::{FetchError, Result};
use crate::models::Resolution;

/// Name of the config file.
pub const CONFIG_FILE_NAME: &str = "earthporn.yaml";

/// Settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of images to download.
    pub count: u32,
    /// Destination directory; a leading `~` means the home directory.
    pub dest: String,
    /// Number of images to keep in `dest`; zero or negative disables pruning.
    pub keepcount: i64,
    /// Resolution of the display.
    pub resolution: Resolution,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Per-request timeout in seconds, covering the whole body.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            count: 10,
            dest: "~/Pictures".to_string(),
            keepcount: -1,
            resolution: Resolution::default(),
            log_level: "info".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    /// Parse a config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load the config at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Load from `explicit` if given, else from the first default location
    /// that exists; fall back to defaults when none is found.
    ///
    /// An explicit path that does not exist is an error.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match locate(explicit) {
            Some(path) => Self::load(&path),
            None => {
                warn!("Config file {} not found, using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 || self.count > MAX_LIMIT {
            return Err(FetchError::InvalidConfig(format!(
                "count must be between 1 and {}, got {}",
                MAX_LIMIT, self.count
            )));
        }
        if self.timeout_secs == 0 {
            return Err(FetchError::InvalidConfig(
                "timeout_secs must be positive".to_string(),
            ));
        }
        if self.dest.trim().is_empty() {
            return Err(FetchError::InvalidConfig(
                "dest must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Destination directory with `~` expanded.
    pub fn dest_dir(&self) -> PathBuf {
        expand_home(&self.dest)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Retention count, when pruning applies.
    ///
    /// Pruning only runs when the retention count is positive and larger
    /// than the number of images fetched per run.
    pub fn prune_limit(&self) -> Option<usize> {
        if self.keepcount > 0 && self.keepcount > i64::from(self.count) {
            usize::try_from(self.keepcount).ok()
        } else {
            None
        }
    }
}

/// Places searched for the config file, in order.
pub fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("earthporn").join(CONFIG_FILE_NAME));
    }
    locations
}

/// Path of the config file to use: `explicit` if given, else the first
/// default location that exists.
pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_locations().into_iter().find(|p| p.is_file()),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"))
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
