//! Runtime configuration for the media cache.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::error::Error;

/// Tunables for one [`MediaCache`](crate::MediaCache) instance.
///
/// The defaults match the sizing the cache was designed around; shrinking the
/// bounds is mostly useful for tests and constrained devices.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// Maximum number of decoded items held ready ahead of the consumer.
    pub ready_capacity: usize,
    /// Maximum number of recently shown items kept decoded for backward
    /// navigation.
    pub ring_capacity: usize,
    /// Maximum number of locations remembered in the show history.
    pub history_limit: usize,
    /// Worker sleep between preload attempts when there is nothing to do.
    #[serde(with = "humantime_serde")]
    pub idle_poll: Duration,
    /// How long `next()` may wait for the preloader before giving up.
    #[serde(with = "humantime_serde")]
    pub advance_wait: Duration,
    /// Extensions (lowercase, without dot) treated as still images.
    pub still_extensions: Vec<String>,
    /// Extensions treated as animations.
    pub animated_extensions: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ready_capacity: 10,
            ring_capacity: 10,
            history_limit: 10_000,
            idle_poll: Duration::from_millis(100),
            advance_wait: Duration::from_secs(10),
            still_extensions: ["jpg", "jpeg", "png", "webp", "bmp"]
                .map(String::from)
                .to_vec(),
            animated_extensions: vec!["gif".to_string()],
        }
    }
}

impl CacheConfig {
    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.ready_capacity > 0, "ready-capacity must be positive");
        ensure!(self.ring_capacity > 0, "ring-capacity must be positive");
        ensure!(self.history_limit > 0, "history-limit must be positive");
        ensure!(!self.idle_poll.is_zero(), "idle-poll must be positive");
        ensure!(
            self.advance_wait >= self.idle_poll,
            "advance-wait must be at least idle-poll"
        );
        ensure!(
            !self.still_extensions.is_empty() || !self.animated_extensions.is_empty(),
            "at least one media extension must be allowed"
        );
        Ok(())
    }
}

/// Load a [`CacheConfig`] from a YAML file.
///
/// # Errors
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Config`]
/// when it does not parse.
pub fn from_yaml_file(path: &Path) -> Result<CacheConfig, Error> {
    let text = std::fs::read_to_string(path)?;
    let cfg = serde_yaml::from_str(&text)?;
    Ok(cfg)
}
