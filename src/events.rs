//! Messages emitted by the background preload worker.

use crate::media::Location;

/// Observability events; delivery is best effort and never blocks the worker.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A media item was decoded into the ready cache.
    Preloaded { location: Location },
    /// A file failed to decode and was removed from the discovery pool for
    /// good.
    DecodeFailed { location: Location, reason: String },
    /// The recursive startup scan finished.
    ScanComplete { discovered: usize },
}
