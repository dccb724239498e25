//! Bounded preload and history cache for photo-frame slideshows.
//!
//! A background worker discovers media files under a library root and keeps a
//! small set of decoded items ready ahead of the display. The consumer steps
//! forward into fresh items and backward through a bounded history of
//! everything already shown; recently shown items stay decoded so backward
//! navigation does not hit the disk again.
//!
//! Rendering, input handling, and device control belong to the embedding
//! frame application; this crate only produces decoded media on demand.

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod events;
pub mod media;
pub mod scan;

pub use cache::{CacheStats, MediaCache};
pub use config::CacheConfig;
pub use decode::{ImageDecoder, MediaDecoder};
pub use error::Error;
pub use events::CacheEvent;
pub use media::{AnimatedFrame, AnimatedImage, DecodedMedia, Location, MediaItem, MediaKind};
