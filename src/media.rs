//! Media identity, decoded payloads, and per-item lifecycle.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;

use crate::decode::{self, MediaDecoder};

/// Preview dimensions derived for every loaded item.
pub const PREVIEW_SIZE: (u32, u32) = (200, 200);

/// Identifies one media file as a directory plus file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    dir: PathBuf,
    file: OsString,
}

impl Location {
    pub fn new(dir: impl Into<PathBuf>, file: impl Into<OsString>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }

    /// Split a full file path into its parent directory and file name.
    /// `None` when the path has no file name component.
    pub fn from_path(path: &Path) -> Option<Self> {
        let file = path.file_name()?.to_os_string();
        let dir = path.parent().unwrap_or(Path::new("")).to_path_buf();
        Some(Self { dir, file })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(&self) -> &OsStr {
        &self.file
    }

    /// Full on-disk path.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path().display().fmt(f)
    }
}

/// What kind of media a file holds, judged from its extension until a decode
/// proves otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Still,
    Animated,
    Unknown,
}

/// One frame of a decoded animation.
#[derive(Debug, Clone)]
pub struct AnimatedFrame {
    pub image: RgbaImage,
    pub delay: Duration,
}

/// A fully decoded animation.
#[derive(Debug, Clone)]
pub struct AnimatedImage {
    pub frames: Vec<AnimatedFrame>,
}

impl AnimatedImage {
    pub fn first_frame(&self) -> Option<&RgbaImage> {
        self.frames.first().map(|f| &f.image)
    }
}

/// Decoded pixel data. Shared ownership keeps served clones cheap while the
/// pixels themselves exist once.
#[derive(Debug, Clone)]
pub enum DecodedMedia {
    Still(Arc<RgbaImage>),
    Animated(Arc<AnimatedImage>),
}

impl DecodedMedia {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Still(_) => MediaKind::Still,
            Self::Animated(_) => MediaKind::Animated,
        }
    }

    /// Pixel dimensions of the still image or the first animation frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.primary_frame().map_or((0, 0), RgbaImage::dimensions)
    }

    fn primary_frame(&self) -> Option<&RgbaImage> {
        match self {
            Self::Still(img) => Some(img),
            Self::Animated(anim) => anim.first_frame(),
        }
    }
}

/// One discoverable unit of media and its cached decode state.
///
/// The identity (location) persists independently of the decoded data:
/// [`unload`](Self::unload) releases pixels under memory pressure while the
/// item remains navigable, and a decode failure is recorded once and sticks.
#[derive(Debug, Clone)]
pub struct MediaItem {
    location: Location,
    kind: MediaKind,
    decoded: Option<DecodedMedia>,
    preview: Option<Arc<RgbaImage>>,
    error: Option<String>,
}

impl MediaItem {
    pub fn new(location: Location, kind: MediaKind) -> Self {
        Self {
            location,
            kind,
            decoded: None,
            preview: None,
            error: None,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn decoded(&self) -> Option<&DecodedMedia> {
        self.decoded.as_ref()
    }

    pub fn preview(&self) -> Option<&RgbaImage> {
        self.preview.as_deref()
    }

    /// The recorded decode failure, if any. Sticky once set.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.decoded.is_some()
    }

    /// Decode the item and derive its preview. A no-op when already loaded;
    /// a failed item is never decoded again.
    pub fn load(&mut self, decoder: &dyn MediaDecoder) -> anyhow::Result<()> {
        if self.decoded.is_some() {
            return Ok(());
        }
        if let Some(reason) = &self.error {
            anyhow::bail!("{reason}");
        }
        match decoder.decode(&self.location) {
            Ok(media) => {
                self.kind = media.kind();
                if self.preview.is_none() {
                    self.preview = media.primary_frame().map(|img| {
                        let (w, h) = PREVIEW_SIZE;
                        Arc::new(decode::fit_cover(img, w, h))
                    });
                }
                self.decoded = Some(media);
                Ok(())
            }
            Err(err) => {
                self.error = Some(format!("{err:#}"));
                Err(err)
            }
        }
    }

    /// Release the decoded pixels while keeping the item (and its preview)
    /// alive.
    pub fn unload(&mut self) {
        self.decoded = None;
    }

    /// Release all decoded data, preview included.
    pub fn forget(&mut self) {
        self.decoded = None;
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use super::*;

    #[derive(Default)]
    struct CountingDecoder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MediaDecoder for CountingDecoder {
        fn decode(&self, _location: &Location) -> anyhow::Result<DecodedMedia> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail {
                return Err(anyhow!("synthetic decode failure"));
            }
            Ok(DecodedMedia::Still(Arc::new(RgbaImage::new(4, 4))))
        }
    }

    fn item() -> MediaItem {
        MediaItem::new(Location::new("lib", "a.jpg"), MediaKind::Still)
    }

    #[test]
    fn load_is_idempotent() {
        let decoder = CountingDecoder::default();
        let mut item = item();
        item.load(&decoder).unwrap();
        item.load(&decoder).unwrap();
        assert!(item.is_loaded());
        assert!(item.preview().is_some());
        assert_eq!(decoder.calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn failed_item_is_never_retried() {
        let decoder = CountingDecoder {
            fail: true,
            ..CountingDecoder::default()
        };
        let mut item = item();
        assert!(item.load(&decoder).is_err());
        assert!(item.load(&decoder).is_err());
        assert_eq!(decoder.calls.load(Ordering::Relaxed), 1);
        assert!(item.error().unwrap().contains("synthetic"));
    }

    #[test]
    fn unload_keeps_identity_and_preview() {
        let decoder = CountingDecoder::default();
        let mut item = item();
        item.load(&decoder).unwrap();
        item.unload();
        assert!(!item.is_loaded());
        assert!(item.preview().is_some());
        assert_eq!(item.location().file_name(), "a.jpg");

        item.load(&decoder).unwrap();
        assert!(item.is_loaded());

        item.forget();
        assert!(item.preview().is_none());
    }

    #[test]
    fn location_round_trips_through_path() {
        let loc = Location::from_path(Path::new("/photos/roll/a.jpg")).unwrap();
        assert_eq!(loc.dir(), Path::new("/photos/roll"));
        assert_eq!(loc.file_name(), "a.jpg");
        assert_eq!(loc.path(), PathBuf::from("/photos/roll/a.jpg"));
        assert!(Location::from_path(Path::new("/")).is_none());
    }
}
