//! Recursive discovery of media files under a library root.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use crate::config::CacheConfig;
use crate::error::Error;
use crate::media::{Location, MediaKind};

/// Directory names starting with this marker are excluded subtrees.
pub const EXCLUDED_DIR_MARKER: char = '_';

/// Extension allow-list and the kind each extension maps to.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    still: Vec<String>,
    animated: Vec<String>,
}

impl ScanFilter {
    pub fn from_config(cfg: &CacheConfig) -> Self {
        let lower = |exts: &[String]| exts.iter().map(|e| e.to_ascii_lowercase()).collect();
        Self {
            still: lower(&cfg.still_extensions),
            animated: lower(&cfg.animated_extensions),
        }
    }

    /// Classify `path` by extension; `None` when it is not allow-listed.
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = path.extension().and_then(|e| e.to_str())?.to_ascii_lowercase();
        if self.still.iter().any(|e| *e == ext) {
            Some(MediaKind::Still)
        } else if self.animated.iter().any(|e| *e == ext) {
            Some(MediaKind::Animated)
        } else {
            None
        }
    }
}

fn excluded_dir(entry: &DirEntry) -> bool {
    // Never exclude the scan root itself, whatever it is named.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with(EXCLUDED_DIR_MARKER))
}

/// Iterate entries under `root`, pruning excluded subtrees and silently
/// skipping unreadable ones.
pub(crate) fn walker(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !excluded_dir(e))
        .flatten()
}

/// Collect every eligible media file under `root` in one pass.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory.
pub fn collect(root: &Path, filter: &ScanFilter) -> Result<Vec<(Location, MediaKind)>, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.to_string_lossy().into_owned()));
    }
    let mut out = Vec::new();
    for entry in walker(root) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = filter.classify(entry.path()) else {
            continue;
        };
        if let Some(location) = Location::from_path(entry.path()) {
            out.push((location, kind));
        }
    }
    Ok(out)
}
