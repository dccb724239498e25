//! Background discovery and preload plus bidirectional navigation over a
//! bounded history of shown media.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use rand::seq::IteratorRandom;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::decode::{ImageDecoder, MediaDecoder};
use crate::error::Error;
use crate::events::CacheEvent;
use crate::media::{Location, MediaItem, MediaKind};
use crate::scan::{self, ScanFilter};

// Preload once per this many eligible files found during the startup scan.
const SCAN_PRELOAD_INTERVAL: usize = 10;
const EVENT_QUEUE_DEPTH: usize = 256;

#[derive(Default)]
struct PoolState {
    /// Every known-eligible location; shrinks only on proven decode failure.
    discovered: HashMap<Location, MediaKind>,
    /// Decoded items waiting to be shown, bounded at `ready_capacity`.
    ready: HashMap<Location, MediaItem>,
    scan_complete: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    stop: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Navigation position relative to the newest history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// At the live edge: the next `next()` pulls a fresh item.
    Live,
    /// Showing the entry `n` steps behind the newest one.
    Back(usize),
}

/// Pool and history sizes, for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub discovered: usize,
    pub ready: usize,
    pub history: usize,
    pub scan_complete: bool,
}

/// Discovers media under a root directory, keeps a bounded look-ahead of
/// decoded items, and serves a navigable stream to a single consumer.
///
/// One background worker thread feeds the discovery pool and ready cache
/// behind a shared lock; history, the decoded ring, and the cursor belong to
/// the consumer calling [`next`](Self::next) and [`previous`](Self::previous).
pub struct MediaCache {
    config: CacheConfig,
    decoder: Arc<dyn MediaDecoder>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    events_tx: Sender<CacheEvent>,
    events_rx: Receiver<CacheEvent>,
    history: VecDeque<Location>,
    ring: VecDeque<MediaItem>,
    cursor: Cursor,
}

impl MediaCache {
    /// Cache with the default `image`-based decoder.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_decoder(config, Arc::new(ImageDecoder::new()))
    }

    pub fn with_decoder(config: CacheConfig, decoder: Arc<dyn MediaDecoder>) -> Self {
        let (events_tx, events_rx) = bounded(EVENT_QUEUE_DEPTH);
        Self {
            config,
            decoder,
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState::default()),
                stop: AtomicBool::new(false),
            }),
            worker: None,
            events_tx,
            events_rx,
            history: VecDeque::new(),
            ring: VecDeque::new(),
            cursor: Cursor::Live,
        }
    }

    /// Subscribe to worker events. Events are dropped rather than queued
    /// unboundedly when no receiver keeps up.
    pub fn events(&self) -> Receiver<CacheEvent> {
        self.events_rx.clone()
    }

    /// Spawn the background discovery/preload worker for `root`. Returns
    /// without blocking; individual decode failures are logged, not raised.
    ///
    /// # Errors
    /// [`Error::BadDir`] when `root` is not a directory, [`Error::Io`] when
    /// the worker thread cannot be spawned.
    pub fn start(&mut self, root: impl AsRef<Path>) -> Result<(), Error> {
        let root = root.as_ref();
        if self.worker.is_some() {
            warn!("media cache already started");
            return Ok(());
        }
        if !root.is_dir() {
            return Err(Error::BadDir(root.to_string_lossy().into_owned()));
        }
        self.shared.stop.store(false, Ordering::Relaxed);
        let preloader = Preloader {
            shared: Arc::clone(&self.shared),
            decoder: Arc::clone(&self.decoder),
            filter: ScanFilter::from_config(&self.config),
            events: self.events_tx.clone(),
            capacity: self.config.ready_capacity,
            idle_poll: self.config.idle_poll,
            root: root.to_path_buf(),
        };
        let handle = thread::Builder::new()
            .name("gallery-preload".into())
            .spawn(move || preloader.run())?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Serve the next item to display: forward through history when the
    /// cursor is back in it, otherwise a fresh item from the ready cache.
    ///
    /// # Errors
    /// [`Error::NoMediaAvailable`] when a fresh item is needed but none could
    /// be produced within the configured wait.
    pub fn next(&mut self) -> Result<MediaItem, Error> {
        match self.cursor {
            Cursor::Back(step) if step > 0 => {
                self.cursor = Cursor::Back(step - 1);
                Ok(self.serve(step - 1))
            }
            _ => self.advance_live(),
        }
    }

    /// Step toward older history, clamped at the oldest retained entry;
    /// repeated calls at the boundary keep returning that entry without
    /// moving the cursor. `None` only when nothing was ever shown.
    pub fn previous(&mut self) -> Option<MediaItem> {
        if self.history.is_empty() {
            debug!("previous with empty history; nothing to show");
            return None;
        }
        let oldest = self.history.len() - 1;
        let step = match self.cursor {
            Cursor::Live => 0,
            Cursor::Back(step) => (step + 1).min(oldest),
        };
        self.cursor = Cursor::Back(step);
        Some(self.serve(step))
    }

    /// Whether `next()` would move within history rather than fetch fresh.
    pub fn has_next(&self) -> bool {
        matches!(self.cursor, Cursor::Back(_))
    }

    /// Whether there is older history to step back into.
    pub fn has_previous(&self) -> bool {
        match self.cursor {
            Cursor::Live => !self.history.is_empty(),
            Cursor::Back(step) => step + 1 < self.history.len(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.shared.lock();
        CacheStats {
            discovered: state.discovered.len(),
            ready: state.ready.len(),
            history: self.history.len(),
            scan_complete: state.scan_complete,
        }
    }

    /// Signal the worker to stop and wait for it to exit. Idempotent; after
    /// this returns the pools are no longer mutated in the background.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("preload worker panicked");
            }
        }
    }

    /// Return the history entry `step` back from the newest, from the decoded
    /// ring when it is still there, otherwise decoded again from disk.
    fn serve(&self, step: usize) -> MediaItem {
        let idx = self.history.len() - 1 - step.min(self.history.len() - 1);
        let location = self.history[idx].clone();
        if let Some(item) = self.ring.iter().rev().find(|i| *i.location() == location) {
            return item.clone();
        }
        let kind = self
            .shared
            .lock()
            .discovered
            .get(&location)
            .copied()
            .unwrap_or(MediaKind::Unknown);
        let mut item = MediaItem::new(location.clone(), kind);
        if let Err(err) = item.load(self.decoder.as_ref()) {
            // History entries were decodable once; record the failure on the
            // item and keep navigation responsive.
            warn!(%location, error = %err, "failed to re-decode history entry");
        }
        item
    }

    /// Move one ready item into history and the decoded ring, polling while
    /// the worker catches up, up to the configured wait.
    fn advance_live(&mut self) -> Result<MediaItem, Error> {
        let deadline = Instant::now() + self.config.advance_wait;
        let item = loop {
            {
                let mut state = self.shared.lock();
                // Prefer something never shown, then anything but the newest
                // entry, so a re-surfaced item is not served twice in a row.
                let avoid = self.history.back();
                let pick = state
                    .ready
                    .keys()
                    .find(|loc| !self.history.contains(loc))
                    .or_else(|| state.ready.keys().find(|loc| Some(*loc) != avoid))
                    .or_else(|| state.ready.keys().next())
                    .cloned();
                if let Some(item) = pick.and_then(|loc| state.ready.remove(&loc)) {
                    break item;
                }
                if state.scan_complete && state.discovered.is_empty() {
                    // Every candidate has been disproved; waiting cannot help.
                    return Err(Error::NoMediaAvailable);
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::NoMediaAvailable);
            }
            thread::sleep(self.config.idle_poll);
        };
        self.history.push_back(item.location().clone());
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
        self.ring.push_back(item.clone());
        while self.ring.len() > self.config.ring_capacity {
            self.ring.pop_front();
        }
        self.cursor = Cursor::Live;
        Ok(item)
    }
}

impl Drop for MediaCache {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The background worker: one recursive scan feeding the discovery pool,
/// then a preload loop until stopped.
struct Preloader {
    shared: Arc<Shared>,
    decoder: Arc<dyn MediaDecoder>,
    filter: ScanFilter,
    events: Sender<CacheEvent>,
    capacity: usize,
    idle_poll: Duration,
    root: PathBuf,
}

impl Preloader {
    fn run(self) {
        let mut rng = rand::rng();
        let mut seen = 0usize;
        for entry in scan::walker(&self.root) {
            if self.shared.stop.load(Ordering::Relaxed) {
                return;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(kind) = self.filter.classify(entry.path()) else {
                continue;
            };
            let Some(location) = Location::from_path(entry.path()) else {
                continue;
            };
            self.shared.lock().discovered.insert(location, kind);
            seen += 1;
            if seen % SCAN_PRELOAD_INTERVAL == 0 {
                self.preload_step(&mut rng);
            }
        }
        let discovered = {
            let mut state = self.shared.lock();
            state.scan_complete = true;
            state.discovered.len()
        };
        info!(discovered, root = %self.root.display(), "media scan complete");
        self.emit(CacheEvent::ScanComplete { discovered });

        while !self.shared.stop.load(Ordering::Relaxed) {
            if !self.preload_step(&mut rng) {
                thread::sleep(self.idle_poll);
            }
        }
    }

    /// Decode one uniformly chosen candidate into the ready cache. Returns
    /// whether any work was attempted.
    fn preload_step<R: rand::Rng>(&self, rng: &mut R) -> bool {
        let candidate = {
            let state = self.shared.lock();
            if state.ready.len() >= self.capacity {
                return false;
            }
            state
                .discovered
                .iter()
                .filter(|(loc, _)| !state.ready.contains_key(*loc))
                .choose(rng)
                .map(|(loc, kind)| (loc.clone(), *kind))
        };
        let Some((location, kind)) = candidate else {
            return false;
        };
        // Decode outside the lock so navigation is never stalled behind IO.
        let mut item = MediaItem::new(location.clone(), kind);
        match item.load(self.decoder.as_ref()) {
            Ok(()) => {
                let mut state = self.shared.lock();
                if state.discovered.contains_key(&location) && state.ready.len() < self.capacity {
                    state.ready.insert(location.clone(), item);
                    drop(state);
                    debug!(%location, "preloaded");
                    self.emit(CacheEvent::Preloaded { location });
                }
            }
            Err(err) => {
                self.shared.lock().discovered.remove(&location);
                warn!(%location, error = %err, "removing undecodable media");
                self.emit(CacheEvent::DecodeFailed {
                    location,
                    reason: err.to_string(),
                });
            }
        }
        true
    }

    fn emit(&self, event: CacheEvent) {
        // Best effort: a consumer that ignores events must not stall the
        // worker.
        let _ = self.events.try_send(event);
    }
}
