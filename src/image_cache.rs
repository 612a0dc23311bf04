//! Page image cache for fast navigation.
//!
//! Keeps one entry per page index with an LRU order, bounded both by a
//! maximum size and by distance from the current page. Loads are started
//! through a [`Spawner`] and their results are applied only when the owner
//! pumps completions, so the cache is never mutated off its owning thread.
//!
//! A `Loading` entry is never evicted: dropping it would orphan the fetch in
//! flight and let the next preload request the same page again.

use crate::error::ImageLoadError;
use crate::executor::Spawner;
use crate::image_loader::{DecodedImage, ImageLoader};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, warn};
use lru::LruCache;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Loaded,
    Error,
}

/// Cached state of a single page.
#[derive(Debug, Clone)]
pub struct CachedImageEntry {
    pub url: String,
    pub status: LoadStatus,
    pub image: Option<Arc<DecodedImage>>,
    pub error: Option<String>,
    /// Milliseconds since the cache was created; refreshed on read and on load completion.
    pub timestamp_ms: u64,
    pub page_index: usize,
}

type LoadCallback = Box<dyn FnMut(usize, LoadStatus)>;

struct LoadCompletion {
    index: usize,
    generation: u64,
    result: Result<Arc<DecodedImage>, ImageLoadError>,
}

pub struct PageImageCache {
    urls: Vec<String>,
    entries: LruCache<usize, CachedImageEntry>,
    in_flight: HashMap<usize, Instant>,
    max_size: usize,
    loader: Arc<dyn ImageLoader>,
    spawner: Arc<dyn Spawner>,
    completions_tx: Sender<LoadCompletion>,
    completions_rx: Receiver<LoadCompletion>,
    /// Bumped by `clear`; completions from an older generation are dropped.
    generation: u64,
    callbacks: Vec<LoadCallback>,
    origin: Instant,
}

impl PageImageCache {
    /// Creates an empty cache for the given page URLs.
    pub fn new(
        urls: Vec<String>,
        max_size: usize,
        loader: Arc<dyn ImageLoader>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        let (completions_tx, completions_rx) = unbounded();
        Self {
            urls,
            entries: LruCache::unbounded(),
            in_flight: HashMap::new(),
            max_size,
            loader,
            spawner,
            completions_tx,
            completions_rx,
            generation: 0,
            callbacks: Vec::new(),
            origin: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Registers a callback invoked whenever a load finishes (loaded or error).
    pub fn on_load<F>(&mut self, callback: F)
    where
        F: FnMut(usize, LoadStatus) + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Starts loads for every index that is not already loaded or in flight.
    ///
    /// Entries are marked `Loading` before the job is handed to the spawner, so
    /// a second call for the same index never issues a second fetch. Pages that
    /// previously failed are retried. Returns the number of loads started.
    pub fn preload(&mut self, indices: &[usize]) -> usize {
        let mut started = 0;

        for &index in indices {
            let Some(url) = self.urls.get(index).cloned() else {
                debug!("Preload skipped: page {} out of range", index);
                continue;
            };

            if self.in_flight.contains_key(&index) {
                continue;
            }
            if let Some(entry) = self.entries.peek(&index) {
                if entry.status != LoadStatus::Error {
                    continue;
                }
            }

            let timestamp_ms = self.now_ms();
            self.entries.put(
                index,
                CachedImageEntry {
                    url: url.clone(),
                    status: LoadStatus::Loading,
                    image: None,
                    error: None,
                    timestamp_ms,
                    page_index: index,
                },
            );
            self.in_flight.insert(index, Instant::now());

            let loader = Arc::clone(&self.loader);
            let tx = self.completions_tx.clone();
            let generation = self.generation;
            self.spawner.spawn(Box::new(move || {
                let result = loader.load(&url).map(Arc::new);
                let _ = tx.send(LoadCompletion {
                    index,
                    generation,
                    result,
                });
            }));
            started += 1;
        }

        if started > 0 {
            debug!("Cache PRELOAD: started {} load(s)", started);
        }
        self.enforce_capacity();
        started
    }

    /// Applies every finished load without blocking. Returns how many were applied.
    pub fn process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply_completion(completion) {
                applied += 1;
            }
        }
        if applied > 0 {
            self.enforce_capacity();
        }
        applied
    }

    /// Blocks until no load is in flight or `timeout` elapses.
    pub fn wait_for_pending(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = self.process_completions();

        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completions_rx.recv_timeout(remaining) {
                Ok(completion) => {
                    if self.apply_completion(completion) {
                        applied += 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.enforce_capacity();
        applied
    }

    fn apply_completion(&mut self, completion: LoadCompletion) -> bool {
        if completion.generation != self.generation {
            debug!("Cache DISCARD: stale load for page {}", completion.index);
            return false;
        }

        let started = self.in_flight.remove(&completion.index);
        let now = self.now_ms();
        let Some(entry) = self.entries.get_mut(&completion.index) else {
            return false;
        };

        let status = match completion.result {
            Ok(image) => {
                entry.image = Some(image);
                entry.error = None;
                LoadStatus::Loaded
            }
            Err(err) => {
                warn!("Page {} failed to load: {}", completion.index, err);
                entry.image = None;
                entry.error = Some(err.to_string());
                LoadStatus::Error
            }
        };
        entry.status = status;
        entry.timestamp_ms = now;

        if let Some(started) = started {
            debug!(
                "Cache LOAD: page {} -> {:?} in {:?}",
                completion.index,
                status,
                started.elapsed()
            );
        }

        for callback in &mut self.callbacks {
            callback(completion.index, status);
        }
        true
    }

    /// Evicts least-recently-used non-loading entries down to `max_size`.
    fn enforce_capacity(&mut self) -> usize {
        if self.entries.len() <= self.max_size {
            return 0;
        }
        let excess = self.entries.len() - self.max_size;
        let victims: Vec<usize> = self
            .entries
            .iter()
            .rev()
            .filter(|(_, entry)| entry.status != LoadStatus::Loading)
            .map(|(index, _)| *index)
            .take(excess)
            .collect();

        for index in &victims {
            self.entries.pop(index);
        }
        if !victims.is_empty() {
            debug!("Cache EVICT (lru): {:?}", victims);
        }
        victims.len()
    }

    /// Removes every non-loading entry farther than `protected_range` from `current_page`.
    pub fn evict_distant(&mut self, current_page: usize, protected_range: usize) -> usize {
        let victims: Vec<usize> = self
            .entries
            .iter()
            .filter(|(index, entry)| {
                entry.status != LoadStatus::Loading
                    && index.abs_diff(current_page) > protected_range
            })
            .map(|(index, _)| *index)
            .collect();

        for index in &victims {
            self.entries.pop(index);
        }
        if !victims.is_empty() {
            debug!(
                "Cache EVICT (distance {} from {}): {:?}",
                protected_range, current_page, victims
            );
        }
        victims.len()
    }

    /// Whether the page is loaded. Refreshes the entry's LRU position.
    pub fn is_loaded(&mut self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn is_loading(&self, index: usize) -> bool {
        self.status(index) == Some(LoadStatus::Loading)
    }

    pub fn has_error(&self, index: usize) -> bool {
        self.status(index) == Some(LoadStatus::Error)
    }

    pub fn status(&self, index: usize) -> Option<LoadStatus> {
        self.entries.peek(&index).map(|entry| entry.status)
    }

    /// Returns the decoded page and refreshes its LRU position.
    pub fn get(&mut self, index: usize) -> Option<Arc<DecodedImage>> {
        let now = self.now_ms();
        let entry = self.entries.get_mut(&index)?;
        if entry.status != LoadStatus::Loaded {
            return None;
        }
        entry.timestamp_ms = now;
        entry.image.clone()
    }

    /// Looks at an entry without touching its LRU position.
    pub fn peek(&self, index: usize) -> Option<&CachedImageEntry> {
        self.entries.peek(&index)
    }

    /// Empties the cache. Loads still running are discarded when they finish.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
        self.generation += 1;
        debug!("Cache CLEAR (generation {})", self.generation);
    }

    /// Points the cache at a new page list, dropping everything cached so far.
    pub fn reset_pages(&mut self, urls: Vec<String>) {
        self.clear();
        self.urls = urls;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the size bound, evicting least-recently-used entries if it shrank.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.enforce_capacity();
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Indices currently cached, most recently used first.
    pub fn cached_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|(index, _)| *index).collect()
    }
}
