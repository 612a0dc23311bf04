//! The reader controller.
//!
//! [`ReaderSession`] owns one open file: the navigation state, the page image
//! cache and every timer around them. Hosts feed it input events and a clock,
//! and get back [`HostCommand`]s for the things only they can do (scrolling
//! the viewport, opening another file, showing menus).
//!
//! Everything runs on the owner's thread. Image loads and persistence calls
//! go through the injected spawner and their results are applied on `tick`.

use crate::config::{DEFAULT_CACHE_MAX_SIZE, PROGRESS_SAVE_DEBOUNCE, SESSION_UPDATE_INTERVAL};
use crate::error::Result;
use crate::executor::Spawner;
use crate::gesture::{Gesture, GestureAction, GestureConfig, GestureRouter, TouchEvent, route};
use crate::image_cache::{LoadStatus, PageImageCache};
use crate::image_loader::{DecodedImage, ImageLoader};
use crate::input::{Key, WheelInput, WheelNavigator, key_to_operation};
use crate::preload::{
    FixedNetworkSampler, NetworkSampler, NetworkStatus, PreloadConfig, PreloadPolicy,
};
use crate::reading_session::ReadingSessionTracker;
use crate::scroll_tracker::{FrameRequest, ScrollMetrics, ScrollPageTracker, ScrollToken};
use crate::services::backend::{BeaconSender, ReaderBackend, SessionUpdate};
use crate::services::persistence::Persistence;
use crate::services::session_loader::{SessionData, SessionGate, load_session};
use crate::state::{AdjacentFile, Effect, Operation, PageDimensions, ReaderState};
use crate::timing::Debouncer;
use crate::settings::ReadingMode;
use crate::virtualization::{VirtualizationWindow, buffer_for};
use crossbeam_channel::{Receiver, TryRecvError};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Work only the host can perform.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Scroll the viewport to `page`, then hand `token` back through
    /// [`ReaderSession::end_programmatic_scroll`].
    ScrollToPage { page: usize, token: ScrollToken },
    OpenFile(AdjacentFile),
    ToggleControls,
    ContextMenu { x: f64, y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The reader is closed in-app; telemetry goes through the backend.
    Navigate,
    /// The host is going away; telemetry goes through the beacon if present.
    Unload,
}

/// Collaborators injected into a session.
pub struct ReaderDeps {
    pub backend: Arc<dyn ReaderBackend>,
    pub loader: Arc<dyn ImageLoader>,
    pub spawner: Arc<dyn Spawner>,
    pub network: Box<dyn NetworkSampler>,
    pub beacon: Option<Arc<dyn BeaconSender>>,
    pub cache_max_size: usize,
    pub gestures: GestureConfig,
}

impl ReaderDeps {
    pub fn new(
        backend: Arc<dyn ReaderBackend>,
        loader: Arc<dyn ImageLoader>,
        spawner: Arc<dyn Spawner>,
    ) -> Self {
        Self {
            backend,
            loader,
            spawner,
            network: Box::new(FixedNetworkSampler(NetworkStatus::Unavailable)),
            beacon: None,
            cache_max_size: DEFAULT_CACHE_MAX_SIZE,
            gestures: GestureConfig::default(),
        }
    }

    pub fn with_network(mut self, network: Box<dyn NetworkSampler>) -> Self {
        self.network = network;
        self
    }

    pub fn with_beacon(mut self, beacon: Arc<dyn BeaconSender>) -> Self {
        self.beacon = Some(beacon);
        self
    }

    pub fn with_cache_max_size(mut self, cache_max_size: usize) -> Self {
        self.cache_max_size = cache_max_size;
        self
    }
}

pub struct ReaderSession {
    state: ReaderState,
    cache: PageImageCache,
    /// Pages whose load finished since the last tick.
    loaded: Rc<RefCell<Vec<usize>>>,
    backend: Arc<dyn ReaderBackend>,
    spawner: Arc<dyn Spawner>,
    network: Box<dyn NetworkSampler>,
    beacon: Option<Arc<dyn BeaconSender>>,
    policy: PreloadPolicy,
    preload_config: PreloadConfig,
    preload_timer: Debouncer<usize>,
    progress_timer: Debouncer<(usize, usize)>,
    scroll: ScrollPageTracker,
    gesture_config: GestureConfig,
    gestures: GestureRouter,
    wheel: WheelNavigator,
    viewport_width: f64,
    dwell: ReadingSessionTracker,
    persistence: Persistence,
    /// Cache size requested by the host; scrolling modes may raise it.
    cache_max_size: usize,
    session_id_rx: Option<Receiver<String>>,
    last_session_update: Instant,
    closed: bool,
}

impl ReaderSession {
    /// Fetches `file_id` and opens it. Fails if the load was superseded by a
    /// newer token from `gate` or the file has no pages.
    pub fn load(deps: ReaderDeps, gate: &SessionGate, file_id: &str, now: Instant) -> Result<Self> {
        let token = gate.issue();
        let data = load_session(deps.backend.as_ref(), file_id, &token)?;
        Ok(Self::open(data, deps, now))
    }

    pub fn open(data: SessionData, deps: ReaderDeps, now: Instant) -> Self {
        let state = data.into_state();
        let current = state.current_page();
        let file_id = state.file_id().to_string();

        let mut cache = PageImageCache::new(
            page_urls(&state),
            cache_capacity(deps.cache_max_size, state.mode()),
            deps.loader,
            Arc::clone(&deps.spawner),
        );
        let loaded = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&loaded);
        cache.on_load(move |index, status| {
            if status == LoadStatus::Loaded {
                sink.borrow_mut().push(index);
            }
        });

        let policy = PreloadPolicy::new(state.preload_count());
        let preload_config = policy.config_for(&deps.network.sample());
        let persistence = Persistence::new(
            Arc::clone(&deps.backend),
            Arc::clone(&deps.spawner),
            file_id.clone(),
        );
        let session_id_rx = persistence.start_session(current);

        let mut session = Self {
            cache,
            loaded,
            backend: deps.backend,
            spawner: deps.spawner,
            network: deps.network,
            beacon: deps.beacon,
            policy,
            preload_config,
            preload_timer: Debouncer::new(Duration::from_millis(preload_config.delay_ms)),
            progress_timer: Debouncer::new(PROGRESS_SAVE_DEBOUNCE),
            scroll: ScrollPageTracker::new(current),
            gesture_config: deps.gestures,
            gestures: GestureRouter::new(deps.gestures),
            wheel: WheelNavigator::new(),
            viewport_width: 0.0,
            dwell: ReadingSessionTracker::new(file_id.as_str(), current, now),
            persistence,
            cache_max_size: deps.cache_max_size,
            session_id_rx: Some(session_id_rx),
            last_session_update: now,
            closed: false,
            state,
        };

        info!(
            "Opened {} at page {} of {} ({:?} preload)",
            file_id,
            current,
            session.state.total_pages(),
            session.preload_config.quality
        );
        session.load_displayed();
        session.schedule_preload(now);
        session
    }

    /// Replaces the open file. The current session is closed first; the cache
    /// is emptied and every pending timer is cancelled.
    pub fn switch_file(&mut self, data: SessionData, now: Instant) {
        self.close(now, CloseReason::Navigate);

        self.state = data.into_state();
        let current = self.state.current_page();
        let file_id = self.state.file_id().to_string();

        self.cache.reset_pages(page_urls(&self.state));
        self.cache.set_max_size(cache_capacity(self.cache_max_size, self.state.mode()));
        self.loaded.borrow_mut().clear();
        self.gestures = GestureRouter::new(self.gesture_config);
        self.wheel = WheelNavigator::new();
        self.scroll = ScrollPageTracker::new(current);
        self.dwell = ReadingSessionTracker::new(file_id.as_str(), current, now);
        self.persistence = Persistence::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.spawner),
            file_id.clone(),
        );
        self.session_id_rx = Some(self.persistence.start_session(current));
        self.last_session_update = now;
        self.policy = PreloadPolicy::new(self.state.preload_count());
        self.refresh_preload_config();
        self.closed = false;

        info!("Switched to {} at page {}", file_id, current);
        self.load_displayed();
        self.schedule_preload(now);
    }

    pub fn state(&self) -> &ReaderState {
        &self.state
    }

    pub fn cache(&self) -> &PageImageCache {
        &self.cache
    }

    pub fn preload_config(&self) -> PreloadConfig {
        self.preload_config
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
    }

    /// Rendering window in scrolling modes; `None` in paged modes.
    pub fn virtualization_window(&self) -> Option<VirtualizationWindow> {
        VirtualizationWindow::compute(
            self.state.current_page(),
            self.state.total_pages(),
            self.state.mode(),
        )
    }

    pub fn page_image(&mut self, page: usize) -> Option<Arc<DecodedImage>> {
        self.cache.get(page)
    }

    pub fn page_status(&self, page: usize) -> Option<LoadStatus> {
        self.cache.status(page)
    }

    /// Applies an operation and carries out its effects.
    pub fn dispatch(&mut self, op: Operation, now: Instant) -> Vec<HostCommand> {
        if self.closed {
            return Vec::new();
        }
        let effects = self.state.apply(op);
        self.gestures.set_zoom(self.state.zoom());

        let mut commands = Vec::new();
        for effect in effects {
            self.run_effect(effect, now, &mut commands);
        }
        commands
    }

    fn run_effect(&mut self, effect: Effect, now: Instant, commands: &mut Vec<HostCommand>) {
        match effect {
            Effect::PageChanged { page, total_pages } => {
                self.progress_timer.schedule((page, total_pages), now);
                self.dwell.page_changed(page, now);
                self.scroll.set_committed_page(page);
                let evicted = self.cache.evict_distant(page, self.protected_range());
                if evicted > 0 {
                    debug!("Evicted {} distant pages around {}", evicted, page);
                }
                self.load_displayed();
                self.schedule_preload(now);
            }
            Effect::ScrollToPage(page) => {
                let token = self.scroll.begin_programmatic_scroll(page, now);
                commands.push(HostCommand::ScrollToPage { page, token });
            }
            Effect::MarkCompleted => self.persistence.mark_completed(),
            Effect::AddBookmark(page) => self.persistence.add_bookmark(page),
            Effect::RemoveBookmark(page) => self.persistence.remove_bookmark(page),
            Effect::SettingsChanged => {
                self.cache.set_max_size(cache_capacity(self.cache_max_size, self.state.mode()));
                self.policy = PreloadPolicy::new(self.state.preload_count());
                self.refresh_preload_config();
                self.load_displayed();
                self.schedule_preload(now);
            }
            Effect::PersistSettings(settings) => self.persistence.update_settings(settings),
            Effect::OpenFile(file) => commands.push(HostCommand::OpenFile(file)),
        }
    }

    fn refresh_preload_config(&mut self) {
        let config = self.policy.config_for(&self.network.sample());
        if config != self.preload_config {
            info!(
                "Preload config changed: {:?} ahead {} behind {}",
                config.quality, config.ahead_count, config.behind_count
            );
        }
        self.preload_config = config;
        self.preload_timer
            .set_delay(Duration::from_millis(config.delay_ms));
    }

    /// Pages on screen load right away; look-ahead waits for the preload delay.
    /// In scrolling modes every page of the render window counts as on screen.
    fn load_displayed(&mut self) {
        let pages = match self.virtualization_window() {
            Some(window) => window.indices_nearest(self.state.current_page()),
            None => self.state.displayed_pages(),
        };
        self.cache.preload(&pages);
    }

    /// Distance from the current page within which cached pages are kept.
    fn protected_range(&self) -> usize {
        let range = self.preload_config.protected_range();
        buffer_for(self.state.mode()).map_or(range, |buffer| range.max(buffer))
    }

    fn schedule_preload(&mut self, now: Instant) {
        self.preload_timer.schedule(self.state.current_page(), now);
        if self.preload_timer.delay().is_zero() {
            if let Some(page) = self.preload_timer.poll(now) {
                self.run_preload(page);
            }
        }
    }

    fn run_preload(&mut self, page: usize) {
        let total = self.state.total_pages();
        let mut indices = self.preload_config.indices_around(page, total);
        if let Some(window) = VirtualizationWindow::compute(page, total, self.state.mode()) {
            indices.retain(|&index| window.contains(index));
        }
        let started = self.cache.preload(&indices);
        debug!("Preloading around page {}: {} loads started", page, started);
    }

    /// Re-samples the network and re-plans preloading.
    pub fn on_network_change(&mut self, now: Instant) {
        if self.closed {
            return;
        }
        self.refresh_preload_config();
        self.schedule_preload(now);
    }

    /// Pauses dwell tracking while hidden and saves pending progress.
    pub fn set_visible(&mut self, visible: bool, now: Instant) {
        if self.closed {
            return;
        }
        self.dwell.set_visible(visible, now);
        if !visible {
            self.flush_progress();
        }
    }

    fn flush_progress(&mut self) {
        if let Some((page, total)) = self.progress_timer.flush() {
            self.persistence.save_progress(page, total);
        }
    }

    pub fn on_scroll(&mut self, now: Instant) -> FrameRequest {
        self.scroll.on_scroll(now)
    }

    pub fn on_animation_frame(
        &mut self,
        frame: FrameRequest,
        metrics: &ScrollMetrics<'_>,
        now: Instant,
    ) -> bool {
        self.scroll.on_animation_frame(frame, metrics, now)
    }

    pub fn end_programmatic_scroll(&mut self, token: ScrollToken) -> bool {
        self.scroll.end_programmatic_scroll(token)
    }

    pub fn handle_touch(&mut self, event: &TouchEvent) -> Vec<HostCommand> {
        let gestures = self.gestures.handle(event);
        let mut commands = Vec::new();
        for gesture in &gestures {
            commands.extend(self.route_gesture(gesture, event.time));
        }
        commands
    }

    fn route_gesture(&mut self, gesture: &Gesture, now: Instant) -> Vec<HostCommand> {
        match route(gesture, &self.state, self.viewport_width) {
            Some(GestureAction::Apply(op)) => self.dispatch(op, now),
            Some(GestureAction::ToggleControls) => vec![HostCommand::ToggleControls],
            Some(GestureAction::ContextMenu { x, y }) => vec![HostCommand::ContextMenu { x, y }],
            None => Vec::new(),
        }
    }

    pub fn handle_key(&mut self, key: Key, now: Instant) -> Vec<HostCommand> {
        match key_to_operation(key, &self.state) {
            Some(op) => self.dispatch(op, now),
            None => Vec::new(),
        }
    }

    pub fn handle_wheel(&mut self, input: WheelInput) -> Vec<HostCommand> {
        match self.wheel.handle(input, &self.state) {
            Some(op) => self.dispatch(op, input.time),
            None => Vec::new(),
        }
    }

    /// Advances every timer and applies finished background work.
    pub fn tick(&mut self, now: Instant) -> Vec<HostCommand> {
        if self.closed {
            return Vec::new();
        }
        let mut commands = Vec::new();

        self.cache.process_completions();
        let loaded: Vec<usize> = self.loaded.borrow_mut().drain(..).collect();
        for index in loaded {
            let image = self.cache.peek(index).and_then(|entry| entry.image.clone());
            if let Some(image) = image {
                let dimensions = PageDimensions {
                    width: image.width,
                    height: image.height,
                };
                let op = Operation::SetPageDimensions { index, dimensions };
                commands.extend(self.dispatch(op, now));
            }
        }

        if let Some(page) = self.preload_timer.poll(now) {
            self.run_preload(page);
        }
        if let Some((page, total)) = self.progress_timer.poll(now) {
            self.persistence.save_progress(page, total);
        }
        if let Some(page) = self.scroll.poll(now) {
            commands.extend(self.dispatch(Operation::SyncPageFromScroll(page), now));
        }
        for gesture in self.gestures.tick(now) {
            commands.extend(self.route_gesture(&gesture, now));
        }

        self.dwell.tick(now);
        self.receive_session_id();
        if now.saturating_duration_since(self.last_session_update) >= SESSION_UPDATE_INTERVAL {
            self.send_session_update(now);
        }

        commands
    }

    fn receive_session_id(&mut self) {
        let Some(rx) = self.session_id_rx.as_ref() else {
            return;
        };
        match rx.try_recv() {
            Ok(session_id) => {
                debug!("Reading session {} started", session_id);
                self.dwell.set_session_id(session_id);
                self.session_id_rx = None;
            }
            Err(TryRecvError::Disconnected) => self.session_id_rx = None,
            Err(TryRecvError::Empty) => {}
        }
    }

    fn send_session_update(&mut self, now: Instant) {
        self.last_session_update = now;
        if let Some(session_id) = self.dwell.session_id() {
            let update = SessionUpdate {
                current_page: self.state.current_page(),
                pages_read: self.dwell.confirmed_pages_read().iter().copied().collect(),
            };
            self.persistence.update_session(session_id.to_string(), update);
        }
    }

    /// Closes the reader: pending progress is saved once, every timer is
    /// cancelled and the session summary is reported. Safe to call twice.
    pub fn close(&mut self, now: Instant, reason: CloseReason) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.flush_progress();
        self.preload_timer.cancel();
        self.scroll.cancel();
        self.gestures.reset();
        self.cache.clear();

        self.receive_session_id();
        if let Some(summary) = self.dwell.end(now) {
            match (reason, self.beacon.as_ref()) {
                (CloseReason::Unload, Some(beacon)) => {
                    if !beacon.send_end_session(&summary) {
                        warn!("Beacon rejected session summary for {}", summary.file_id);
                    }
                }
                _ => self.persistence.end_session(summary),
            }
        }
        info!("Closed reader for {}", self.state.file_id());
    }
}

/// Scrolling modes keep their whole render window cached.
fn cache_capacity(requested: usize, mode: ReadingMode) -> usize {
    buffer_for(mode).map_or(requested, |buffer| requested.max(2 * buffer + 1))
}

fn page_urls(state: &ReaderState) -> Vec<String> {
    state.pages().iter().map(|page| page.url.clone()).collect()
}
