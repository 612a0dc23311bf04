//! Reader configuration constants.

use std::time::Duration;

/// Supported image file extensions when filtering archive entries.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 7] =
    ["jpg", "jpeg", "png", "gif", "bmp", "webp", "avif"];

/// Upper bound of decoded pages kept by the page cache.
pub const DEFAULT_CACHE_MAX_SIZE: usize = 20;

/// Pages ahead preloaded when the network is unknown or "good".
pub const DEFAULT_PRELOAD_COUNT: usize = 3;

/// Extra pages on top of the preload window that survive distance eviction.
pub const PROTECTED_RANGE_MARGIN: usize = 2;

pub const MIN_ZOOM: f32 = 0.25;
pub const MAX_ZOOM: f32 = 4.0;

/// Preset stops used by zoom in / zoom out.
pub const ZOOM_LEVELS: [f32; 9] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

/// Zoom used by the double-tap toggle.
pub const DOUBLE_TAP_ZOOM: f32 = 2.0;

/// Virtualization buffer (pages each side of the current page).
pub const WEBTOON_BUFFER: usize = 10;
pub const CONTINUOUS_BUFFER: usize = 5;

/// Detection line for the scroll tracker, as a fraction of viewport height.
pub const DETECTION_LINE_RATIO: f64 = 0.4;

pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(150);

/// How long scroll-driven detection is ignored after a programmatic jump.
pub const PROGRAMMATIC_SCROLL_GUARD: Duration = Duration::from_millis(500);

pub const PROGRESS_SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Minimum continuous view time before a page counts as read.
pub const MIN_DWELL: Duration = Duration::from_secs(3);

/// Interval between reading-session telemetry updates.
pub const SESSION_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum time between two wheel-driven page turns.
pub const WHEEL_PAGE_COOLDOWN: Duration = Duration::from_millis(300);

/// Wheel delta (px) needed before a page turn in paged modes.
pub const WHEEL_PAGE_THRESHOLD: f64 = 40.0;

/// Minimum travel (px) for a release to count as a swipe.
pub const SWIPE_MIN_DISTANCE: f64 = 50.0;

/// Minimum swipe velocity in px per millisecond.
pub const SWIPE_MIN_VELOCITY: f64 = 0.3;

/// A touch that moved this far (px) or more is not a tap.
pub const TAP_MAX_MOVEMENT: f64 = 20.0;

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(300);
pub const DOUBLE_TAP_MAX_DISTANCE: f64 = 30.0;

pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(500);

/// Movement (px) allowed before a held finger stops being a long press.
pub const LONG_PRESS_TOLERANCE: f64 = 10.0;

/// Movement (px) before a drag on a zoomed page starts panning.
pub const PAN_THRESHOLD: f64 = 5.0;
