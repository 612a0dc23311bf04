//! Infers the visually current page from scroll position.
//!
//! Sampling is coalesced to one pass per animation frame: every scroll event
//! asks for a frame and a newer request supersedes an unserved one. A page is
//! detected where its element crosses a line 40% down the viewport and is
//! committed only after scrolling has been still for the debounce interval.
//!
//! Programmatic jumps move the scroll position too. While a jump is settling
//! the tracker ignores what it sees, so a jump never feeds back into another
//! page change. Only the caller that started a jump holds its [`ScrollToken`]
//! and can end the guard early.

use crate::config::{DETECTION_LINE_RATIO, PROGRAMMATIC_SCROLL_GUARD, SCROLL_DEBOUNCE};
use log::debug;
use std::time::{Duration, Instant};

/// Vertical extent of one page element in scroll-content coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub index: usize,
    pub top: f64,
    pub height: f64,
}

impl PageRect {
    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollMetrics<'a> {
    pub scroll_top: f64,
    pub viewport_height: f64,
    /// Page elements sorted by `top`.
    pub pages: &'a [PageRect],
}

/// Handle for a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest(u64);

/// Proof of ownership of a programmatic scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollToken(u64);

#[derive(Debug, Clone, Copy)]
struct ProgrammaticScroll {
    token: ScrollToken,
    target: usize,
    until: Instant,
}

/// Page under the detection line, or the nearest page when the line falls
/// outside every element.
pub fn detect_page(metrics: &ScrollMetrics<'_>, line_ratio: f64) -> Option<usize> {
    let line = metrics.scroll_top + metrics.viewport_height * line_ratio;

    if let Some(rect) = metrics
        .pages
        .iter()
        .find(|rect| rect.top <= line && line < rect.bottom())
    {
        return Some(rect.index);
    }

    metrics
        .pages
        .iter()
        .min_by(|a, b| {
            distance_to(a, line)
                .partial_cmp(&distance_to(b, line))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|rect| rect.index)
}

fn distance_to(rect: &PageRect, line: f64) -> f64 {
    if line < rect.top {
        rect.top - line
    } else {
        line - rect.bottom()
    }
}

#[derive(Debug)]
pub struct ScrollPageTracker {
    committed_page: usize,
    pending_frame: Option<FrameRequest>,
    next_id: u64,
    guard: Option<ProgrammaticScroll>,
    candidate: Option<usize>,
    last_scroll_at: Option<Instant>,
    debounce: Duration,
    guard_duration: Duration,
    line_ratio: f64,
}

impl ScrollPageTracker {
    pub fn new(current_page: usize) -> Self {
        Self {
            committed_page: current_page,
            pending_frame: None,
            next_id: 0,
            guard: None,
            candidate: None,
            last_scroll_at: None,
            debounce: SCROLL_DEBOUNCE,
            guard_duration: PROGRAMMATIC_SCROLL_GUARD,
            line_ratio: DETECTION_LINE_RATIO,
        }
    }

    pub fn with_timings(mut self, debounce: Duration, guard_duration: Duration) -> Self {
        self.debounce = debounce;
        self.guard_duration = guard_duration;
        self
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn committed_page(&self) -> usize {
        self.committed_page
    }

    /// Records a scroll event and requests a sampling frame, replacing any
    /// request not yet served.
    pub fn on_scroll(&mut self, now: Instant) -> FrameRequest {
        self.last_scroll_at = Some(now);
        let frame = FrameRequest(self.next_id());
        self.pending_frame = Some(frame);
        frame
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Samples the scroll position. Returns `false` for a superseded frame.
    pub fn on_animation_frame(
        &mut self,
        frame: FrameRequest,
        metrics: &ScrollMetrics<'_>,
        now: Instant,
    ) -> bool {
        if self.pending_frame != Some(frame) {
            return false;
        }
        self.pending_frame = None;

        if self.is_guarded(now) {
            return true;
        }

        match detect_page(metrics, self.line_ratio) {
            Some(page) if page != self.committed_page => self.candidate = Some(page),
            Some(_) => self.candidate = None,
            None => {}
        }
        true
    }

    /// Commits the detected page once scrolling has settled.
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        if let Some(guard) = self.guard {
            if now >= guard.until {
                debug!("Programmatic scroll to page {} settled", guard.target);
                self.guard = None;
            }
        }

        let candidate = self.candidate?;
        let last_scroll = self.last_scroll_at?;
        if now.saturating_duration_since(last_scroll) < self.debounce {
            return None;
        }

        self.candidate = None;
        self.committed_page = candidate;
        Some(candidate)
    }

    /// Marks the start of a jump to `target`; detection pauses until the guard
    /// expires or the token holder ends it.
    pub fn begin_programmatic_scroll(&mut self, target: usize, now: Instant) -> ScrollToken {
        let token = ScrollToken(self.next_id());
        self.guard = Some(ProgrammaticScroll {
            token,
            target,
            until: now + self.guard_duration,
        });
        self.committed_page = target;
        self.candidate = None;
        self.pending_frame = None;
        token
    }

    /// Ends the guard early. Only the token of the active jump is accepted.
    pub fn end_programmatic_scroll(&mut self, token: ScrollToken) -> bool {
        match self.guard {
            Some(guard) if guard.token == token => {
                self.guard = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_guarded(&self, now: Instant) -> bool {
        self.guard.map(|guard| now < guard.until).unwrap_or(false)
    }

    /// Aligns the tracker with a page change that did not come from scrolling.
    pub fn set_committed_page(&mut self, page: usize) {
        self.committed_page = page;
        self.candidate = None;
    }

    /// Drops every pending frame, candidate and guard.
    pub fn cancel(&mut self) {
        self.pending_frame = None;
        self.candidate = None;
        self.guard = None;
        self.last_scroll_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(count: usize, height: f64) -> Vec<PageRect> {
        (0..count)
            .map(|index| PageRect {
                index,
                top: index as f64 * height,
                height,
            })
            .collect()
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn detection_line_sits_forty_percent_down() {
        let pages = layout(10, 1000.0);
        let metrics = ScrollMetrics {
            scroll_top: 2500.0,
            viewport_height: 800.0,
            pages: &pages,
        };
        assert_eq!(detect_page(&metrics, DETECTION_LINE_RATIO), Some(2));

        let past_end = ScrollMetrics {
            scroll_top: 20_000.0,
            ..metrics
        };
        assert_eq!(detect_page(&past_end, DETECTION_LINE_RATIO), Some(9));
    }

    #[test]
    fn commit_waits_for_scroll_to_settle() {
        let t0 = Instant::now();
        let pages = layout(10, 1000.0);
        let metrics = ScrollMetrics {
            scroll_top: 2500.0,
            viewport_height: 800.0,
            pages: &pages,
        };
        let mut tracker = ScrollPageTracker::new(0);

        let frame = tracker.on_scroll(t0);
        assert!(tracker.on_animation_frame(frame, &metrics, t0 + ms(16)));
        assert_eq!(tracker.poll(t0 + ms(100)), None);

        let frame = tracker.on_scroll(t0 + ms(120));
        tracker.on_animation_frame(frame, &metrics, t0 + ms(130));
        assert_eq!(tracker.poll(t0 + ms(200)), None);
        assert_eq!(tracker.poll(t0 + ms(270)), Some(2));
        assert_eq!(tracker.poll(t0 + ms(400)), None);
        assert_eq!(tracker.committed_page(), 2);
    }

    #[test]
    fn newer_frame_request_supersedes_older() {
        let t0 = Instant::now();
        let pages = layout(3, 100.0);
        let metrics = ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 100.0,
            pages: &pages,
        };
        let mut tracker = ScrollPageTracker::new(0);

        let first = tracker.on_scroll(t0);
        let second = tracker.on_scroll(t0 + ms(5));
        assert!(!tracker.on_animation_frame(first, &metrics, t0 + ms(10)));
        assert!(tracker.on_animation_frame(second, &metrics, t0 + ms(10)));
        assert!(!tracker.has_pending_frame());
    }

    #[test]
    fn programmatic_jump_is_not_fed_back() {
        let t0 = Instant::now();
        let pages = layout(10, 1000.0);
        let mut tracker = ScrollPageTracker::new(0);

        tracker.begin_programmatic_scroll(7, t0);

        let passing = ScrollMetrics {
            scroll_top: 4800.0,
            viewport_height: 800.0,
            pages: &pages,
        };
        let frame = tracker.on_scroll(t0 + ms(20));
        tracker.on_animation_frame(frame, &passing, t0 + ms(30));
        assert_eq!(tracker.poll(t0 + ms(300)), None);

        let landed = ScrollMetrics {
            scroll_top: 6800.0,
            ..passing
        };
        let frame = tracker.on_scroll(t0 + ms(600));
        tracker.on_animation_frame(frame, &landed, t0 + ms(610));
        assert_eq!(tracker.poll(t0 + ms(800)), None);
        assert_eq!(tracker.committed_page(), 7);
    }

    #[test]
    fn only_the_owner_ends_the_guard() {
        let t0 = Instant::now();
        let mut tracker = ScrollPageTracker::new(0);
        let stale = tracker.begin_programmatic_scroll(3, t0);
        let current = tracker.begin_programmatic_scroll(4, t0);

        assert!(!tracker.end_programmatic_scroll(stale));
        assert!(tracker.is_guarded(t0 + ms(1)));
        assert!(tracker.end_programmatic_scroll(current));
        assert!(!tracker.is_guarded(t0 + ms(1)));
    }
}
