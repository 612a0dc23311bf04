//! Dwell-time tracking for reading sessions.
//!
//! A page counts as read only after it has been the visible page for a
//! minimum continuous time. Hiding the reader pauses the clock without
//! resetting it; changing page restarts it.

use crate::config::MIN_DWELL;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Final report for a reading session, sent when the reader closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Option<String>,
    pub file_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub active_seconds: u64,
    pub start_page: usize,
    pub end_page: usize,
    pub pages_read: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct ActivePage {
    page: usize,
    accumulated: Duration,
    visible_since: Option<Instant>,
}

impl ActivePage {
    fn dwell(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .visible_since
                .map(|since| now.saturating_duration_since(since))
                .unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct ReadingSessionTracker {
    file_id: String,
    session_id: Option<String>,
    min_dwell: Duration,
    started_at: DateTime<Utc>,
    start_page: usize,
    current: ActivePage,
    confirmed: BTreeSet<usize>,
    active_time: Duration,
    ended: bool,
}

impl ReadingSessionTracker {
    pub fn new(file_id: impl Into<String>, start_page: usize, now: Instant) -> Self {
        Self {
            file_id: file_id.into(),
            session_id: None,
            min_dwell: MIN_DWELL,
            started_at: Utc::now(),
            start_page,
            current: ActivePage {
                page: start_page,
                accumulated: Duration::ZERO,
                visible_since: Some(now),
            },
            confirmed: BTreeSet::new(),
            active_time: Duration::ZERO,
            ended: false,
        }
    }

    pub fn with_min_dwell(mut self, min_dwell: Duration) -> Self {
        self.min_dwell = min_dwell;
        self
    }

    pub fn set_session_id(&mut self, session_id: String) {
        self.session_id = Some(session_id);
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn current_page(&self) -> usize {
        self.current.page
    }

    /// Confirms the current page if it has been on screen long enough.
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        if self.ended || self.confirmed.contains(&self.current.page) {
            return None;
        }
        if self.current.dwell(now) < self.min_dwell {
            return None;
        }
        self.confirmed.insert(self.current.page);
        debug!("Page {} of {} confirmed as read", self.current.page, self.file_id);
        Some(self.current.page)
    }

    /// When the current page will be confirmed if nothing changes.
    pub fn confirmation_deadline(&self, now: Instant) -> Option<Instant> {
        if self.ended || self.confirmed.contains(&self.current.page) {
            return None;
        }
        self.current.visible_since?;
        Some(now + self.min_dwell.saturating_sub(self.current.dwell(now)))
    }

    /// Restarts the dwell clock for `page`. The previous page is confirmed first
    /// if it already qualified.
    pub fn page_changed(&mut self, page: usize, now: Instant) -> Option<usize> {
        if self.ended || page == self.current.page {
            return None;
        }
        let confirmed = self.tick(now);
        let visible = self.current.visible_since.is_some();
        self.pause(now);
        self.current = ActivePage {
            page,
            accumulated: Duration::ZERO,
            visible_since: visible.then_some(now),
        };
        confirmed
    }

    /// Pauses or resumes the dwell clock when the reader is hidden or shown.
    pub fn set_visible(&mut self, visible: bool, now: Instant) -> Option<usize> {
        if self.ended {
            return None;
        }
        if visible {
            if self.current.visible_since.is_none() {
                self.current.visible_since = Some(now);
            }
            None
        } else {
            let confirmed = self.tick(now);
            self.pause(now);
            confirmed
        }
    }

    fn pause(&mut self, now: Instant) {
        if let Some(since) = self.current.visible_since.take() {
            let elapsed = now.saturating_duration_since(since);
            self.current.accumulated += elapsed;
            self.active_time += elapsed;
        }
    }

    pub fn confirmed_pages_read(&self) -> &BTreeSet<usize> {
        &self.confirmed
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Closes the session and returns its summary. Only the first call reports.
    pub fn end(&mut self, now: Instant) -> Option<SessionSummary> {
        if self.ended {
            return None;
        }
        self.tick(now);
        self.pause(now);
        self.ended = true;

        Some(SessionSummary {
            session_id: self.session_id.clone(),
            file_id: self.file_id.clone(),
            started_at: self.started_at,
            ended_at: Utc::now(),
            active_seconds: self.active_time.as_secs(),
            start_page: self.start_page,
            end_page: self.current.page,
            pages_read: self.confirmed.iter().copied().collect(),
        })
    }
}
