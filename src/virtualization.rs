//! Render window for continuous and webtoon modes.
//!
//! Every page keeps a slot in the scroll column, but only pages inside the
//! window around the current page may request image bytes; the rest render
//! as sized placeholders.

use crate::config::{CONTINUOUS_BUFFER, WEBTOON_BUFFER};
use crate::settings::ReadingMode;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    Image,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualizationWindow {
    start: usize,
    end: usize,
}

/// Pages kept live on each side of the current page, for scrolling modes.
///
/// Webtoon strips have no page boundary to hide a loading flash behind, so
/// they keep a larger buffer.
pub fn buffer_for(mode: ReadingMode) -> Option<usize> {
    match mode {
        ReadingMode::Webtoon => Some(WEBTOON_BUFFER),
        ReadingMode::Continuous => Some(CONTINUOUS_BUFFER),
        ReadingMode::Single | ReadingMode::Double | ReadingMode::DoubleManga => None,
    }
}

impl VirtualizationWindow {
    /// Window for `mode`, or `None` for paged modes and empty documents.
    pub fn compute(current_page: usize, total_pages: usize, mode: ReadingMode) -> Option<Self> {
        let buffer = buffer_for(mode)?;
        Self::with_buffer(current_page, total_pages, buffer)
    }

    pub fn with_buffer(current_page: usize, total_pages: usize, buffer: usize) -> Option<Self> {
        if total_pages == 0 {
            return None;
        }
        let current = current_page.min(total_pages - 1);
        Some(Self {
            start: current.saturating_sub(buffer),
            end: (current + buffer).min(total_pages - 1),
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn contains(&self, page: usize) -> bool {
        (self.start..=self.end).contains(&page)
    }

    pub fn indices(&self) -> RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Window pages ordered for fetching: `current_page` first, then outward,
    /// the page ahead before the page behind at each distance.
    pub fn indices_nearest(&self, current_page: usize) -> Vec<usize> {
        let current = current_page.clamp(self.start, self.end);
        let mut indices = Vec::with_capacity(self.len());
        indices.push(current);
        for offset in 1..self.len() {
            let ahead = current + offset;
            if ahead <= self.end {
                indices.push(ahead);
            }
            if let Some(behind) = current.checked_sub(offset).filter(|&i| i >= self.start) {
                indices.push(behind);
            }
        }
        indices
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn slot_for(&self, page: usize) -> PageSlot {
        if self.contains(page) {
            PageSlot::Image
        } else {
            PageSlot::Placeholder
        }
    }
}
