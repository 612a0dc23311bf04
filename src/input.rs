//! Keyboard and mouse-wheel input mapping.

use crate::config::{WHEEL_PAGE_COOLDOWN, WHEEL_PAGE_THRESHOLD};
use crate::settings::ReadingDirection;
use crate::state::{Operation, ReaderState};
use std::time::Instant;

/// Host-neutral key identifiers the reader reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Space,
    ShiftSpace,
    Home,
    End,
    Plus,
    Minus,
    Zero,
    Char(char),
}

/// Maps a key press to an operation, honouring the reading direction.
///
/// Left/right follow the page flow, so in right-to-left reading the left
/// arrow moves forward. Arrow up/down only turn pages in vertical reading.
pub fn key_to_operation(key: Key, state: &ReaderState) -> Option<Operation> {
    let rtl = state.direction() == ReadingDirection::Rtl;
    let vertical = state.direction() == ReadingDirection::Vertical;

    let op = match key {
        Key::ArrowRight if rtl => Operation::PrevPage,
        Key::ArrowRight => Operation::NextPage,
        Key::ArrowLeft if rtl => Operation::NextPage,
        Key::ArrowLeft => Operation::PrevPage,
        Key::ArrowDown if vertical => Operation::NextPage,
        Key::ArrowUp if vertical => Operation::PrevPage,
        Key::PageDown | Key::Space => Operation::NextPage,
        Key::PageUp | Key::ShiftSpace => Operation::PrevPage,
        Key::Home => Operation::FirstPage,
        Key::End => Operation::LastPage,
        Key::Plus | Key::Char('=') => Operation::ZoomIn,
        Key::Minus => Operation::ZoomOut,
        Key::Zero => Operation::ResetZoom,
        Key::Char('b') => Operation::ToggleBookmark,
        Key::Char('r') => Operation::RotateClockwise,
        Key::Char('R') => Operation::RotateCounterClockwise,
        Key::Char(']') => Operation::NextChapter,
        Key::Char('[') => Operation::PrevChapter,
        _ => return None,
    };
    Some(op)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub delta_y: f64,
    /// Ctrl/Cmd held: the wheel zooms instead of paging.
    pub zoom_modifier: bool,
    pub time: Instant,
}

/// Turns wheel input into page turns in paged modes.
///
/// One flick of a trackpad fires dozens of wheel events; a cooldown keeps it
/// from skipping several pages.
#[derive(Debug, Default)]
pub struct WheelNavigator {
    last_turn: Option<Instant>,
}

impl WheelNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, input: WheelInput, state: &ReaderState) -> Option<Operation> {
        if input.zoom_modifier {
            return Some(if input.delta_y < 0.0 {
                Operation::ZoomIn
            } else {
                Operation::ZoomOut
            });
        }

        // Scrolling modes and zoomed pages scroll natively.
        if state.mode().is_scrolling() || state.is_zoomed() {
            return None;
        }
        if input.delta_y.abs() < WHEEL_PAGE_THRESHOLD {
            return None;
        }
        if let Some(last) = self.last_turn {
            if input.time.saturating_duration_since(last) < WHEEL_PAGE_COOLDOWN {
                return None;
            }
        }

        self.last_turn = Some(input.time);
        Some(if input.delta_y > 0.0 {
            Operation::NextPage
        } else {
            Operation::PrevPage
        })
    }
}
