//! Reader state: the single source of navigation truth for one session.
//!
//! Fields are private; everything outside this module reads through the
//! query methods below and changes state only through
//! [`ReaderState::apply`](navigation).

use crate::settings::{ReaderSettings, ReadingDirection, ReadingMode, SplitMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub mod navigation;

pub use navigation::{Effect, Operation};

/// One orderable image inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    pub path: String,
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanOffset {
    pub x: f32,
    pub y: f32,
}

impl PanOffset {
    pub const ORIGIN: PanOffset = PanOffset { x: 0.0, y: 0.0 };
}

impl Default for PanOffset {
    fn default() -> Self {
        Self::ORIGIN
    }
}

/// Which part of a landscape page is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitView {
    #[default]
    Full,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub fn clockwise(&self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg90,
            Rotation::Deg90 => Rotation::Deg180,
            Rotation::Deg180 => Rotation::Deg270,
            Rotation::Deg270 => Rotation::Deg0,
        }
    }

    pub fn counter_clockwise(&self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg270,
            Rotation::Deg90 => Rotation::Deg0,
            Rotation::Deg180 => Rotation::Deg90,
            Rotation::Deg270 => Rotation::Deg180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionScreen {
    #[default]
    None,
    /// Before the first page, offering the previous issue.
    Start,
    /// After the last page, offering the next issue.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDimensions {
    pub width: u32,
    pub height: u32,
}

impl PageDimensions {
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacentFile {
    pub id: String,
    pub name: String,
}

/// Neighbouring issues in the same series.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdjacentFiles {
    pub previous: Option<AdjacentFile>,
    pub next: Option<AdjacentFile>,
    pub series_name: Option<String>,
    pub current_index: Option<usize>,
    pub total_in_series: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ReaderState {
    file_id: String,
    pages: Vec<PageInfo>,
    current_page: usize,
    settings: ReaderSettings,
    zoom: f32,
    pan: PanOffset,
    split_view: SplitView,
    page_rotations: HashMap<usize, Rotation>,
    page_dimensions: HashMap<usize, PageDimensions>,
    bookmarks: BTreeSet<usize>,
    completed: bool,
    transition_screen: TransitionScreen,
    adjacent_files: AdjacentFiles,
}

impl ReaderState {
    pub fn new(file_id: impl Into<String>, pages: Vec<PageInfo>, settings: ReaderSettings) -> Self {
        Self {
            file_id: file_id.into(),
            pages,
            current_page: 0,
            settings,
            zoom: 1.0,
            pan: PanOffset::ORIGIN,
            split_view: SplitView::Full,
            page_rotations: HashMap::new(),
            page_dimensions: HashMap::new(),
            bookmarks: BTreeSet::new(),
            completed: false,
            transition_screen: TransitionScreen::None,
            adjacent_files: AdjacentFiles::default(),
        }
    }

    /// Restores the saved position, clamped into the page list.
    pub fn with_start_page(mut self, page: usize) -> Self {
        self.current_page = self.clamp_page(page);
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_bookmarks<I: IntoIterator<Item = usize>>(mut self, bookmarks: I) -> Self {
        let total = self.pages.len();
        self.bookmarks = bookmarks.into_iter().filter(|&page| page < total).collect();
        self
    }

    pub fn with_adjacent_files(mut self, adjacent_files: AdjacentFiles) -> Self {
        self.adjacent_files = adjacent_files;
        self
    }

    pub(crate) fn clamp_page(&self, page: usize) -> usize {
        page.min(self.pages.len().saturating_sub(1))
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn pages(&self) -> &[PageInfo] {
        &self.pages
    }

    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn mode(&self) -> ReadingMode {
        self.settings.mode
    }

    pub fn direction(&self) -> ReadingDirection {
        self.settings.direction
    }

    /// Preferred look-ahead on a good connection; zero disables it.
    pub fn preload_count(&self) -> usize {
        self.settings.preload_count
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom > 1.0
    }

    pub fn pan(&self) -> PanOffset {
        self.pan
    }

    pub fn split_view(&self) -> SplitView {
        self.split_view
    }

    pub fn page_rotation(&self, page: usize) -> Rotation {
        self.page_rotations.get(&page).copied().unwrap_or_default()
    }

    pub fn page_dimensions(&self, page: usize) -> Option<PageDimensions> {
        self.page_dimensions.get(&page).copied()
    }

    /// Unknown dimensions count as portrait.
    pub fn is_landscape(&self, page: usize) -> bool {
        self.page_dimensions(page)
            .map(|dims| dims.is_landscape())
            .unwrap_or(false)
    }

    pub fn bookmarks(&self) -> &BTreeSet<usize> {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, page: usize) -> bool {
        self.bookmarks.contains(&page)
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn transition_screen(&self) -> TransitionScreen {
        self.transition_screen
    }

    pub fn adjacent_files(&self) -> &AdjacentFiles {
        &self.adjacent_files
    }

    pub fn has_next_chapter(&self) -> bool {
        self.adjacent_files.next.is_some()
    }

    pub fn has_prev_chapter(&self) -> bool {
        self.adjacent_files.previous.is_some()
    }

    /// Landscape page, splitting enabled and single-page mode.
    pub fn qualifies_for_split(&self, page: usize) -> bool {
        self.settings.split_pages.is_enabled()
            && self.settings.mode == ReadingMode::Single
            && self.is_landscape(page)
    }

    /// The halves of a split page in reading order.
    pub(crate) fn split_halves(&self) -> (SplitView, SplitView) {
        match self.settings.split_pages {
            SplitMode::Rtl => (SplitView::Right, SplitView::Left),
            SplitMode::Ltr | SplitMode::None => (SplitView::Left, SplitView::Right),
        }
    }

    /// Pages forming the spread around `page` in double modes, ascending.
    ///
    /// The cover and landscape pages stand alone; otherwise pages pair as
    /// (odd, odd + 1).
    pub fn spread_for(&self, page: usize) -> Vec<usize> {
        let total = self.pages.len();
        if page >= total {
            return Vec::new();
        }
        if page == 0 || self.is_landscape(page) {
            return vec![page];
        }
        let start = if page % 2 == 1 { page } else { page - 1 };
        let end = start + 1;
        if end >= total || self.is_landscape(start) || self.is_landscape(end) {
            return vec![page];
        }
        vec![start, end]
    }

    /// Page indices on screen, in display order.
    pub fn displayed_pages(&self) -> Vec<usize> {
        if self.pages.is_empty() {
            return Vec::new();
        }
        if !self.settings.mode.is_double() {
            return vec![self.current_page];
        }
        let mut spread = self.spread_for(self.current_page);
        let reversed = self.settings.mode == ReadingMode::DoubleManga
            || self.settings.direction == ReadingDirection::Rtl;
        if reversed {
            spread.reverse();
        }
        spread
    }
}
