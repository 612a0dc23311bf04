//! Navigation transitions for [`ReaderState`].
//!
//! `apply` is the only way the reader state changes. It is total: invalid
//! input clamps or becomes a no-op, never an error. Side effects the host
//! must carry out (persistence, scrolling, opening another issue) are
//! returned as [`Effect`]s and never executed here.

use super::{
    AdjacentFile, AdjacentFiles, PageDimensions, PanOffset, ReaderState, SplitView,
    TransitionScreen,
};
use crate::config::{MAX_ZOOM, MIN_ZOOM, ZOOM_LEVELS};
use crate::settings::{ReaderSettings, ReadingDirection, ReadingMode, Scaling, SplitMode};
use log::debug;

const ZOOM_EPSILON: f32 = 0.001;

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    GoToPage(usize),
    /// Page change committed by the scroll tracker; never scrolls back.
    SyncPageFromScroll(usize),
    DismissTransition,
    NextChapter,
    PrevChapter,

    SetMode(ReadingMode),
    SetDirection(ReadingDirection),
    SetScaling(Scaling),
    SetSplitMode(SplitMode),
    SetPreloadCount(usize),
    SaveSettingsAsDefault,

    SetZoom(f32),
    ZoomIn,
    ZoomOut,
    ResetZoom,
    SetPan(PanOffset),
    PanBy { dx: f32, dy: f32 },

    RotateClockwise,
    RotateCounterClockwise,
    ResetRotation,
    ResetAllRotations,

    ToggleBookmark,
    AddBookmark(usize),
    RemoveBookmark(usize),

    SetPageDimensions {
        index: usize,
        dimensions: PageDimensions,
    },
    SetAdjacentFiles(AdjacentFiles),
}

/// Work left to the host after a transition commits.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PageChanged { page: usize, total_pages: usize },
    /// Programmatic scroll in continuous/webtoon modes.
    ScrollToPage(usize),
    MarkCompleted,
    AddBookmark(usize),
    RemoveBookmark(usize),
    SettingsChanged,
    PersistSettings(ReaderSettings),
    OpenFile(AdjacentFile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Navigation,
    Scroll,
}

impl ReaderState {
    /// Applies one operation and returns the effects it produced.
    pub fn apply(&mut self, op: Operation) -> Vec<Effect> {
        let mut effects = Vec::new();

        match op {
            Operation::NextPage => self.next_page(&mut effects),
            Operation::PrevPage => self.prev_page(&mut effects),
            Operation::FirstPage => self.move_to(0, Origin::Navigation, &mut effects),
            Operation::LastPage => {
                let last = self.clamp_page(usize::MAX);
                let target = self.spread_anchor(last);
                self.move_to(target, Origin::Navigation, &mut effects);
            }
            Operation::GoToPage(page) => self.move_to(page, Origin::Navigation, &mut effects),
            Operation::SyncPageFromScroll(page) => self.move_to(page, Origin::Scroll, &mut effects),
            Operation::DismissTransition => self.transition_screen = TransitionScreen::None,
            Operation::NextChapter => {
                if let Some(next) = self.adjacent_files.next.clone() {
                    effects.push(Effect::OpenFile(next));
                }
            }
            Operation::PrevChapter => {
                if let Some(previous) = self.adjacent_files.previous.clone() {
                    effects.push(Effect::OpenFile(previous));
                }
            }

            Operation::SetMode(mode) => {
                if self.settings.mode != mode {
                    self.settings.mode = mode;
                    self.reset_view();
                    self.split_view = SplitView::Full;
                    effects.push(Effect::SettingsChanged);
                    if mode.is_scrolling() && !self.pages.is_empty() {
                        effects.push(Effect::ScrollToPage(self.current_page));
                    }
                }
            }
            Operation::SetDirection(direction) => {
                if self.settings.direction != direction {
                    self.settings.direction = direction;
                    effects.push(Effect::SettingsChanged);
                }
            }
            Operation::SetScaling(scaling) => {
                if self.settings.scaling != scaling {
                    self.settings.scaling = scaling;
                    self.reset_view();
                    effects.push(Effect::SettingsChanged);
                }
            }
            Operation::SetSplitMode(split) => {
                if self.settings.split_pages != split {
                    self.settings.split_pages = split;
                    self.split_view = SplitView::Full;
                    effects.push(Effect::SettingsChanged);
                }
            }
            Operation::SetPreloadCount(count) => {
                if self.settings.preload_count != count {
                    self.settings.preload_count = count;
                    effects.push(Effect::SettingsChanged);
                }
            }
            Operation::SaveSettingsAsDefault => {
                effects.push(Effect::PersistSettings(self.settings.clone()));
            }

            Operation::SetZoom(zoom) => self.set_zoom(zoom),
            Operation::ZoomIn => {
                let next = ZOOM_LEVELS
                    .iter()
                    .copied()
                    .find(|&level| level > self.zoom + ZOOM_EPSILON)
                    .unwrap_or(MAX_ZOOM);
                self.set_zoom(next);
            }
            Operation::ZoomOut => {
                let next = ZOOM_LEVELS
                    .iter()
                    .rev()
                    .copied()
                    .find(|&level| level < self.zoom - ZOOM_EPSILON)
                    .unwrap_or(MIN_ZOOM);
                self.set_zoom(next);
            }
            Operation::ResetZoom => self.reset_view(),
            Operation::SetPan(offset) => {
                if self.is_zoomed() {
                    self.pan = offset;
                }
            }
            Operation::PanBy { dx, dy } => {
                if self.is_zoomed() {
                    self.pan.x += dx;
                    self.pan.y += dy;
                }
            }

            Operation::RotateClockwise => {
                let rotation = self.page_rotation(self.current_page).clockwise();
                self.set_rotation(rotation);
            }
            Operation::RotateCounterClockwise => {
                let rotation = self.page_rotation(self.current_page).counter_clockwise();
                self.set_rotation(rotation);
            }
            Operation::ResetRotation => {
                self.page_rotations.remove(&self.current_page);
            }
            Operation::ResetAllRotations => self.page_rotations.clear(),

            Operation::ToggleBookmark => {
                let page = self.current_page;
                if self.is_bookmarked(page) {
                    self.remove_bookmark(page, &mut effects);
                } else {
                    self.add_bookmark(page, &mut effects);
                }
            }
            Operation::AddBookmark(page) => self.add_bookmark(page, &mut effects),
            Operation::RemoveBookmark(page) => self.remove_bookmark(page, &mut effects),

            Operation::SetPageDimensions { index, dimensions } => {
                if index < self.pages.len() {
                    self.page_dimensions.insert(index, dimensions);
                    if index == self.current_page && !self.qualifies_for_split(index) {
                        self.split_view = SplitView::Full;
                    }
                }
            }
            Operation::SetAdjacentFiles(adjacent) => self.adjacent_files = adjacent,
        }

        effects
    }

    fn next_page(&mut self, effects: &mut Vec<Effect>) {
        match self.transition_screen {
            TransitionScreen::Start => {
                self.transition_screen = TransitionScreen::None;
                self.move_to(0, Origin::Navigation, effects);
                return;
            }
            // Crossing into the next issue is the host's call.
            TransitionScreen::End => return,
            TransitionScreen::None => {}
        }
        if self.pages.is_empty() {
            return;
        }

        if self.qualifies_for_split(self.current_page) {
            let (first, second) = self.split_halves();
            if self.split_view == SplitView::Full {
                self.split_view = first;
                return;
            }
            if self.split_view == first {
                self.split_view = second;
                return;
            }
        }

        let last_shown = self
            .displayed_pages()
            .into_iter()
            .max()
            .unwrap_or(self.current_page);
        let target = last_shown + 1;
        if target >= self.pages.len() {
            self.reach_end(effects);
            return;
        }
        self.move_to(target, Origin::Navigation, effects);
    }

    fn prev_page(&mut self, effects: &mut Vec<Effect>) {
        match self.transition_screen {
            TransitionScreen::End => {
                self.transition_screen = TransitionScreen::None;
                return;
            }
            TransitionScreen::Start => return,
            TransitionScreen::None => {}
        }
        if self.pages.is_empty() {
            return;
        }

        if self.qualifies_for_split(self.current_page) {
            let (first, second) = self.split_halves();
            if self.split_view == second {
                self.split_view = first;
                return;
            }
            if self.split_view == first {
                self.split_view = SplitView::Full;
                return;
            }
        }

        let first_shown = self
            .displayed_pages()
            .into_iter()
            .min()
            .unwrap_or(self.current_page);
        if first_shown == 0 {
            if self.has_prev_chapter() {
                debug!("Start of {} reached, showing start screen", self.file_id);
                self.transition_screen = TransitionScreen::Start;
            }
            return;
        }
        let target = self.spread_anchor(first_shown - 1);
        self.move_to(target, Origin::Navigation, effects);
    }

    fn reach_end(&mut self, effects: &mut Vec<Effect>) {
        debug!("End of {} reached, showing end screen", self.file_id);
        self.transition_screen = TransitionScreen::End;
        if !self.completed {
            self.completed = true;
            effects.push(Effect::MarkCompleted);
        }
    }

    /// First page of the spread containing `page` in double modes.
    fn spread_anchor(&self, page: usize) -> usize {
        if self.settings.mode.is_double() {
            self.spread_for(page).into_iter().min().unwrap_or(page)
        } else {
            page
        }
    }

    fn move_to(&mut self, page: usize, origin: Origin, effects: &mut Vec<Effect>) {
        if self.pages.is_empty() {
            return;
        }
        let target = self.clamp_page(page);

        self.transition_screen = TransitionScreen::None;
        self.split_view = SplitView::Full;
        self.pan = PanOffset::ORIGIN;

        if target == self.current_page {
            return;
        }
        self.current_page = target;
        effects.push(Effect::PageChanged {
            page: target,
            total_pages: self.pages.len(),
        });
        if origin == Origin::Navigation && self.settings.mode.is_scrolling() {
            effects.push(Effect::ScrollToPage(target));
        }
    }

    fn set_zoom(&mut self, zoom: f32) {
        if !zoom.is_finite() {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if !self.is_zoomed() {
            self.pan = PanOffset::ORIGIN;
        }
    }

    fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = PanOffset::ORIGIN;
    }

    fn set_rotation(&mut self, rotation: super::Rotation) {
        if rotation == super::Rotation::Deg0 {
            self.page_rotations.remove(&self.current_page);
        } else {
            self.page_rotations.insert(self.current_page, rotation);
        }
    }

    fn add_bookmark(&mut self, page: usize, effects: &mut Vec<Effect>) {
        if page < self.pages.len() && self.bookmarks.insert(page) {
            effects.push(Effect::AddBookmark(page));
        }
    }

    fn remove_bookmark(&mut self, page: usize, effects: &mut Vec<Effect>) {
        if self.bookmarks.remove(&page) {
            effects.push(Effect::RemoveBookmark(page));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PageInfo, Rotation};

    fn pages(count: usize) -> Vec<PageInfo> {
        (0..count)
            .map(|index| PageInfo {
                path: format!("{index:03}.jpg"),
                index,
                url: format!("/p/{index}"),
            })
            .collect()
    }

    fn state(count: usize, settings: ReaderSettings) -> ReaderState {
        ReaderState::new("issue-1", pages(count), settings)
    }

    fn landscape() -> PageDimensions {
        PageDimensions {
            width: 2000,
            height: 1400,
        }
    }

    fn adjacent() -> AdjacentFiles {
        AdjacentFiles {
            previous: Some(AdjacentFile {
                id: "issue-0".into(),
                name: "Issue 0".into(),
            }),
            next: Some(AdjacentFile {
                id: "issue-2".into(),
                name: "Issue 2".into(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn go_to_page_clamps() {
        let mut state = state(5, ReaderSettings::default());
        state.apply(Operation::GoToPage(99));
        assert_eq!(state.current_page(), 4);
        state.apply(Operation::GoToPage(0));
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn split_cycle_left_right_then_advance() {
        let mut state = state(
            4,
            ReaderSettings {
                split_pages: SplitMode::Ltr,
                ..Default::default()
            },
        );
        state.apply(Operation::SetPageDimensions {
            index: 0,
            dimensions: landscape(),
        });

        state.apply(Operation::NextPage);
        assert_eq!((state.current_page(), state.split_view()), (0, SplitView::Left));
        state.apply(Operation::NextPage);
        assert_eq!((state.current_page(), state.split_view()), (0, SplitView::Right));
        let effects = state.apply(Operation::NextPage);
        assert_eq!((state.current_page(), state.split_view()), (1, SplitView::Full));
        assert!(effects.contains(&Effect::PageChanged {
            page: 1,
            total_pages: 4
        }));
    }

    #[test]
    fn rtl_split_starts_with_right_half_and_reverses_backwards() {
        let mut state = state(
            4,
            ReaderSettings {
                split_pages: SplitMode::Rtl,
                ..Default::default()
            },
        );
        state.apply(Operation::SetPageDimensions {
            index: 0,
            dimensions: landscape(),
        });

        state.apply(Operation::NextPage);
        assert_eq!(state.split_view(), SplitView::Right);
        state.apply(Operation::NextPage);
        assert_eq!(state.split_view(), SplitView::Left);
        state.apply(Operation::PrevPage);
        assert_eq!(state.split_view(), SplitView::Right);
        state.apply(Operation::PrevPage);
        assert_eq!(state.split_view(), SplitView::Full);
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn split_is_ignored_outside_single_mode() {
        let mut state = state(
            4,
            ReaderSettings {
                split_pages: SplitMode::Ltr,
                mode: ReadingMode::Continuous,
                ..Default::default()
            },
        );
        state.apply(Operation::SetPageDimensions {
            index: 0,
            dimensions: landscape(),
        });
        state.apply(Operation::NextPage);
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn double_mode_pairs_after_cover() {
        let mut state = state(
            6,
            ReaderSettings {
                mode: ReadingMode::Double,
                ..Default::default()
            },
        );
        assert_eq!(state.displayed_pages(), vec![0]);
        state.apply(Operation::NextPage);
        assert_eq!(state.displayed_pages(), vec![1, 2]);
        state.apply(Operation::NextPage);
        assert_eq!(state.displayed_pages(), vec![3, 4]);
        state.apply(Operation::NextPage);
        assert_eq!(state.displayed_pages(), vec![5]);
        state.apply(Operation::PrevPage);
        assert_eq!(state.current_page(), 3);
        state.apply(Operation::PrevPage);
        state.apply(Operation::PrevPage);
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn manga_mode_reverses_display_and_keeps_spreads_solo() {
        let mut state = state(
            6,
            ReaderSettings {
                mode: ReadingMode::DoubleManga,
                ..Default::default()
            },
        );
        state.apply(Operation::SetPageDimensions {
            index: 2,
            dimensions: landscape(),
        });
        state.apply(Operation::GoToPage(1));
        assert_eq!(state.displayed_pages(), vec![1]);
        state.apply(Operation::NextPage);
        assert_eq!(state.displayed_pages(), vec![2]);
        state.apply(Operation::NextPage);
        assert_eq!(state.displayed_pages(), vec![4, 3]);
    }

    #[test]
    fn end_of_issue_completes_once() {
        let mut state = state(3, ReaderSettings::default());
        state.apply(Operation::LastPage);

        let effects = state.apply(Operation::NextPage);
        assert_eq!(state.transition_screen(), TransitionScreen::End);
        assert!(state.completed());
        assert_eq!(effects, vec![Effect::MarkCompleted]);

        assert!(state.apply(Operation::NextPage).is_empty());

        state.apply(Operation::PrevPage);
        assert_eq!(state.transition_screen(), TransitionScreen::None);
        assert_eq!(state.current_page(), 2);

        let effects = state.apply(Operation::NextPage);
        assert_eq!(state.transition_screen(), TransitionScreen::End);
        assert!(!effects.contains(&Effect::MarkCompleted));
    }

    #[test]
    fn start_screen_only_with_previous_issue() {
        let mut alone = state(3, ReaderSettings::default());
        alone.apply(Operation::PrevPage);
        assert_eq!(alone.transition_screen(), TransitionScreen::None);

        let mut state = state(3, ReaderSettings::default()).with_adjacent_files(adjacent());
        state.apply(Operation::PrevPage);
        assert_eq!(state.transition_screen(), TransitionScreen::Start);
        assert!(state.apply(Operation::PrevPage).is_empty());

        state.apply(Operation::NextPage);
        assert_eq!(state.transition_screen(), TransitionScreen::None);
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn chapter_navigation_opens_adjacent_issue() {
        let mut state = state(3, ReaderSettings::default()).with_adjacent_files(adjacent());
        assert!(state.has_next_chapter() && state.has_prev_chapter());
        let effects = state.apply(Operation::NextChapter);
        assert!(matches!(&effects[..], [Effect::OpenFile(file)] if file.id == "issue-2"));
    }

    #[test]
    fn zoom_steps_through_presets() {
        let mut state = state(3, ReaderSettings::default());
        state.apply(Operation::ZoomIn);
        assert_eq!(state.zoom(), 1.25);
        state.apply(Operation::SetZoom(1.6));
        state.apply(Operation::ZoomIn);
        assert_eq!(state.zoom(), 2.0);
        state.apply(Operation::SetZoom(3.0));
        state.apply(Operation::ZoomIn);
        state.apply(Operation::ZoomIn);
        assert_eq!(state.zoom(), 4.0);
        state.apply(Operation::SetZoom(0.3));
        state.apply(Operation::ZoomOut);
        assert_eq!(state.zoom(), 0.25);
        state.apply(Operation::SetZoom(10.0));
        assert_eq!(state.zoom(), MAX_ZOOM);
    }

    #[test]
    fn scaling_change_resets_zoom_and_pan() {
        let mut state = state(
            3,
            ReaderSettings {
                scaling: Scaling::FitHeight,
                ..Default::default()
            },
        );
        state.apply(Operation::SetZoom(2.0));
        state.apply(Operation::PanBy { dx: 40.0, dy: -10.0 });
        assert_eq!(state.pan(), PanOffset { x: 40.0, y: -10.0 });

        state.apply(Operation::SetScaling(Scaling::FitWidth));
        assert_eq!(state.zoom(), 1.0);
        assert_eq!(state.pan(), PanOffset::ORIGIN);
    }

    #[test]
    fn page_change_resets_pan_but_keeps_zoom_rotation_bookmarks() {
        let mut state = state(5, ReaderSettings::default());
        state.apply(Operation::SetZoom(2.0));
        state.apply(Operation::SetPan(PanOffset { x: 5.0, y: 5.0 }));
        state.apply(Operation::RotateClockwise);
        let effects = state.apply(Operation::ToggleBookmark);
        assert_eq!(effects, vec![Effect::AddBookmark(0)]);

        state.apply(Operation::NextPage);

        assert_eq!(state.pan(), PanOffset::ORIGIN);
        assert_eq!(state.zoom(), 2.0);
        assert_eq!(state.page_rotation(0), Rotation::Deg90);
        assert_eq!(state.page_rotation(1), Rotation::Deg0);
        assert!(state.is_bookmarked(0));
    }

    #[test]
    fn pan_requires_zoom() {
        let mut state = state(2, ReaderSettings::default());
        state.apply(Operation::PanBy { dx: 10.0, dy: 10.0 });
        assert_eq!(state.pan(), PanOffset::ORIGIN);
    }

    #[test]
    fn scroll_sync_does_not_scroll_back() {
        let mut state = state(
            10,
            ReaderSettings {
                mode: ReadingMode::Webtoon,
                ..Default::default()
            },
        );
        let jump = state.apply(Operation::GoToPage(4));
        assert!(jump.contains(&Effect::ScrollToPage(4)));

        let synced = state.apply(Operation::SyncPageFromScroll(5));
        assert_eq!(state.current_page(), 5);
        assert!(!synced.iter().any(|e| matches!(e, Effect::ScrollToPage(_))));
    }

    #[test]
    fn save_as_default_carries_current_settings() {
        let mut state = state(2, ReaderSettings::default());
        state.apply(Operation::SetDirection(ReadingDirection::Rtl));
        let effects = state.apply(Operation::SaveSettingsAsDefault);
        match &effects[..] {
            [Effect::PersistSettings(settings)] => {
                assert_eq!(settings.direction, ReadingDirection::Rtl)
            }
            other => panic!("unexpected effects: {other:?}"),
        }
    }
}
