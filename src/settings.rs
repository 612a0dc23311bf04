//! Persisted reader defaults.

use crate::config::DEFAULT_PRELOAD_COUNT;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ReadingMode {
    #[default]
    Single,
    Double,
    DoubleManga,
    Continuous,
    Webtoon,
}

impl ReadingMode {
    /// Modes where every page sits in one scrolling column.
    pub fn is_scrolling(&self) -> bool {
        matches!(self, ReadingMode::Continuous | ReadingMode::Webtoon)
    }

    pub fn is_double(&self) -> bool {
        matches!(self, ReadingMode::Double | ReadingMode::DoubleManga)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReadingDirection {
    #[default]
    Ltr,
    Rtl,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Scaling {
    #[default]
    FitScreen,
    FitWidth,
    FitHeight,
    Original,
}

/// Whether landscape pages are split into halves in single mode, and which
/// half comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    #[default]
    None,
    Ltr,
    Rtl,
}

impl SplitMode {
    pub fn is_enabled(&self) -> bool {
        *self != SplitMode::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderSettings {
    #[serde(default)]
    pub mode: ReadingMode,

    #[serde(default)]
    pub direction: ReadingDirection,

    #[serde(default)]
    pub scaling: Scaling,

    #[serde(default)]
    pub split_pages: SplitMode,

    /// Look-ahead on a good connection; the preload policy scales it.
    #[serde(default = "default_preload_count")]
    pub preload_count: usize,
}

fn default_preload_count() -> usize {
    DEFAULT_PRELOAD_COUNT
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            mode: ReadingMode::default(),
            direction: ReadingDirection::default(),
            scaling: Scaling::default(),
            split_pages: SplitMode::default(),
            preload_count: default_preload_count(),
        }
    }
}

impl ReaderSettings {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
