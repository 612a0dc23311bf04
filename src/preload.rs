//! Network-aware preload policy.
//!
//! Maps a network sample to how many pages to fetch ahead of and behind the
//! current page, how long to wait after a page change before fetching, and the
//! quality label shown to the user. Page images are often several megabytes,
//! so the window shrinks with bandwidth and stops entirely when the device is
//! offline or data saving is requested.

use crate::config::{DEFAULT_PRELOAD_COUNT, PROTECTED_RANGE_MARGIN};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Moderate,
    Poor,
    Offline,
}

/// Network Information API `effectiveType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType {
    Slow2g,
    TwoG,
    ThreeG,
    FourG,
}

impl FromStr for EffectiveType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slow-2g" => Ok(EffectiveType::Slow2g),
            "2g" => Ok(EffectiveType::TwoG),
            "3g" => Ok(EffectiveType::ThreeG),
            "4g" => Ok(EffectiveType::FourG),
            other => Err(format!("unknown effective connection type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkSample {
    pub effective_type: Option<EffectiveType>,
    pub save_data: bool,
    pub downlink_mbps: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetworkStatus {
    Offline,
    Online(NetworkSample),
    /// The host exposes no network information at all.
    Unavailable,
}

/// Source of network samples (Network Information API or equivalent).
pub trait NetworkSampler {
    fn sample(&self) -> NetworkStatus;
}

/// A sampler that always reports the same status.
#[derive(Debug, Clone, Copy)]
pub struct FixedNetworkSampler(pub NetworkStatus);

impl NetworkSampler for FixedNetworkSampler {
    fn sample(&self) -> NetworkStatus {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreloadConfig {
    pub ahead_count: usize,
    pub behind_count: usize,
    pub delay_ms: u64,
    pub quality: ConnectionQuality,
}

impl PreloadConfig {
    pub const fn new(
        ahead_count: usize,
        behind_count: usize,
        delay_ms: u64,
        quality: ConnectionQuality,
    ) -> Self {
        Self {
            ahead_count,
            behind_count,
            delay_ms,
            quality,
        }
    }

    /// Pages ordered by fetch priority: the page itself, then ahead pages
    /// nearest first, then behind pages nearest first.
    pub fn indices_around(&self, current_page: usize, total_pages: usize) -> Vec<usize> {
        if total_pages == 0 {
            return Vec::new();
        }
        let mut indices = Vec::with_capacity(1 + self.ahead_count + self.behind_count);
        indices.push(current_page.min(total_pages - 1));
        indices.extend(
            (1..=self.ahead_count)
                .map(|offset| current_page + offset)
                .take_while(|&index| index < total_pages),
        );
        indices.extend(
            (1..=self.behind_count).filter_map(|offset| current_page.checked_sub(offset)),
        );
        indices
    }

    /// Distance from the current page within which cached pages survive eviction.
    pub fn protected_range(&self) -> usize {
        self.ahead_count.max(self.behind_count) + PROTECTED_RANGE_MARGIN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadPolicy {
    base_ahead: usize,
}

impl Default for PreloadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_PRELOAD_COUNT)
    }
}

impl PreloadPolicy {
    /// `base_ahead` is the user's preferred look-ahead on a good connection.
    pub fn new(base_ahead: usize) -> Self {
        Self { base_ahead }
    }

    pub fn base_ahead(&self) -> usize {
        self.base_ahead
    }

    pub fn config_for(&self, status: &NetworkStatus) -> PreloadConfig {
        use ConnectionQuality::*;
        let base = self.base_ahead;

        let sample = match status {
            NetworkStatus::Offline => return PreloadConfig::new(0, 0, 0, Offline),
            NetworkStatus::Unavailable => return PreloadConfig::new(base, 1, 100, Good),
            NetworkStatus::Online(sample) => sample,
        };

        if sample.save_data {
            return PreloadConfig::new(1, 0, 500, Moderate);
        }

        match sample.effective_type {
            Some(EffectiveType::Slow2g) => PreloadConfig::new(0, 0, 1000, Poor),
            Some(EffectiveType::TwoG) => PreloadConfig::new(1, 0, 500, Poor),
            Some(EffectiveType::ThreeG) => PreloadConfig::new(base.min(2), 1, 200, Moderate),
            Some(EffectiveType::FourG) => match sample.downlink_mbps {
                Some(downlink) if downlink >= 10.0 => {
                    PreloadConfig::new(base.max(5), 2, 0, Excellent)
                }
                Some(downlink) if downlink >= 2.0 => PreloadConfig::new(base, 1, 100, Good),
                Some(_) => PreloadConfig::new(base.min(2), 1, 200, Moderate),
                None => PreloadConfig::new(base, 1, 100, Good),
            },
            None => PreloadConfig::new(base, 1, 100, Good),
        }
    }
}
