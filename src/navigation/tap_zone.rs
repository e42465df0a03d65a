//! Tap zones along the left and right screen edges

use serde::{Deserialize, Serialize};

use super::NavigationIntent;

/// Outcome of resolving a tap against the zones
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapResult {
    Backward,
    Forward,
    /// Center band, left for zoom/pan and other interactions
    Ignored,
}

impl TapResult {
    pub fn intent(self) -> Option<NavigationIntent> {
        match self {
            Self::Backward => Some(NavigationIntent::Backward),
            Self::Forward => Some(NavigationIntent::Forward),
            Self::Ignored => None,
        }
    }
}

/// Zone widths as fractions of the screen width
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapZoneConfig {
    /// Measured from the left edge
    pub backward_ratio: f32,
    /// Measured from the right edge
    pub forward_ratio: f32,
}

impl TapZoneConfig {
    /// Equal narrow zones, keeping a wide center band for zoom and pan
    pub const NORMAL: Self = Self {
        backward_ratio: 0.25,
        forward_ratio: 0.25,
    };

    /// Forward zone covers two thirds of the screen while playing
    pub const PERFORMANCE: Self = Self {
        backward_ratio: 1.0 / 3.0,
        forward_ratio: 2.0 / 3.0,
    };

    /// Clamp both ratios into `[0, 1]`, replacing non-finite values with 0
    #[must_use]
    pub fn sanitized(self) -> Self {
        let fix = |r: f32| if r.is_finite() { r.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            backward_ratio: fix(self.backward_ratio),
            forward_ratio: fix(self.forward_ratio),
        }
    }
}

impl Default for TapZoneConfig {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// Map a tap's x coordinate to a navigation intent.
///
/// The backward zone is checked first, so it wins if the zones overlap.
pub fn resolve_tap(screen_x: f32, screen_width: f32, config: TapZoneConfig) -> TapResult {
    if !(screen_width.is_finite() && screen_width > 0.0) {
        return TapResult::Ignored;
    }
    if !screen_x.is_finite() || screen_x < 0.0 || screen_x > screen_width {
        return TapResult::Ignored;
    }

    let config = config.sanitized();
    let backward_edge = screen_width * config.backward_ratio;
    let forward_edge = screen_width - screen_width * config.forward_ratio;

    if screen_x < backward_edge {
        TapResult::Backward
    } else if config.forward_ratio > 0.0 && screen_x >= forward_edge {
        TapResult::Forward
    } else {
        TapResult::Ignored
    }
}
