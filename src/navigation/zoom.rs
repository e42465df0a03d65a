//! Zoom and pan state for the page view
//!
//! Manages the pinch zoom factor and the pan offset of the zoomed page.
//! Offsets are in unit space of the displayed view, so they survive
//! screen size changes.

/// Zoom and pan state for page viewing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zoom {
    /// Current zoom factor (1.0 = fit page)
    pub factor: f32,

    /// Horizontal pan offset, fraction of the view width
    pub pan_x: f32,

    /// Vertical pan offset, fraction of the view height
    pub pan_y: f32,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            factor: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Zoom {
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 1.0;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 5.0;

    /// Returns the current zoom factor
    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Returns true if the view is at its fitted size
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Apply a pinch of the given relative scale
    pub fn pinch(&mut self, scale: f32) {
        self.factor = Self::clamp_factor(self.factor * scale);
        self.clamp_pan();
    }

    /// Pan by a delta in unit space of the view
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        if dx.is_finite() {
            self.pan_x += dx;
        }
        if dy.is_finite() {
            self.pan_y += dy;
        }
        self.clamp_pan();
    }

    /// Back to the fitted page
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Clamp factor to valid range, handling NaN/Inf
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }

    /// The zoomed page may only move as far as it overflows the view
    fn clamp_pan(&mut self) {
        let max_offset = (self.factor - 1.0) / self.factor;
        self.pan_x = self.pan_x.clamp(0.0, max_offset);
        self.pan_y = self.pan_y.clamp(0.0, max_offset);
    }
}
