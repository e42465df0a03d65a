//! Normalized crop regions
//!
//! A region is a rectangle relative to the unit square of a page, with the
//! origin at the top-left corner and y growing downward.

use serde::{Deserialize, Serialize};

/// Smallest width or height a region may have
pub const MIN_REGION_SIZE: f32 = 0.05;

/// Tolerance used when comparing region edges against the unit square
const EDGE_EPSILON: f32 = 1e-4;

/// A crop window relative to a page's full bounds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for NormalizedRegion {
    fn default() -> Self {
        Self::FULL
    }
}

impl NormalizedRegion {
    /// The whole page
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Build a region, clamping the inputs into a valid rectangle.
    ///
    /// Non-finite inputs yield the full page.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return Self::FULL;
        }

        let width = width.clamp(MIN_REGION_SIZE, 1.0);
        let height = height.clamp(MIN_REGION_SIZE, 1.0);
        let x = x.clamp(0.0, 1.0 - width);
        let y = y.clamp(0.0, 1.0 - height);

        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a region from its four edges
    #[must_use]
    pub fn from_edges(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Returns true if every invariant of a normalized region holds
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());

        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width >= MIN_REGION_SIZE - EDGE_EPSILON
            && self.height >= MIN_REGION_SIZE - EDGE_EPSILON
            && self.right() <= 1.0 + EDGE_EPSILON
            && self.bottom() <= 1.0 + EDGE_EPSILON
    }

    /// Returns the region itself when valid, otherwise the full page
    #[must_use]
    pub fn sanitized(self) -> Self {
        if self.is_valid() { self } else { Self::FULL }
    }

    /// Returns true if this region covers the whole page
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.x.abs() < EDGE_EPSILON
            && self.y.abs() < EDGE_EPSILON
            && (self.width - 1.0).abs() < EDGE_EPSILON
            && (self.height - 1.0).abs() < EDGE_EPSILON
    }

    /// Returns true if the unit-space point lies inside the region
    #[must_use]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    /// Resolve this region against a raster of the given pixel size.
    ///
    /// The returned rectangle is always at least one pixel and never
    /// exceeds the raster.
    #[must_use]
    pub fn to_pixel_rect(&self, width_px: u32, height_px: u32) -> PixelRect {
        let region = self.sanitized();
        let w = width_px as f32;
        let h = height_px as f32;

        let left = (region.x * w).floor().clamp(0.0, w) as u32;
        let top = (region.y * h).floor().clamp(0.0, h) as u32;
        let right = (region.right() * w).ceil().clamp(0.0, w) as u32;
        let bottom = (region.bottom() * h).ceil().clamp(0.0, h) as u32;

        let left = left.min(width_px.saturating_sub(1));
        let top = top.min(height_px.saturating_sub(1));

        PixelRect {
            x: left,
            y: top,
            width: right.saturating_sub(left).max(1),
            height: bottom.saturating_sub(top).max(1),
        }
    }
}

/// Integer rectangle on a rendered raster, top-left origin
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crop preference for a single page
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CropSettings {
    pub region: NormalizedRegion,
}

impl CropSettings {
    #[must_use]
    pub fn new(region: NormalizedRegion) -> Self {
        Self { region }
    }

    /// Settings that show the whole page
    #[must_use]
    pub fn full() -> Self {
        Self::default()
    }

    /// Replace an invalid persisted region with the full page
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            region: self.region.sanitized(),
        }
    }
}

impl From<NormalizedRegion> for CropSettings {
    fn from(region: NormalizedRegion) -> Self {
        Self::new(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clamps_into_unit_square() {
        let region = NormalizedRegion::new(0.9, -0.2, 0.5, 2.0);
        assert!(region.is_valid());
        assert!((region.x - 0.5).abs() < 1e-6);
        assert_eq!(region.y, 0.0);
        assert_eq!(region.height, 1.0);
    }

    #[test]
    fn new_enforces_min_size() {
        let region = NormalizedRegion::new(0.5, 0.5, 0.0, 0.01);
        assert_eq!(region.width, MIN_REGION_SIZE);
        assert_eq!(region.height, MIN_REGION_SIZE);
    }

    #[test]
    fn non_finite_degrades_to_full() {
        assert_eq!(NormalizedRegion::new(f32::NAN, 0.0, 0.5, 0.5), NormalizedRegion::FULL);
        let bad = NormalizedRegion {
            x: 0.0,
            y: 0.0,
            width: f32::INFINITY,
            height: 0.5,
        };
        assert_eq!(bad.sanitized(), NormalizedRegion::FULL);
    }

    #[test]
    fn sanitized_rejects_overflowing_region() {
        let bad = NormalizedRegion {
            x: 0.8,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        assert!(!bad.is_valid());
        assert!(bad.sanitized().is_full());
    }

    #[test]
    fn pixel_rect_resolves_against_raster_size() {
        let region = NormalizedRegion::new(0.25, 0.5, 0.5, 0.5);
        let rect = region.to_pixel_rect(200, 100);
        assert_eq!(
            rect,
            PixelRect {
                x: 50,
                y: 50,
                width: 100,
                height: 50
            }
        );
    }

    #[test]
    fn pixel_rect_never_empty() {
        let region = NormalizedRegion::new(0.95, 0.95, 0.05, 0.05);
        let rect = region.to_pixel_rect(4, 4);
        assert!(rect.width >= 1 && rect.height >= 1);
        assert!(rect.x + rect.width <= 4);
        assert!(rect.y + rect.height <= 4);
    }

    #[test]
    fn crop_settings_serialize_as_bare_region() {
        let settings = CropSettings::new(NormalizedRegion::new(0.1, 0.2, 0.3, 0.4));
        let json = serde_json::to_value(settings).unwrap();
        assert!(json.get("x").is_some());
        assert!(json.get("region").is_none());
    }
}
