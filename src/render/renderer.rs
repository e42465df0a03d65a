//! Region rendering: rasterize, crop, then optionally halve

use image::imageops;
use image::RgbaImage;
use log::warn;

use crate::page_source::{PageBounds, PageOrigin, PageSource};
use crate::region::NormalizedRegion;

/// Lowest oversampling factor the renderer accepts
pub const MIN_OVERSAMPLING: f32 = 2.0;

/// Which half of a cropped page to keep
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HalfSelector {
    Top,
    Bottom,
}

/// Output size in display pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangle in the page source's native units and origin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A rendered slot, ready for display
#[derive(Clone, Debug)]
pub struct RenderedImage {
    pub image: RgbaImage,
    pub page: usize,
    pub half: Option<HalfSelector>,
    /// The part of the page the image shows
    pub source_rect: NativeRect,
}

#[derive(Clone, Copy, Debug)]
pub struct RegionRenderer {
    oversampling: f32,
}

impl Default for RegionRenderer {
    fn default() -> Self {
        Self::new(MIN_OVERSAMPLING)
    }
}

impl RegionRenderer {
    #[must_use]
    pub fn new(oversampling: f32) -> Self {
        let oversampling = if oversampling.is_finite() {
            oversampling.max(MIN_OVERSAMPLING)
        } else {
            MIN_OVERSAMPLING
        };
        Self { oversampling }
    }

    #[must_use]
    pub fn oversampling(&self) -> f32 {
        self.oversampling
    }

    /// Render `region` of a page, keeping only `half` of it when given.
    ///
    /// Returns `None` when the page is gone or cannot be rasterized; the
    /// failure is logged and the caller leaves the slot empty.
    pub fn render(
        &self,
        source: &dyn PageSource,
        page_index: usize,
        region: NormalizedRegion,
        half: Option<HalfSelector>,
        target: TargetSize,
    ) -> Option<RenderedImage> {
        if target.is_empty() {
            warn!("Skipping render of page {page_index}: empty target {target:?}");
            return None;
        }

        let Some(handle) = source.page(page_index) else {
            warn!("Page {page_index} is not available for rendering");
            return None;
        };

        let bounds = source.native_bounds(handle);
        if bounds.is_degenerate() {
            warn!("Page {page_index} has degenerate bounds {bounds:?}");
            return None;
        }

        let (raster_w, raster_h) = self.raster_size(bounds, target);
        let raster = match source.rasterize(handle, raster_w, raster_h) {
            Ok(raster) => raster,
            Err(e) => {
                warn!("Failed to rasterize page {page_index} at {raster_w}x{raster_h}: {e}");
                return None;
            }
        };

        let region = region.sanitized();
        let crop = region.to_pixel_rect(raster.width(), raster.height());
        let cropped = imageops::crop_imm(&raster, crop.x, crop.y, crop.width, crop.height).to_image();

        let (image, shown_y, shown_h) = match half {
            None => (cropped, region.y, region.height),
            Some(selector) => {
                let (y, h) = half_rows(cropped.height(), selector);
                let image = imageops::crop_imm(&cropped, 0, y, cropped.width(), h).to_image();
                let unit_h = region.height / 2.0;
                let unit_y = match selector {
                    HalfSelector::Top => region.y,
                    HalfSelector::Bottom => region.y + unit_h,
                };
                (image, unit_y, unit_h)
            }
        };

        Some(RenderedImage {
            image,
            page: page_index,
            half,
            source_rect: native_rect(
                bounds,
                source.origin(),
                (region.x, shown_y, region.width, shown_h),
            ),
        })
    }

    /// Fit the page into the oversampled target, keeping its aspect ratio
    fn raster_size(&self, bounds: PageBounds, target: TargetSize) -> (u32, u32) {
        let max_w = target.width as f32 * self.oversampling;
        let max_h = target.height as f32 * self.oversampling;
        let scale = (max_w / bounds.width).min(max_h / bounds.height);

        let w = (bounds.width * scale).round().max(1.0) as u32;
        let h = (bounds.height * scale).round().max(1.0) as u32;
        (w, h)
    }
}

/// Row offset and height of one half of an image `height` rows tall.
/// A one-row image is its own top and bottom half.
fn half_rows(height: u32, selector: HalfSelector) -> (u32, u32) {
    let top = height / 2;
    if top == 0 {
        return (0, height);
    }
    match selector {
        HalfSelector::Top => (0, top),
        HalfSelector::Bottom => (top, height - top),
    }
}

/// Convert a top-left unit rectangle into native page units
fn native_rect(bounds: PageBounds, origin: PageOrigin, unit: (f32, f32, f32, f32)) -> NativeRect {
    let (x, y, width, height) = unit;
    let native_y = match origin {
        PageOrigin::TopLeft => y,
        PageOrigin::BottomLeft => 1.0 - y - height,
    };
    NativeRect {
        x: x * bounds.width,
        y: native_y * bounds.height,
        width: width * bounds.width,
        height: height * bounds.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{stripe_color, StripedPageSource};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn assert_uniform(image: &RgbaImage, expected: image::Rgba<u8>) {
        for pixel in image.pixels() {
            assert_eq!(*pixel, expected);
        }
    }

    #[test]
    fn oversampling_is_at_least_two() {
        assert_eq!(RegionRenderer::new(1.0).oversampling(), 2.0);
        assert_eq!(RegionRenderer::new(f32::NAN).oversampling(), 2.0);
        assert_eq!(RegionRenderer::new(3.0).oversampling(), 3.0);
    }

    #[test]
    fn raster_fits_oversampled_target() {
        let source = StripedPageSource::new(1, 100, 400, 4);
        let renderer = RegionRenderer::new(2.0);
        let out = renderer
            .render(&source, 0, NormalizedRegion::FULL, None, TargetSize::new(200, 200))
            .expect("renders");
        // Height bound: 400 px oversampled allows 400 rows, width follows aspect
        assert_eq!(out.image.dimensions(), (100, 400));
    }

    #[test]
    fn crops_before_halving() {
        let source = StripedPageSource::new(1, 100, 400, 4);
        let renderer = RegionRenderer::new(2.0);
        let lower = NormalizedRegion::new(0.0, 0.5, 1.0, 0.5);

        let top = renderer
            .render(&source, 0, lower, Some(HalfSelector::Top), TargetSize::new(50, 200))
            .expect("renders");
        assert_eq!(top.image.dimensions(), (100, 100));
        assert_uniform(&top.image, stripe_color(0, 2));

        let bottom = renderer
            .render(&source, 0, lower, Some(HalfSelector::Bottom), TargetSize::new(50, 200))
            .expect("renders");
        assert_uniform(&bottom.image, stripe_color(0, 3));
    }

    #[test]
    fn halves_are_exactly_fifty_percent() {
        assert_eq!(half_rows(11, HalfSelector::Top), (0, 5));
        assert_eq!(half_rows(11, HalfSelector::Bottom), (5, 6));
        assert_eq!(half_rows(1, HalfSelector::Bottom), (0, 1));
    }

    #[test]
    fn source_rect_for_top_left_origin() {
        let source = StripedPageSource::new(1, 100, 400, 4);
        let renderer = RegionRenderer::default();
        let region = NormalizedRegion::new(0.1, 0.2, 0.5, 0.4);
        let out = renderer
            .render(&source, 0, region, Some(HalfSelector::Bottom), TargetSize::new(50, 200))
            .expect("renders");

        let rect = out.source_rect;
        assert!(approx(rect.x, 10.0));
        assert!(approx(rect.y, 160.0));
        assert!(approx(rect.width, 50.0));
        assert!(approx(rect.height, 80.0));
    }

    #[test]
    fn source_rect_inverts_bottom_left_origin() {
        let source =
            StripedPageSource::new(1, 100, 400, 4).with_origin(PageOrigin::BottomLeft);
        let renderer = RegionRenderer::default();
        let region = NormalizedRegion::new(0.0, 0.1, 1.0, 0.3);
        let out = renderer
            .render(&source, 0, region, None, TargetSize::new(50, 200))
            .expect("renders");

        // (1 - 0.1 - 0.3) * 400
        assert!(approx(out.source_rect.y, 240.0));
        assert!(approx(out.source_rect.height, 120.0));
    }

    #[test]
    fn missing_page_renders_nothing() {
        let source = StripedPageSource::new(2, 100, 400, 4).with_missing_page(1);
        let renderer = RegionRenderer::default();
        let target = TargetSize::new(50, 200);
        assert!(renderer.render(&source, 1, NormalizedRegion::FULL, None, target).is_none());
        assert!(renderer.render(&source, 7, NormalizedRegion::FULL, None, target).is_none());
        assert!(renderer.render(&source, 0, NormalizedRegion::FULL, None, target).is_some());
    }

    #[test]
    fn empty_target_renders_nothing() {
        let source = StripedPageSource::new(1, 100, 400, 4);
        let renderer = RegionRenderer::default();
        assert!(renderer
            .render(&source, 0, NormalizedRegion::FULL, None, TargetSize::new(0, 10))
            .is_none());
    }
}
