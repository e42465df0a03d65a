//! Page-source collaborator
//!
//! A page source knows how many pages a document has and can rasterize any
//! of them at a requested pixel size. Decoding the document itself is the
//! source's business; the engine only asks for pixels.

use std::num::NonZeroU32;
use std::path::Path;

use fast_image_resize as fr;
use image::{DynamicImage, ImageBuffer, RgbaImage};
use log::{debug, warn};

/// Handle to a page that exists in the source
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PageHandle {
    index: usize,
}

impl PageHandle {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self { index }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// Page size in the document's own units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageBounds {
    pub width: f32,
    pub height: f32,
}

impl PageBounds {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// Where the native page model puts its y origin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageOrigin {
    /// Raster convention, y grows downward
    #[default]
    TopLeft,
    /// Document convention (PDF user space), y grows upward
    BottomLeft,
}

/// Errors from rasterizing a page
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("page {0} is not available")]
    MissingPage(usize),

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Handle for a page, or `None` if it was deleted or is out of range
    fn page(&self, index: usize) -> Option<PageHandle>;

    fn native_bounds(&self, page: PageHandle) -> PageBounds;

    fn origin(&self) -> PageOrigin {
        PageOrigin::TopLeft
    }

    /// Rasterize the whole page into exactly `width` x `height` pixels
    fn rasterize(&self, page: PageHandle, width: u32, height: u32) -> Result<RgbaImage, RenderFault>;
}

/// Page source backed by decoded images, one per page (scanned sheet music)
pub struct ImagePageSource {
    pages: Vec<RgbaImage>,
}

impl std::fmt::Debug for ImagePageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePageSource")
            .field("pages", &self.pages.len())
            .finish()
    }
}

impl ImagePageSource {
    #[must_use]
    pub fn new(pages: Vec<RgbaImage>) -> Self {
        Self { pages }
    }

    /// Decode every path as one page, in order
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, RenderFault> {
        let mut pages = Vec::with_capacity(paths.len());
        for path in paths {
            let img = image::open(path.as_ref())?;
            debug!(
                "Loaded page image {:?} ({}x{})",
                path.as_ref(),
                img.width(),
                img.height()
            );
            pages.push(img.to_rgba8());
        }
        Ok(Self { pages })
    }

    /// Fast resize using fast_image_resize crate for better performance
    fn fast_resize(
        src: &RgbaImage,
        new_width: u32,
        new_height: u32,
    ) -> Result<RgbaImage, Box<dyn std::error::Error>> {
        let (src_width, src_height) = src.dimensions();

        let src_view = fr::Image::from_vec_u8(
            NonZeroU32::new(src_width).ok_or("Invalid width")?,
            NonZeroU32::new(src_height).ok_or("Invalid height")?,
            src.as_raw().clone(),
            fr::PixelType::U8x4,
        )?;

        let dst_width = NonZeroU32::new(new_width).ok_or("Invalid target width")?;
        let dst_height = NonZeroU32::new(new_height).ok_or("Invalid target height")?;
        let mut dst = fr::Image::new(dst_width, dst_height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
        resizer.resize(&src_view.view(), &mut dst.view_mut())?;

        ImageBuffer::from_raw(new_width, new_height, dst.into_vec())
            .ok_or_else(|| "Failed to create ImageBuffer".into())
    }
}

impl PageSource for ImagePageSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Option<PageHandle> {
        (index < self.pages.len()).then_some(PageHandle::new(index))
    }

    fn native_bounds(&self, page: PageHandle) -> PageBounds {
        self.pages
            .get(page.index())
            .map(|img| PageBounds::new(img.width() as f32, img.height() as f32))
            .unwrap_or(PageBounds::new(0.0, 0.0))
    }

    fn rasterize(&self, page: PageHandle, width: u32, height: u32) -> Result<RgbaImage, RenderFault> {
        let src = self
            .pages
            .get(page.index())
            .ok_or(RenderFault::MissingPage(page.index()))?;

        if width == 0 || height == 0 {
            return Err(RenderFault::generic(format!(
                "cannot rasterize page {} to {width}x{height}",
                page.index()
            )));
        }
        if src.dimensions() == (width, height) {
            return Ok(src.clone());
        }

        match Self::fast_resize(src, width, height) {
            Ok(resized) => Ok(resized),
            Err(e) => {
                warn!(
                    "Fast resize failed for page {}: {e}, falling back to slow resize",
                    page.index()
                );
                Ok(DynamicImage::ImageRgba8(src.clone())
                    .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
                    .to_rgba8())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn page(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn page_handles_are_bounded() {
        let source = ImagePageSource::new(vec![page(10, 20), page(10, 20)]);
        assert_eq!(source.page_count(), 2);
        assert!(source.page(1).is_some());
        assert!(source.page(2).is_none());
    }

    #[test]
    fn native_bounds_are_pixel_size() {
        let source = ImagePageSource::new(vec![page(40, 60)]);
        let handle = source.page(0).unwrap();
        assert_eq!(source.native_bounds(handle), PageBounds::new(40.0, 60.0));
    }

    #[test]
    fn rasterize_resizes_to_exact_dimensions() {
        let source = ImagePageSource::new(vec![page(40, 60)]);
        let handle = source.page(0).unwrap();
        let img = source.rasterize(handle, 20, 30).unwrap();
        assert_eq!(img.dimensions(), (20, 30));
    }

    #[test]
    fn rasterize_rejects_empty_target() {
        let source = ImagePageSource::new(vec![page(40, 60)]);
        let handle = source.page(0).unwrap();
        assert!(source.rasterize(handle, 0, 30).is_err());
    }

    #[test]
    fn rasterize_stale_handle_fails() {
        let source = ImagePageSource::new(vec![page(4, 4)]);
        assert!(matches!(
            source.rasterize(PageHandle::new(5), 4, 4),
            Err(RenderFault::MissingPage(5))
        ));
    }
}
