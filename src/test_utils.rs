//! Doubles for the engine's collaborators, shared by unit and integration tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use image::{Rgba, RgbaImage};

use crate::crop_store::{DocumentCropSettings, DocumentId};
use crate::host::{HostShell, Orientation};
use crate::page_source::{PageBounds, PageHandle, PageOrigin, PageSource, RenderFault};
use crate::store::{SettingsStore, StoreError};

/// Color of horizontal stripe `stripe` on page `page`
pub fn stripe_color(page: usize, stripe: u32) -> Rgba<u8> {
    Rgba([page as u8, (stripe as u8).wrapping_mul(40), 0x80, 0xFF])
}

/// Synthetic document whose pages are horizontal color bands.
///
/// Rasterizing draws the bands straight at the requested size, so every
/// pixel row maps to exactly one known stripe.
pub struct StripedPageSource {
    width: u32,
    height: u32,
    stripes: u32,
    origin: PageOrigin,
    missing: HashSet<usize>,
    delay: Option<Duration>,
    calls: Vec<AtomicUsize>,
}

impl StripedPageSource {
    pub fn new(page_count: usize, width: u32, height: u32, stripes: u32) -> Self {
        Self {
            width,
            height,
            stripes: stripes.max(1),
            origin: PageOrigin::TopLeft,
            missing: HashSet::new(),
            delay: None,
            calls: (0..page_count).map(|_| AtomicUsize::new(0)).collect(),
        }
    }

    pub fn with_origin(mut self, origin: PageOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Page is counted but has no handle, like a page deleted mid-session
    pub fn with_missing_page(mut self, page: usize) -> Self {
        self.missing.insert(page);
        self
    }

    /// Sleep this long inside every rasterize call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn rasterize_count(&self, page: usize) -> usize {
        self.calls
            .get(page)
            .map_or(0, |c| c.load(Ordering::SeqCst))
    }

    pub fn total_rasterize_count(&self) -> usize {
        self.calls.iter().map(|c| c.load(Ordering::SeqCst)).sum()
    }
}

impl PageSource for StripedPageSource {
    fn page_count(&self) -> usize {
        self.calls.len()
    }

    fn page(&self, index: usize) -> Option<PageHandle> {
        (index < self.calls.len() && !self.missing.contains(&index)).then_some(PageHandle::new(index))
    }

    fn native_bounds(&self, _page: PageHandle) -> PageBounds {
        PageBounds::new(self.width as f32, self.height as f32)
    }

    fn origin(&self) -> PageOrigin {
        self.origin
    }

    fn rasterize(&self, page: PageHandle, width: u32, height: u32) -> Result<RgbaImage, RenderFault> {
        let counter = self
            .calls
            .get(page.index())
            .ok_or(RenderFault::MissingPage(page.index()))?;
        counter.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let stripes = self.stripes;
        Ok(RgbaImage::from_fn(width, height, |_, y| {
            let stripe = (u64::from(y) * u64::from(stripes) / u64::from(height.max(1))) as u32;
            stripe_color(page.index(), stripe)
        }))
    }
}

/// Host double that remembers every screen-wake request
#[derive(Clone, Debug, Default)]
pub struct RecordingHost {
    awake_calls: Arc<Mutex<Vec<bool>>>,
    orientation: Arc<Mutex<Orientation>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn awake_calls(&self) -> Vec<bool> {
        self.awake_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Last hint sent, false if none
    pub fn is_awake(&self) -> bool {
        self.awake_calls().last().copied().unwrap_or(false)
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        *self.orientation.lock().unwrap_or_else(PoisonError::into_inner) = orientation;
    }
}

impl HostShell for RecordingHost {
    fn set_screen_awake_hint(&mut self, awake: bool) {
        self.awake_calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(awake);
    }

    fn current_orientation(&self) -> Orientation {
        *self.orientation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store whose saves always fail; loads find nothing
#[derive(Debug, Default)]
pub struct FailingStore {
    attempts: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SettingsStore for FailingStore {
    fn load(&self, _id: &DocumentId) -> Result<Option<DocumentCropSettings>, StoreError> {
        Ok(None)
    }

    fn save(&self, id: &DocumentId, _settings: &DocumentCropSettings) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::backend(format!("store is read-only, cannot save {id}")))
    }
}
