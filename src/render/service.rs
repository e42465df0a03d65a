//! Render service - manages worker pool and cache

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use flume::{Receiver, Sender};
use log::{debug, warn};

use super::cache::{CacheKey, RenderCache};
use super::renderer::{RegionRenderer, RenderedImage, TargetSize};
use super::request::{RenderRequest, RenderResponse, RequestId, SlotSpec, ViewTicket};
use super::worker::{render_worker, WorkerContext};
use super::{DEFAULT_CACHE_SIZE, DEFAULT_OVERSAMPLING, DEFAULT_PREFETCH_RADIUS, DEFAULT_WORKERS};
use crate::navigation::PageAddress;
use crate::page_source::PageSource;

#[derive(Debug)]
enum PendingRequest {
    Slot {
        ticket: ViewTicket,
        slot: usize,
        page: usize,
    },
    Prefetch(CacheKey),
}

/// Worker pool configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServiceConfig {
    pub workers: usize,
    pub cache_size: usize,
    pub prefetch_radius: usize,
    pub oversampling: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            cache_size: DEFAULT_CACHE_SIZE,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            oversampling: DEFAULT_OVERSAMPLING,
        }
    }
}

/// A slot of the current view, as delivered to the presentation layer
#[derive(Clone, Debug)]
pub enum ViewUpdate {
    Ready {
        ticket: ViewTicket,
        slot: usize,
        image: Arc<RenderedImage>,
    },
    /// The slot could not be rendered and stays empty
    Unavailable {
        ticket: ViewTicket,
        slot: usize,
        page: usize,
    },
}

impl ViewUpdate {
    #[must_use]
    pub fn ticket(&self) -> ViewTicket {
        match self {
            Self::Ready { ticket, .. } | Self::Unavailable { ticket, .. } => *ticket,
        }
    }

    #[must_use]
    pub fn slot(&self) -> usize {
        match self {
            Self::Ready { slot, .. } | Self::Unavailable { slot, .. } => *slot,
        }
    }
}

/// Renders views on worker threads and delivers only the newest one
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
    cache: Arc<Mutex<RenderCache>>,
    latest_generation: Arc<AtomicU64>,
    current: Option<ViewTicket>,
    outstanding_slots: usize,
    ready: Vec<ViewUpdate>,
    num_workers: usize,
    prefetch_radius: usize,
    prefetch_in_flight: HashSet<CacheKey>,
}

impl RenderService {
    /// Create a new render service with default configuration
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self::with_config(source, ServiceConfig::default())
    }

    #[must_use]
    pub fn with_config(source: Arc<dyn PageSource>, config: ServiceConfig) -> Self {
        let cache = Arc::new(Mutex::new(RenderCache::new(config.cache_size)));
        let latest_generation = Arc::new(AtomicU64::new(0));
        let renderer = RegionRenderer::new(config.oversampling);

        // Workers pull from one shared queue, so the receiver must be cloneable (MPMC)
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = config.workers.max(1);
        for _ in 0..num_workers {
            let ctx = WorkerContext {
                source: Arc::clone(&source),
                renderer,
                cache: Arc::clone(&cache),
                latest_generation: Arc::clone(&latest_generation),
            };
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            std::thread::spawn(move || {
                render_worker(ctx, rx, tx);
            });
        }

        debug!(
            "Render service started: {num_workers} workers, cache {}, oversampling {}",
            config.cache_size,
            renderer.oversampling()
        );

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            cache,
            latest_generation,
            current: None,
            outstanding_slots: 0,
            ready: vec![],
            num_workers,
            prefetch_radius: config.prefetch_radius,
            prefetch_in_flight: HashSet::new(),
        }
    }

    #[must_use]
    pub fn prefetch_radius(&self) -> usize {
        self.prefetch_radius
    }

    /// Ticket of the view currently wanted on screen
    #[must_use]
    pub fn current_ticket(&self) -> Option<ViewTicket> {
        self.current
    }

    /// Start rendering a new view, superseding whatever was requested before.
    ///
    /// Slots already in the cache are delivered on the next poll without a
    /// round trip through the workers.
    pub fn request_view(
        &mut self,
        position: usize,
        address: PageAddress,
        slots: &[SlotSpec],
        target: TargetSize,
    ) -> ViewTicket {
        let generation = self.latest_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let ticket = ViewTicket {
            generation,
            position,
            address,
        };
        self.current = Some(ticket);
        self.ready.clear();
        self.outstanding_slots = 0;

        for (slot, spec) in slots.iter().enumerate() {
            let key = CacheKey::new(spec, target);
            let cached = self
                .cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key);

            if let Some(image) = cached {
                self.ready.push(ViewUpdate::Ready {
                    ticket,
                    slot,
                    image,
                });
                continue;
            }

            let id = self.next_id();
            let _ = self.request_tx.send(RenderRequest::Slot {
                id,
                ticket,
                slot,
                spec: *spec,
                target,
            });
            self.pending_requests.insert(
                id,
                PendingRequest::Slot {
                    ticket,
                    slot,
                    page: spec.page,
                },
            );
            self.prefetch_in_flight.remove(&key);
            self.outstanding_slots += 1;
        }

        debug!(
            "Requested view {address:?} (generation {generation}, {} slots, {} to render)",
            slots.len(),
            self.outstanding_slots
        );
        ticket
    }

    /// Warm the cache for slots of nearby views. Nothing is delivered.
    pub fn prefetch(&mut self, slots: &[SlotSpec], target: TargetSize) {
        let generation = self.latest_generation.load(Ordering::Acquire);

        for spec in slots {
            let key = CacheKey::new(spec, target);
            if self.prefetch_in_flight.contains(&key) || self.is_cached(&key) {
                continue;
            }

            let id = self.next_id();
            let _ = self.request_tx.send(RenderRequest::Prefetch {
                id,
                generation,
                spec: *spec,
                target,
            });
            self.pending_requests
                .insert(id, PendingRequest::Prefetch(key.clone()));
            self.prefetch_in_flight.insert(key);
        }
    }

    /// Collect finished slots of the current view. Stale results are dropped.
    pub fn poll_responses(&mut self) -> Vec<ViewUpdate> {
        let mut updates = std::mem::take(&mut self.ready);

        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response, &mut updates);
        }

        updates
    }

    /// Like [`poll_responses`](Self::poll_responses), but waits up to
    /// `timeout` for the first response when nothing is ready yet
    pub fn poll_responses_timeout(&mut self, timeout: Duration) -> Vec<ViewUpdate> {
        let mut updates = std::mem::take(&mut self.ready);

        if updates.is_empty() {
            if let Ok(response) = self.response_rx.recv_timeout(timeout) {
                self.handle_response(response, &mut updates);
            }
        }
        while let Ok(response) = self.response_rx.try_recv() {
            self.handle_response(response, &mut updates);
        }

        updates
    }

    fn handle_response(&mut self, response: RenderResponse, updates: &mut Vec<ViewUpdate>) {
        match response {
            RenderResponse::Slot {
                id,
                ticket,
                slot,
                image,
            } => {
                self.pending_requests.remove(&id);
                if self.current == Some(ticket) {
                    self.outstanding_slots = self.outstanding_slots.saturating_sub(1);
                    updates.push(ViewUpdate::Ready {
                        ticket,
                        slot,
                        image,
                    });
                } else {
                    debug!(
                        "Dropping stale slot {slot} of generation {}",
                        ticket.generation
                    );
                }
            }

            RenderResponse::Prefetched { id } | RenderResponse::Cancelled(id) => {
                if let Some(PendingRequest::Prefetch(key)) = self.pending_requests.remove(&id) {
                    self.prefetch_in_flight.remove(&key);
                }
            }

            RenderResponse::Error { id, error } => match self.pending_requests.remove(&id) {
                Some(PendingRequest::Slot { ticket, slot, page }) => {
                    if self.current == Some(ticket) {
                        warn!("Slot {slot} of {:?} left empty: {error}", ticket.address);
                        self.outstanding_slots = self.outstanding_slots.saturating_sub(1);
                        updates.push(ViewUpdate::Unavailable { ticket, slot, page });
                    }
                }
                Some(PendingRequest::Prefetch(key)) => {
                    debug!("Prefetch failed: {error}");
                    self.prefetch_in_flight.remove(&key);
                }
                None => {}
            },
        }
    }

    /// Returns true once every slot of the current view has been delivered
    #[must_use]
    pub fn is_view_complete(&self) -> bool {
        self.outstanding_slots == 0 && self.ready.is_empty()
    }

    /// Number of requests sent to workers and not yet answered
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending_requests.len()
    }

    /// Get a cached slot if available
    #[must_use]
    pub fn cached_slot(&self, spec: &SlotSpec, target: TargetSize) -> Option<Arc<RenderedImage>> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&CacheKey::new(spec, target))
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Drop cached renderings of one page, e.g. after its crop changed
    pub fn invalidate_page(&mut self, page: usize) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate_page(page);
        self.prefetch_in_flight.retain(|key| key.page != page);
    }

    pub fn invalidate_all(&mut self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate_all();
        self.prefetch_in_flight.clear();
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::region::NormalizedRegion;
    use crate::test_utils::StripedPageSource;

    const TARGET: TargetSize = TargetSize::new(50, 100);

    fn drain(service: &mut RenderService) -> Vec<ViewUpdate> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut updates = vec![];
        while !service.is_view_complete() && Instant::now() < deadline {
            updates.extend(service.poll_responses_timeout(Duration::from_millis(50)));
        }
        updates.extend(service.poll_responses());
        updates
    }

    #[test]
    fn delivers_every_slot_of_a_view() {
        let source = Arc::new(StripedPageSource::new(3, 100, 200, 4));
        let mut service = RenderService::new(source);
        let slots = [
            SlotSpec::half(0, NormalizedRegion::FULL, crate::render::HalfSelector::Bottom),
            SlotSpec::half(1, NormalizedRegion::FULL, crate::render::HalfSelector::Top),
        ];
        let ticket = service.request_view(1, PageAddress::Split(0, 1), &slots, TARGET);

        let updates = drain(&mut service);
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.ticket() == ticket));
        assert_eq!(service.pending_count(), 0);
    }

    #[test]
    fn cached_slots_skip_the_workers() {
        let source = Arc::new(StripedPageSource::new(2, 100, 200, 4));
        let mut service = RenderService::new(source.clone());
        let slots = [SlotSpec::full(0, NormalizedRegion::FULL)];

        service.request_view(0, PageAddress::Full(0), &slots, TARGET);
        drain(&mut service);
        assert_eq!(source.rasterize_count(0), 1);

        let ticket = service.request_view(0, PageAddress::Full(0), &slots, TARGET);
        let updates = service.poll_responses();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].ticket(), ticket);
        assert_eq!(source.rasterize_count(0), 1);
    }

    #[test]
    fn missing_page_is_reported_unavailable() {
        let source = Arc::new(StripedPageSource::new(2, 100, 200, 4).with_missing_page(1));
        let mut service = RenderService::new(source);
        let slots = [SlotSpec::full(1, NormalizedRegion::FULL)];
        service.request_view(2, PageAddress::Full(1), &slots, TARGET);

        let updates = drain(&mut service);
        assert!(matches!(
            updates.as_slice(),
            [ViewUpdate::Unavailable { page: 1, slot: 0, .. }]
        ));
    }

    #[test]
    fn generations_increase() {
        let source = Arc::new(StripedPageSource::new(2, 100, 200, 4));
        let mut service = RenderService::new(source);
        let a = service.request_view(0, PageAddress::Full(0), &[], TARGET);
        let b = service.request_view(0, PageAddress::Full(0), &[], TARGET);
        assert!(b.generation > a.generation);
        assert_eq!(service.current_ticket(), Some(b));
        assert!(service.is_view_complete());
    }
}
