//! Render request and response types

use std::sync::Arc;

use super::renderer::{HalfSelector, RenderedImage, TargetSize};
use crate::navigation::PageAddress;
use crate::region::NormalizedRegion;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Identifies the view a render belongs to.
///
/// The generation grows every time anything that affects pixels changes,
/// so a ticket equal to the current one means the result is still wanted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewTicket {
    pub generation: u64,
    pub position: usize,
    pub address: PageAddress,
}

/// One image of a view: a page, its crop and optionally a half of it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotSpec {
    pub page: usize,
    pub region: NormalizedRegion,
    pub half: Option<HalfSelector>,
}

impl SlotSpec {
    #[must_use]
    pub fn full(page: usize, region: NormalizedRegion) -> Self {
        Self {
            page,
            region,
            half: None,
        }
    }

    #[must_use]
    pub fn half(page: usize, region: NormalizedRegion, half: HalfSelector) -> Self {
        Self {
            page,
            region,
            half: Some(half),
        }
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render one slot of the visible view (high priority)
    Slot {
        id: RequestId,
        ticket: ViewTicket,
        slot: usize,
        spec: SlotSpec,
        target: TargetSize,
    },

    /// Warm the cache for a nearby view
    Prefetch {
        id: RequestId,
        generation: u64,
        spec: SlotSpec,
        target: TargetSize,
    },

    /// Shutdown the worker
    Shutdown,
}

impl RenderRequest {
    /// Generation the request was issued under
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Slot { ticket, .. } => Some(ticket.generation),
            Self::Prefetch { generation, .. } => Some(*generation),
            Self::Shutdown => None,
        }
    }
}

/// Errors from render workers
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("page {page} could not be rendered")]
    Unavailable { page: usize },
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered slot of a view
    Slot {
        id: RequestId,
        ticket: ViewTicket,
        slot: usize,
        image: Arc<RenderedImage>,
    },

    /// A prefetched slot landed in the cache
    Prefetched { id: RequestId },

    /// Request was skipped because a newer view superseded it
    Cancelled(RequestId),

    /// Error during rendering
    Error { id: RequestId, error: WorkerFault },
}
