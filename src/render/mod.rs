//! Rendering infrastructure: region renderer, worker pool and slot cache

mod cache;
mod renderer;
mod request;
mod service;
mod worker;

pub use cache::{CacheKey, RenderCache};
pub use renderer::{
    HalfSelector, NativeRect, RegionRenderer, RenderedImage, TargetSize, MIN_OVERSAMPLING,
};
pub use request::{RenderRequest, RenderResponse, RequestId, SlotSpec, ViewTicket, WorkerFault};
pub use service::{RenderService, ServiceConfig, ViewUpdate};

/// Default number of render worker threads
pub const DEFAULT_WORKERS: usize = 2;

/// Default number of rendered slots kept in memory
pub const DEFAULT_CACHE_SIZE: usize = 24;

/// Default number of positions prefetched on each side of the current one
pub const DEFAULT_PREFETCH_RADIUS: usize = 2;

/// Default raster oversampling relative to the display size
pub const DEFAULT_OVERSAMPLING: f32 = 2.0;
