//! Render worker - runs in separate thread(s)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::debug;

use super::cache::{CacheKey, RenderCache};
use super::renderer::{RegionRenderer, RenderedImage, TargetSize};
use super::request::{RenderRequest, RenderResponse, SlotSpec, WorkerFault};
use crate::page_source::PageSource;

/// Everything a worker thread shares with the service
pub struct WorkerContext {
    pub source: Arc<dyn PageSource>,
    pub renderer: RegionRenderer,
    pub cache: Arc<Mutex<RenderCache>>,
    /// Newest generation the service has published
    pub latest_generation: Arc<AtomicU64>,
}

pub fn render_worker(
    ctx: WorkerContext,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    for request in requests {
        if let Some(generation) = request.generation() {
            if generation < ctx.latest_generation.load(Ordering::Acquire) {
                if let RenderRequest::Slot { id, .. } | RenderRequest::Prefetch { id, .. } = request
                {
                    debug!("Skipping stale render request {id:?} (generation {generation})");
                    let _ = responses.send(RenderResponse::Cancelled(id));
                }
                continue;
            }
        }

        match request {
            RenderRequest::Slot {
                id,
                ticket,
                slot,
                spec,
                target,
            } => {
                let response = match render_cached(&ctx, &spec, target) {
                    Ok(image) => RenderResponse::Slot {
                        id,
                        ticket,
                        slot,
                        image,
                    },
                    Err(error) => RenderResponse::Error { id, error },
                };
                let _ = responses.send(response);
            }

            RenderRequest::Prefetch {
                id, spec, target, ..
            } => {
                let response = match render_cached(&ctx, &spec, target) {
                    Ok(_) => RenderResponse::Prefetched { id },
                    Err(error) => RenderResponse::Error { id, error },
                };
                let _ = responses.send(response);
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn render_cached(
    ctx: &WorkerContext,
    spec: &SlotSpec,
    target: TargetSize,
) -> Result<Arc<RenderedImage>, WorkerFault> {
    let key = CacheKey::new(spec, target);

    let cached = ctx
        .cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        return Ok(cached);
    }

    let image = ctx
        .renderer
        .render(ctx.source.as_ref(), spec.page, spec.region, spec.half, target)
        .ok_or(WorkerFault::Unavailable { page: spec.page })?;

    Ok(ctx
        .cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, image))
}
