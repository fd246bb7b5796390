//! Output surface readiness
//!
//! Tracks whether a renderable surface exists, independent of engine state.
//! The coordinator consults it before starting preview.

use crate::engine::SurfaceSize;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Default)]
struct SurfaceState {
    ready: bool,
    size: Option<SurfaceSize>,
}

/// Shared view of the preview surface
#[derive(Debug, Clone, Default)]
pub struct SurfaceReadinessTracker {
    state: Arc<RwLock<SurfaceState>>,
}

impl SurfaceReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_surface_created(&self) {
        tracing::debug!("Surface created");
        self.state.write().ready = true;
    }

    /// Record new dimensions. Returns the size to forward to the engine, or
    /// `None` when there is no surface to apply it to.
    pub fn on_surface_changed(&self, width: u32, height: u32) -> Option<SurfaceSize> {
        let mut state = self.state.write();
        let size = SurfaceSize { width, height };
        state.size = Some(size);
        tracing::debug!("Surface changed: {}x{}", width, height);
        state.ready.then_some(size)
    }

    /// Mark the surface gone.
    ///
    /// `stop_preview` is awaited first, and readiness only drops once it has
    /// finished, so the engine never renders to a surface that no longer
    /// exists.
    pub async fn on_surface_destroyed<F, Fut>(&self, stop_preview: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        tracing::debug!("Surface destroyed");
        stop_preview().await;
        let mut state = self.state.write();
        state.ready = false;
        state.size = None;
    }

    pub fn is_ready(&self) -> bool {
        self.state.read().ready
    }

    /// Current dimensions, if the surface has reported any
    pub fn size(&self) -> Option<SurfaceSize> {
        self.state.read().size
    }
}
