//! The hosting container a backend mounts into.
//!
//! Stands in for the UI element that owns a terminal's screen area. The
//! registry creates one per terminal tab; the host UI drives its bounds and
//! zoom factor, and backends observe both. Native backends additionally set
//! the input-passthrough flag so the GPU surface behind the window shows
//! through a hole the container leaves unpainted.

use std::sync::Arc;
use std::sync::Weak;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::contract::FrameRect;

/// Marker trait for a host-supplied accelerated paint path. The software
/// backend probes for one at mount and silently falls back to snapshot
/// painting when acquisition fails.
pub trait AcceleratedPainter: Send + Sync {}

type PainterFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn AcceleratedPainter>> + Send + Sync>;
type BoundsCallback = Arc<dyn Fn(FrameRect) + Send + Sync>;

struct ContainerInner {
    bounds: Mutex<FrameRect>,
    zoom: Mutex<f64>,
    passthrough: AtomicBool,
    cleared: AtomicBool,
    observers: Mutex<Vec<(u64, BoundsCallback)>>,
    next_token: AtomicU64,
    painter_factory: Mutex<Option<PainterFactory>>,
}

/// Cheap-clone handle to one hosting element.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub fn new(bounds: FrameRect) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                bounds: Mutex::new(bounds),
                zoom: Mutex::new(1.0),
                passthrough: AtomicBool::new(false),
                cleared: AtomicBool::new(false),
                observers: Mutex::new(Vec::new()),
                next_token: AtomicU64::new(1),
                painter_factory: Mutex::new(None),
            }),
        }
    }

    /// Current bounds in logical units.
    pub fn bounds(&self) -> FrameRect {
        *self.inner.bounds.lock()
    }

    /// Update bounds and notify every observer. Called by the host UI on
    /// layout changes.
    pub fn set_bounds(&self, bounds: FrameRect) {
        *self.inner.bounds.lock() = bounds;
        self.notify(bounds);
    }

    /// The UI zoom factor, read live. Never cache this across a frame
    /// computation or native coordinates end up double-scaled.
    pub fn zoom_factor(&self) -> f64 {
        *self.inner.zoom.lock()
    }

    /// Update the zoom factor and notify observers (a zoom change moves the
    /// on-screen rect just like a layout change does).
    pub fn set_zoom_factor(&self, zoom: f64) {
        *self.inner.zoom.lock() = zoom;
        self.notify(self.bounds());
    }

    /// Whether input events pass through this container to whatever is
    /// stacked behind it.
    pub fn is_passthrough(&self) -> bool {
        self.inner.passthrough.load(Ordering::SeqCst)
    }

    pub fn set_passthrough(&self, passthrough: bool) {
        self.inner.passthrough.store(passthrough, Ordering::SeqCst);
    }

    /// Drop any painted content. The native backend calls this at mount so
    /// the container contributes nothing but its transparent hole.
    pub fn clear_content(&self) {
        self.inner.cleared.store(true, Ordering::SeqCst);
    }

    pub fn is_cleared(&self) -> bool {
        self.inner.cleared.load(Ordering::SeqCst)
    }

    /// Register a bounds/zoom observer; disconnects when the returned guard
    /// drops.
    pub fn observe_bounds<F>(&self, callback: F) -> BoundsObserver
    where
        F: Fn(FrameRect) + Send + Sync + 'static,
    {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .lock()
            .push((token, Arc::new(callback)));
        BoundsObserver {
            inner: Arc::downgrade(&self.inner),
            token,
        }
    }

    /// Install the host's accelerated paint factory. Absent a factory,
    /// acquisition fails and software painting is used.
    pub fn install_painter_factory<F>(&self, factory: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn AcceleratedPainter>> + Send + Sync + 'static,
    {
        *self.inner.painter_factory.lock() = Some(Arc::new(factory));
    }

    pub fn acquire_accelerated_painter(&self) -> anyhow::Result<Arc<dyn AcceleratedPainter>> {
        let factory = self.inner.painter_factory.lock().clone();
        match factory {
            Some(factory) => factory(),
            None => anyhow::bail!("no accelerated paint path available"),
        }
    }

    fn notify(&self, bounds: FrameRect) {
        let observers: Vec<BoundsCallback> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for cb in &observers {
            cb(bounds);
        }
    }
}

/// RAII guard for a bounds observer; disconnects on drop.
pub struct BoundsObserver {
    inner: Weak<ContainerInner>,
    token: u64,
}

impl Drop for BoundsObserver {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .observers
                .lock()
                .retain(|(token, _)| *token != self.token);
        }
    }
}
