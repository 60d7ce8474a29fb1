//! Coalesced frame synchronization.
//!
//! Container bounds change many times per second during window drags and
//! pane resizes. Pushing every intermediate rect across the surface
//! boundary wastes work and makes the surface visually lag, so frame
//! updates are coalesced: at most one apply is in flight, and at most one
//! rect is pending behind it. Newer requests overwrite the pending slot, so
//! the surface always lands on the latest geometry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use harbor_backend::FrameRect;

type ApplyFn = Arc<dyn Fn(FrameRect) + Send + Sync>;

struct SyncState {
    pending: Mutex<Option<FrameRect>>,
    last_applied: Mutex<Option<FrameRect>>,
    in_flight: AtomicBool,
    cancelled: AtomicBool,
}

/// Per-surface frame update coalescer.
pub struct FrameSync {
    state: Arc<SyncState>,
    runtime: tokio::runtime::Handle,
    apply: ApplyFn,
}

impl FrameSync {
    pub fn new<F>(runtime: tokio::runtime::Handle, apply: F) -> Self
    where
        F: Fn(FrameRect) + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(SyncState {
                pending: Mutex::new(None),
                last_applied: Mutex::new(None),
                in_flight: AtomicBool::new(false),
                cancelled: AtomicBool::new(false),
            }),
            runtime,
            apply: Arc::new(apply),
        }
    }

    /// Request the surface be moved to `rect`. Returns immediately; the
    /// apply happens on the runtime.
    pub fn request(&self, rect: FrameRect) {
        if self.state.cancelled.load(Ordering::SeqCst) {
            return;
        }

        // Drop requests that match what was already applied, unless a
        // different rect is queued behind them.
        {
            let pending = self.state.pending.lock();
            if pending.is_none()
                && !self.state.in_flight.load(Ordering::SeqCst)
                && *self.state.last_applied.lock() == Some(rect)
            {
                return;
            }
        }

        *self.state.pending.lock() = Some(rect);
        self.kick();
    }

    /// Bypass coalescing: apply `rect` synchronously and record it, so a
    /// later `request` for the same rect dedupes against it. Used for
    /// parking, where ordering with respect to visibility changes matters.
    pub fn apply_now(&self, rect: FrameRect) {
        if self.state.cancelled.load(Ordering::SeqCst) {
            return;
        }
        *self.state.pending.lock() = None;
        (self.apply)(rect);
        *self.state.last_applied.lock() = Some(rect);
    }

    /// The rect most recently handed to the apply function.
    pub fn last_applied(&self) -> Option<FrameRect> {
        *self.state.last_applied.lock()
    }

    /// Stop applying frames permanently. Pending work is discarded.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        *self.state.pending.lock() = None;
    }

    fn kick(&self) {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            return;
        }
        let state = Arc::clone(&self.state);
        let apply = Arc::clone(&self.apply);
        self.runtime.spawn(async move {
            loop {
                let next = state.pending.lock().take();
                match next {
                    Some(rect) => {
                        if state.cancelled.load(Ordering::SeqCst) {
                            state.in_flight.store(false, Ordering::SeqCst);
                            return;
                        }
                        if *state.last_applied.lock() == Some(rect) {
                            continue;
                        }
                        apply(rect);
                        *state.last_applied.lock() = Some(rect);
                        // Let queued requests coalesce before the next apply.
                        tokio::task::yield_now().await;
                    }
                    None => {
                        state.in_flight.store(false, Ordering::SeqCst);
                        // A request may have slipped in after the take and
                        // seen in_flight still true; re-claim if so.
                        if state.pending.lock().is_some()
                            && !state.in_flight.swap(true, Ordering::SeqCst)
                        {
                            continue;
                        }
                        return;
                    }
                }
            }
        });
    }
}
