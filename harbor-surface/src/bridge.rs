//! Bridge between terminal ids and out-of-process native surfaces.
//!
//! The bridge owns the id-to-surface map and funnels every geometry and
//! focus change through one place so surfaces stay pixel-aligned with their
//! hosting containers. Platform specifics live behind [`SurfaceHost`]; the
//! bridge itself is platform-neutral and fully testable with a mock host.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use harbor_backend::FrameRect;
use harbor_config::FontConfig;
use harbor_pty::TerminalId;

use crate::events::{SurfaceEvent, SurfaceEventSink};

/// Opaque per-surface token minted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Parameters for creating one surface.
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub terminal_id: TerminalId,
    pub cwd: PathBuf,
    /// Shell override; `None` lets the surface runtime resolve one.
    pub shell: Option<String>,
    pub frame: FrameRect,
    /// Backing scale factor of the target display.
    pub content_scale: f64,
    pub font: FontConfig,
}

/// Errors from surface plumbing.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface runtime failed to initialize: {0}")]
    RuntimeInit(String),

    #[error("no surface for terminal {0}")]
    UnknownTerminal(TerminalId),

    #[error("surface host error: {0}")]
    Host(String),
}

/// Platform layer the bridge drives. One implementation exists per platform
/// that can embed surfaces; tests substitute a recording mock.
pub trait SurfaceHost: Send + Sync {
    /// Bring up the surface runtime. Called at most once per bridge; the
    /// bridge caches failure, so an implementation may assume a cold start.
    fn init_runtime(&self) -> Result<(), SurfaceError>;

    fn create_surface(&self, opts: &SurfaceOptions) -> Result<SurfaceHandle, SurfaceError>;

    fn set_frame(&self, handle: SurfaceHandle, frame: FrameRect) -> Result<(), SurfaceError>;

    fn set_content_scale(&self, handle: SurfaceHandle, scale: f64) -> Result<(), SurfaceError>;

    fn set_focus(&self, handle: SurfaceHandle, focused: bool) -> Result<(), SurfaceError>;

    fn destroy_surface(&self, handle: SurfaceHandle) -> Result<(), SurfaceError>;
}

#[derive(Clone, Copy, PartialEq)]
enum RuntimeState {
    Cold,
    Ready,
    Failed,
}

struct SurfaceEntry {
    handle: SurfaceHandle,
    last_frame: FrameRect,
    last_scale: f64,
    focused: bool,
}

/// The id-keyed surface registry.
pub struct SurfaceBridge {
    host: Arc<dyn SurfaceHost>,
    sink: Arc<dyn SurfaceEventSink>,
    runtime: Mutex<RuntimeState>,
    entries: Mutex<HashMap<TerminalId, SurfaceEntry>>,
}

impl SurfaceBridge {
    pub fn new(host: Arc<dyn SurfaceHost>, sink: Arc<dyn SurfaceEventSink>) -> Self {
        Self {
            host,
            sink,
            runtime: Mutex::new(RuntimeState::Cold),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Initialize the surface runtime exactly once. A failed init is sticky:
    /// later calls fail fast instead of re-attempting a half-dead runtime.
    pub fn ensure_runtime(&self) -> Result<(), SurfaceError> {
        let mut state = self.runtime.lock();
        match *state {
            RuntimeState::Ready => Ok(()),
            RuntimeState::Failed => Err(SurfaceError::RuntimeInit(
                "previous initialization failed".to_string(),
            )),
            RuntimeState::Cold => match self.host.init_runtime() {
                Ok(()) => {
                    log::info!("surface runtime initialized");
                    *state = RuntimeState::Ready;
                    Ok(())
                }
                Err(e) => {
                    log::error!("surface runtime init failed: {e}");
                    *state = RuntimeState::Failed;
                    Err(e)
                }
            },
        }
    }

    /// Create a surface for `id`, or return the existing handle. Like the
    /// process manager, creation is idempotent per id.
    pub fn create_surface(&self, opts: &SurfaceOptions) -> Result<SurfaceHandle, SurfaceError> {
        self.ensure_runtime()?;

        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(&opts.terminal_id) {
            log::debug!("{}: surface already exists", opts.terminal_id);
            return Ok(entry.handle);
        }

        let handle = self.host.create_surface(opts)?;
        log::info!(
            "{}: surface {:?} created at {:?}",
            opts.terminal_id,
            handle,
            opts.frame
        );
        entries.insert(
            opts.terminal_id.clone(),
            SurfaceEntry {
                handle,
                last_frame: opts.frame,
                last_scale: opts.content_scale,
                focused: false,
            },
        );
        Ok(handle)
    }

    /// Move/resize the surface. Identical consecutive frames are dropped so
    /// layout passes that settle on the same rect cost nothing.
    pub fn set_frame(&self, id: &TerminalId, frame: FrameRect) -> Result<(), SurfaceError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SurfaceError::UnknownTerminal(id.clone()))?;
        if entry.last_frame == frame {
            return Ok(());
        }
        self.host.set_frame(entry.handle, frame)?;
        entry.last_frame = frame;
        Ok(())
    }

    /// Update the backing scale, deduped like frames.
    pub fn set_content_scale(&self, id: &TerminalId, scale: f64) -> Result<(), SurfaceError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SurfaceError::UnknownTerminal(id.clone()))?;
        if entry.last_scale == scale {
            return Ok(());
        }
        self.host.set_content_scale(entry.handle, scale)?;
        entry.last_scale = scale;
        Ok(())
    }

    pub fn set_focus(&self, id: &TerminalId, focused: bool) -> Result<(), SurfaceError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| SurfaceError::UnknownTerminal(id.clone()))?;
        if entry.focused == focused {
            return Ok(());
        }
        self.host.set_focus(entry.handle, focused)?;
        entry.focused = focused;
        Ok(())
    }

    /// Tear down the surface for `id`. Unknown ids are a no-op; destroy is
    /// called from cleanup paths that must not fail.
    pub fn destroy_surface(&self, id: &TerminalId) {
        let entry = self.entries.lock().remove(id);
        let Some(entry) = entry else {
            return;
        };
        log::info!("{id}: destroying surface {:?}", entry.handle);
        if let Err(e) = self.host.destroy_surface(entry.handle) {
            log::warn!("{id}: surface destroy failed: {e}");
        }
    }

    pub fn has_surface(&self, id: &TerminalId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Last frame pushed to the host for `id`.
    pub fn current_frame(&self, id: &TerminalId) -> Option<FrameRect> {
        self.entries.lock().get(id).map(|e| e.last_frame)
    }

    /// Route a host-originated event to the sink. Platform layers call this
    /// from their surface callbacks.
    pub fn deliver(&self, id: &TerminalId, event: SurfaceEvent) {
        if !self.has_surface(id) {
            log::debug!("{id}: dropping event for destroyed surface: {event:?}");
            return;
        }
        self.sink.on_event(id, event);
    }
}
