//! The native surface rendering backend.
//!
//! Mounting does not spawn a process through the manager: a native surface
//! runs its own shell and emulation out of process, and this backend's job
//! is keeping that surface pixel-aligned with its container and relaying
//! focus and visibility. The container is cleared and set to passthrough at
//! mount, leaving a transparent hole the surface shows through.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use harbor_backend::{
    BackendKind, BackendStatus, Container, FrameRect, MountCallbacks, MountOptions,
    TerminalBackend,
};
use harbor_pty::TerminalId;

use crate::bridge::{SurfaceBridge, SurfaceOptions};
use crate::frame::FrameSync;

/// Off-screen rect used to hide a surface without destroying it. Parking
/// keeps the shell, scrollback, and GPU state alive across tab switches.
pub const PARKED_RECT: FrameRect = FrameRect::new(-10000.0, -10000.0, 1.0, 1.0);

struct NativeMounted {
    terminal_id: TerminalId,
    container: Container,
    frame_sync: Arc<FrameSync>,
    /// Shared with the bounds observer so layout changes while parked do
    /// not drag the surface back on-screen.
    visible: Arc<AtomicBool>,
    _bounds_observer: harbor_backend::BoundsObserver,
}

/// Backend that projects an out-of-process GPU surface into a container.
pub struct NativeSurfaceBackend {
    bridge: Arc<SurfaceBridge>,
    runtime: tokio::runtime::Handle,
    content_scale: f64,
    mounted: Option<NativeMounted>,
    /// Cleared on dispose so in-flight mount continuations become no-ops
    /// instead of resurrecting a dead tab.
    live: Arc<AtomicBool>,
}

impl NativeSurfaceBackend {
    pub fn new(bridge: Arc<SurfaceBridge>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            bridge,
            runtime,
            content_scale: 1.0,
            mounted: None,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Update the backing scale factor (display change, window moved to
    /// another screen). Pushed through to the live surface when mounted.
    pub fn set_content_scale(&mut self, scale: f64) {
        self.content_scale = scale;
        if let Some(mounted) = self.mounted.as_ref() {
            if let Err(e) = self.bridge.set_content_scale(&mounted.terminal_id, scale) {
                log::debug!("{}: content scale update failed: {e}", mounted.terminal_id);
            }
        }
    }

    /// The container rect scaled into native units by the live zoom factor.
    fn native_rect(container: &Container) -> FrameRect {
        container.bounds().scaled(container.zoom_factor())
    }
}

impl TerminalBackend for NativeSurfaceBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeSurface
    }

    fn mount(
        &mut self,
        container: Container,
        opts: MountOptions,
        callbacks: MountCallbacks,
    ) -> anyhow::Result<()> {
        if self.mounted.is_some() {
            anyhow::bail!("backend already mounted for {}", opts.terminal_id);
        }
        if !self.live.load(Ordering::SeqCst) {
            anyhow::bail!("backend for {} was disposed", opts.terminal_id);
        }

        callbacks.status_changed(BackendStatus::Creating);

        // The container contributes nothing but a transparent hole; input
        // falls through to the surface stacked behind the window.
        container.clear_content();
        container.set_passthrough(true);

        let sync_bridge = Arc::clone(&self.bridge);
        let sync_id = opts.terminal_id.clone();
        let frame_sync = Arc::new(FrameSync::new(self.runtime.clone(), move |rect| {
            if let Err(e) = sync_bridge.set_frame(&sync_id, rect) {
                log::debug!("{sync_id}: frame sync dropped: {e}");
            }
        }));

        let mount_bridge = Arc::clone(&self.bridge);
        let mount_container = container.clone();
        let mount_live = Arc::clone(&self.live);
        let mount_callbacks = callbacks.clone();
        let surface_opts = SurfaceOptions {
            terminal_id: opts.terminal_id.clone(),
            cwd: opts.cwd.clone(),
            shell: opts.shell.clone(),
            frame: Self::native_rect(&container),
            content_scale: self.content_scale,
            font: opts.font.clone(),
        };
        self.runtime.spawn(async move {
            let id = surface_opts.terminal_id.clone();
            // Zoom may have changed between mount() and this continuation;
            // recompute so the first frame is already correct.
            let mut surface_opts = surface_opts;
            surface_opts.frame = Self::native_rect(&mount_container);

            match mount_bridge.create_surface(&surface_opts) {
                Ok(_) => {
                    if !mount_live.load(Ordering::SeqCst) {
                        // Disposed mid-flight; undo the creation.
                        mount_bridge.destroy_surface(&id);
                        return;
                    }
                    if let Err(e) = mount_bridge.set_focus(&id, true) {
                        log::debug!("{id}: initial focus failed: {e}");
                    }
                    mount_callbacks.status_changed(BackendStatus::Running);
                }
                Err(e) => {
                    log::warn!("{id}: surface creation failed: {e}");
                    if mount_live.load(Ordering::SeqCst) {
                        mount_callbacks.status_changed(BackendStatus::Exited(None));
                    }
                }
            }
        });

        let visible = Arc::new(AtomicBool::new(true));
        let observe_sync = Arc::clone(&frame_sync);
        let observe_container = container.clone();
        let observe_live = Arc::clone(&self.live);
        let observe_visible = Arc::clone(&visible);
        let bounds_observer = container.observe_bounds(move |rect| {
            if !observe_live.load(Ordering::SeqCst) || !observe_visible.load(Ordering::SeqCst) {
                return;
            }
            observe_sync.request(rect.scaled(observe_container.zoom_factor()));
        });

        self.mounted = Some(NativeMounted {
            terminal_id: opts.terminal_id,
            container,
            frame_sync,
            visible,
            _bounds_observer: bounds_observer,
        });
        Ok(())
    }

    /// Surface geometry is rect-driven and the surface computes its own
    /// grid from the frame, so a column/row hint only means the layout
    /// moved. Forward it as a frame resync with the current rect.
    fn resize(&mut self, _cols: u16, _rows: u16) {
        if let Some(mounted) = self.mounted.as_ref() {
            if mounted.visible.load(Ordering::SeqCst) {
                mounted
                    .frame_sync
                    .request(Self::native_rect(&mounted.container));
            }
        }
    }

    fn focus(&mut self) {
        if let Some(mounted) = self.mounted.as_ref() {
            if let Err(e) = self.bridge.set_focus(&mounted.terminal_id, true) {
                log::debug!("{}: focus failed: {e}", mounted.terminal_id);
            }
        }
    }

    fn set_visible(&mut self, visible: bool) {
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if mounted.visible.load(Ordering::SeqCst) == visible {
            return;
        }
        mounted.visible.store(visible, Ordering::SeqCst);

        // Parking must not race queued frame updates, so both directions
        // bypass the coalescer.
        if visible {
            let rect = Self::native_rect(&mounted.container);
            mounted.frame_sync.apply_now(rect);
        } else {
            mounted.frame_sync.apply_now(PARKED_RECT);
        }
        if let Err(e) = self.bridge.set_focus(&mounted.terminal_id, visible) {
            log::debug!("{}: focus change failed: {e}", mounted.terminal_id);
        }
    }

    fn dispose(&mut self) {
        self.live.store(false, Ordering::SeqCst);
        let Some(mounted) = self.mounted.take() else {
            return;
        };
        log::debug!("{}: native backend disposed", mounted.terminal_id);
        mounted.frame_sync.cancel();
        mounted.container.set_passthrough(false);
        // The surface owns its shell; tearing it down ends that process.
        self.bridge.destroy_surface(&mounted.terminal_id);
    }
}

impl Drop for NativeSurfaceBackend {
    fn drop(&mut self) {
        if self.mounted.is_some() {
            self.dispose();
        }
    }
}
