//! The backend contract every rendering implementation satisfies.

use std::path::PathBuf;
use std::sync::Arc;

use harbor_config::{FontConfig, Theme};
use harbor_pty::TerminalId;

use crate::container::Container;

/// Discriminant for the two backend families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Cross-platform software emulator.
    Software,
    /// Out-of-process GPU surface (macOS only).
    NativeSurface,
}

/// Lifecycle status reported to host chrome through [`MountCallbacks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    /// Mount accepted; process/surface creation in progress.
    Creating,
    /// The terminal is live.
    Running,
    /// The process or surface is gone; carries the exit code when known.
    Exited(Option<i32>),
}

/// A position/size in native coordinate units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl FrameRect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Scale logical bounds into native units by the UI zoom factor.
    pub fn scaled(&self, zoom: f64) -> Self {
        Self {
            x: self.x * zoom,
            y: self.y * zoom,
            w: self.w * zoom,
            h: self.h * zoom,
        }
    }
}

/// Options carried into [`TerminalBackend::mount`].
#[derive(Debug, Clone)]
pub struct MountOptions {
    pub terminal_id: TerminalId,
    pub cwd: PathBuf,
    /// Shell override; `None` defers to the process manager's resolution.
    pub shell: Option<String>,
    pub font: FontConfig,
    pub theme: Theme,
    /// Scrollback buffer length in lines.
    pub scrollback: usize,
}

impl MountOptions {
    pub fn new(terminal_id: TerminalId, cwd: impl Into<PathBuf>) -> Self {
        Self {
            terminal_id,
            cwd: cwd.into(),
            shell: None,
            font: FontConfig::default(),
            theme: Theme::default(),
            scrollback: 10_000,
        }
    }
}

/// Callbacks a backend uses to drive host chrome.
#[derive(Clone)]
pub struct MountCallbacks {
    on_status_change: Arc<dyn Fn(BackendStatus) + Send + Sync>,
}

impl MountCallbacks {
    pub fn new<F>(on_status_change: F) -> Self
    where
        F: Fn(BackendStatus) + Send + Sync + 'static,
    {
        Self {
            on_status_change: Arc::new(on_status_change),
        }
    }

    /// Callbacks that discard every notification.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn status_changed(&self, status: BackendStatus) {
        (self.on_status_change)(status);
    }
}

/// The interface the host UI consumes for every mounted terminal tab.
///
/// `mount` takes ownership of a [`Container`] and begins rendering.
/// `set_visible(false)` must stop painting and consuming focus without
/// tearing down the process or internal state. `dispose` releases every
/// resource the backend holds and leaves the instance permanently inert;
/// it must never implicitly destroy the terminal's process.
pub trait TerminalBackend: Send {
    fn kind(&self) -> BackendKind;

    /// Capability flag the host UI adapts to (e.g. hiding the search bar).
    fn supports_search(&self) -> bool {
        false
    }

    fn mount(
        &mut self,
        container: Container,
        opts: MountOptions,
        callbacks: MountCallbacks,
    ) -> anyhow::Result<()>;

    /// Forward raw bytes to the terminal. Backends that own their input
    /// loop end-to-end leave this as the default no-op.
    fn write(&mut self, _data: &[u8]) {}

    fn resize(&mut self, cols: u16, rows: u16);

    fn focus(&mut self);

    /// Clear the screen. Default no-op for backends that cannot inject
    /// control sequences.
    fn clear(&mut self) {}

    fn set_visible(&mut self, _visible: bool) {}

    fn update_theme(&mut self, _theme: &Theme) {}

    fn search_find_next(&mut self, _query: &str) {}
    fn search_find_previous(&mut self, _query: &str) {}
    fn search_close(&mut self) {}

    fn dispose(&mut self);
}
