//! Events a native surface reports back to the host.

use std::path::PathBuf;

use harbor_pty::TerminalId;

/// Out-of-band notifications from a running surface. The surface owns its
/// own shell and emulation, so these are the only signals that cross back
/// into the host process.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// The shell retitled the terminal (OSC 0/2).
    TitleChanged(String),
    /// The shell reported a new working directory (OSC 7).
    WorkingDirectoryChanged(PathBuf),
    /// BEL received.
    Bell,
    /// Font metrics changed (font size change, display switch); carries the
    /// new cell size in logical pixels.
    CellSizeChanged { width: f64, height: f64 },
    /// A hyperlink in the surface was activated; the host decides how to
    /// open it.
    OpenUrl(String),
    /// The surface's process ended or the surface asked to be closed.
    CloseRequested,
}

/// Receiver for [`SurfaceEvent`]s, implemented by the host UI.
pub trait SurfaceEventSink: Send + Sync {
    fn on_event(&self, id: &TerminalId, event: SurfaceEvent);
}

/// Sink that drops everything; useful as a default and in tests.
pub struct NullEventSink;

impl SurfaceEventSink for NullEventSink {
    fn on_event(&self, id: &TerminalId, event: SurfaceEvent) {
        log::trace!("{id}: unhandled surface event {event:?}");
    }
}
