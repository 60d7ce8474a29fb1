//! harbor-term: the terminal subsystem of a worktree workbench.
//!
//! Four concerns, four crates, one facade:
//!
//! - `harbor-pty`: explicitly owned PTY process manager keyed by terminal id
//! - `harbor-backend`: the rendering backend contract plus the
//!   cross-platform software emulator backend
//! - `harbor-surface`: the native GPU surface backend and the bridge that
//!   keeps out-of-process surfaces pixel-aligned with their containers
//! - `harbor-config`: shells, fonts, themes, backend preference
//!
//! This crate adds what sits above the backends: the instance registry that
//! keeps terminals mounted for the life of their work context, working
//! directory resolution, and file-based debug logging.

pub mod debug;
pub mod registry;
pub mod workdir;

pub use harbor_backend::{
    BackendKind, BackendStatus, Container, FrameRect, MountCallbacks, MountOptions,
    SoftwareTerminalBackend, TerminalBackend,
};
pub use harbor_config::{BackendPreference, Config, Theme};
pub use harbor_pty::{CreateOptions, ExitEvent, PtyError, PtyProcessManager, TerminalId};
pub use harbor_surface::{
    native_surface_supported, NativeSurfaceBackend, SurfaceBridge, SurfaceEvent, SurfaceEventSink,
    SurfaceHost, PARKED_RECT,
};
pub use registry::{BackendFactory, SessionRecord, TerminalInstanceRegistry};
pub use workdir::{ContextId, WorkContext};
