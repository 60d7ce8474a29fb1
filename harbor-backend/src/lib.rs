//! Rendering backend contract and software terminal backend.
//!
//! Every terminal tab is rendered by exactly one [`TerminalBackend`]
//! implementation. Two structurally different backends exist behind the one
//! trait: the cross-platform software emulator in this crate (built on
//! `alacritty_terminal`, wired to the process manager's byte stream), and
//! the native GPU surface backend in `harbor-surface`. The trait uses a
//! `kind()` discriminant plus defaulted optional methods rather than forcing
//! both backends to implement every operation.

pub mod container;
pub mod contract;
pub mod software;

pub use container::{AcceleratedPainter, BoundsObserver, Container};
pub use contract::{
    BackendKind, BackendStatus, FrameRect, MountCallbacks, MountOptions, TerminalBackend,
};
pub use software::SoftwareTerminalBackend;
