//! Native GPU surface backend for harbor-term.
//!
//! A native surface is an out-of-process terminal renderer (shell, emulation
//! and drawing all live outside the host). This crate keeps such surfaces
//! pixel-aligned with their hosting containers: the [`SurfaceBridge`] maps
//! terminal ids to surfaces behind a platform-neutral [`SurfaceHost`], the
//! [`NativeSurfaceBackend`] implements the rendering-backend contract on top
//! of it, and [`FrameSync`] coalesces geometry updates so drags and resizes
//! push only the frames that matter. Hiding a terminal parks its surface
//! off-screen at [`PARKED_RECT`] rather than destroying it, so shell state
//! survives tab switches.
//!
//! Only macOS has a real [`SurfaceHost`]; other platforms report
//! `native_surface_supported() == false` and stay on the software backend.

mod backend;
mod bridge;
mod events;
mod frame;
mod platform;

pub use backend::{NativeSurfaceBackend, PARKED_RECT};
pub use bridge::{SurfaceBridge, SurfaceError, SurfaceHandle, SurfaceHost, SurfaceOptions};
pub use events::{NullEventSink, SurfaceEvent, SurfaceEventSink};
pub use frame::FrameSync;
pub use platform::native_surface_supported;

#[cfg(target_os = "macos")]
pub use platform::AppKitSurfaceHost;
