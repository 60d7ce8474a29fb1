//! Platform-specific surface hosts.

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "macos")]
pub use macos::AppKitSurfaceHost;

/// Whether this build can host native surfaces at all. Hosts on other
/// platforms keep every terminal on the software backend.
pub fn native_surface_supported() -> bool {
    cfg!(target_os = "macos")
}
