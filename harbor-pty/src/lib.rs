//! Pseudo-terminal process manager for harbor-term.
//!
//! This crate owns every shell process the terminal subsystem spawns. The
//! manager is an explicitly owned, injectable registry keyed by
//! [`TerminalId`]; there is no hidden global. Rendering backends address
//! processes purely by id and receive output through broadcast data
//! listeners, so a process can outlive any particular backend instance.
//!
//! # Example
//!
//! ```no_run
//! use harbor_pty::{CreateOptions, PtyProcessManager, TerminalId};
//!
//! let manager = PtyProcessManager::new();
//! let id = TerminalId::random();
//! let (cols, rows) = manager
//!     .create(&id, CreateOptions::new("/tmp"))
//!     .expect("spawn shell");
//! assert_eq!((cols, rows), (80, 24));
//!
//! let _sub = manager.on_data(&id, |bytes| {
//!     // feed an emulator, log, etc.
//!     let _ = bytes;
//! });
//! manager.write(&id, b"echo hi\n");
//! manager.destroy(&id);
//! ```

mod manager;
mod process;

pub use manager::{
    CreateOptions, DataSubscription, ExitEvent, ExitSubscription, PtyProcessManager,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced by the process manager.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    /// The platform PTY could not be opened.
    #[error("failed to open pty: {0}")]
    OpenPty(String),

    /// The shell process could not be spawned.
    #[error("failed to spawn '{shell}': {reason}")]
    Spawn { shell: String, reason: String },

    /// The PTY reader or writer could not be set up.
    #[error("failed to wire pty i/o: {0}")]
    Io(String),
}

/// Stable logical key for one open terminal tab.
///
/// Independent of the OS process id: the same `TerminalId` addresses the
/// process manager, backend instances, and the surface bridge uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalId(String);

impl TerminalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TerminalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
