//! PTY spawning and per-process I/O threads.
//!
//! Each spawned shell gets a reader thread that pumps raw PTY output into a
//! crossbeam channel, and a dispatch thread (owned by the manager) that
//! drains the channel in order. Keeping the blocking `read()` on its own
//! thread means a slow listener can never stall the kernel-side PTY buffer.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use std::sync::Arc;

use crate::PtyError;

/// Raw events flowing from the reader thread to the dispatch thread.
pub(crate) enum PtyEvent {
    /// A chunk of PTY output, in read order.
    Output(Vec<u8>),
    /// The reader hit EOF or an unrecoverable error; the process is gone
    /// or going.
    Eof,
}

/// One live shell process plus the handles needed to drive it.
pub(crate) struct PtyProcess {
    master: Mutex<Box<dyn MasterPty + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
    pub(crate) child: Arc<Mutex<Box<dyn Child + Send + Sync>>>,
    pub(crate) dims: Mutex<(u16, u16)>,
    /// Reader thread handle; the thread exits on EOF once the child dies.
    _reader_thread: JoinHandle<()>,
}

impl PtyProcess {
    /// Spawn `shell` in a fresh PTY at `cwd` with the given grid size.
    ///
    /// The caller env is merged onto the host environment, and the
    /// terminal-capability variables are force-set last so a caller cannot
    /// accidentally downgrade them.
    pub(crate) fn spawn(
        shell: &str,
        cwd: &Path,
        cols: u16,
        rows: u16,
        env: &HashMap<String, String>,
    ) -> Result<(Self, Receiver<PtyEvent>), PtyError> {
        let pty_system = native_pty_system();

        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = pty_system
            .openpty(size)
            .map_err(|e| PtyError::OpenPty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.cwd(cwd);
        for (key, value) in env {
            cmd.env(key, value);
        }
        // Force terminal-capability variables regardless of caller env.
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");

        let child = pair.slave.spawn_command(cmd).map_err(|e| PtyError::Spawn {
            shell: shell.to_string(),
            reason: e.to_string(),
        })?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Io(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Io(e.to_string()))?;

        let (event_tx, event_rx): (Sender<PtyEvent>, Receiver<PtyEvent>) = unbounded();

        let reader_thread = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if event_tx.send(PtyEvent::Output(buf[..n].to_vec())).is_err() {
                            // Dispatch side is gone; nothing left to feed.
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("pty read ended: {e}");
                        break;
                    }
                }
            }
            let _ = event_tx.send(PtyEvent::Eof);
        });

        Ok((
            Self {
                master: Mutex::new(pair.master),
                writer: Mutex::new(writer),
                child: Arc::new(Mutex::new(child)),
                dims: Mutex::new((cols, rows)),
                _reader_thread: reader_thread,
            },
            event_rx,
        ))
    }

    /// Current grid dimensions as (cols, rows).
    pub(crate) fn dimensions(&self) -> (u16, u16) {
        *self.dims.lock()
    }

    /// Write bytes to the shell's stdin.
    pub(crate) fn write(&self, data: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(data)?;
        writer.flush()
    }

    /// Resize the PTY grid.
    pub(crate) fn resize(&self, cols: u16, rows: u16) -> Result<(), String> {
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        self.master
            .lock()
            .resize(size)
            .map_err(|e| e.to_string())?;
        *self.dims.lock() = (cols, rows);
        Ok(())
    }

    /// Kill the child process. Errors are the caller's to swallow.
    pub(crate) fn kill(&self) -> std::io::Result<()> {
        self.child.lock().kill()
    }
}

impl Drop for PtyProcess {
    fn drop(&mut self) {
        // Ensure the reader thread hits EOF even if the caller forgot to
        // destroy the process explicitly.
        let _ = self.child.lock().kill();
    }
}
