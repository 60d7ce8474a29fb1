//! The process manager: an id-keyed table of live shell processes.
//!
//! Per-id lifecycle is strictly `absent → create() → running → (destroy() |
//! spontaneous exit) → absent`; there are no other states. All mutation of a
//! process flows through the manager, so each id is single-writer by
//! construction.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::process::{PtyEvent, PtyProcess};
use crate::{PtyError, TerminalId};

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// How a process ended.
///
/// portable-pty folds a terminating signal into the exit code on Unix, so
/// `signal` is only populated when the platform layer surfaces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitEvent {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

/// Options for [`PtyProcessManager::create`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Working directory for the shell.
    pub cwd: PathBuf,
    /// Shell to spawn; `None` resolves `$SHELL` then `/bin/sh` (Windows:
    /// `COMSPEC` then `cmd.exe`).
    pub shell: Option<String>,
    /// Initial grid width; defaults to 80.
    pub cols: Option<u16>,
    /// Initial grid height; defaults to 24.
    pub rows: Option<u16>,
    /// Extra environment merged onto the host env.
    pub env: HashMap<String, String>,
}

impl CreateOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            shell: None,
            cols: None,
            rows: None,
            env: HashMap::new(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into());
        self
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = Some(cols);
        self.rows = Some(rows);
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

type DataCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;
type ExitCallback = Arc<dyn Fn(&ExitEvent) + Send + Sync>;

#[derive(Default)]
struct ListenerTable {
    data: Vec<(u64, DataCallback)>,
    exit: Vec<(u64, ExitCallback)>,
}

struct TrackedProcess {
    process: PtyProcess,
    /// Distinguishes incarnations of the same id across destroy/create
    /// cycles, so a stale dispatch thread never evicts a successor.
    generation: u64,
}

struct Shared {
    processes: Mutex<HashMap<TerminalId, TrackedProcess>>,
    listeners: Mutex<HashMap<TerminalId, ListenerTable>>,
    next_token: AtomicU64,
}

/// Explicitly owned registry of shell processes, keyed by [`TerminalId`].
///
/// Cheap to clone; clones share the same process table.
#[derive(Clone)]
pub struct PtyProcessManager {
    shared: Arc<Shared>,
}

impl Default for PtyProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PtyProcessManager {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                processes: Mutex::new(HashMap::new()),
                listeners: Mutex::new(HashMap::new()),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    /// Spawn a shell for `id`, or return the existing dimensions if one is
    /// already running; `create` never restarts a live process.
    pub fn create(
        &self,
        id: &TerminalId,
        options: CreateOptions,
    ) -> Result<(u16, u16), PtyError> {
        let mut processes = self.shared.processes.lock();

        if let Some(tracked) = processes.get(id) {
            let dims = tracked.process.dimensions();
            log::debug!("create({id}): process already running at {dims:?}");
            return Ok(dims);
        }

        let shell = options.shell.unwrap_or_else(default_shell);
        let cols = options.cols.unwrap_or(DEFAULT_COLS);
        let rows = options.rows.unwrap_or(DEFAULT_ROWS);

        log::info!(
            "create({id}): spawning '{shell}' in {} at {cols}x{rows}",
            options.cwd.display()
        );

        let (process, event_rx) =
            PtyProcess::spawn(&shell, &options.cwd, cols, rows, &options.env)?;

        let generation = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        let child = Arc::clone(&process.child);
        let weak = Arc::downgrade(&self.shared);
        let dispatch_id = id.clone();

        thread::spawn(move || {
            for event in event_rx {
                match event {
                    PtyEvent::Output(bytes) => {
                        let Some(shared) = weak.upgrade() else { break };
                        let callbacks: Vec<DataCallback> = shared
                            .listeners
                            .lock()
                            .get(&dispatch_id)
                            .map(|t| t.data.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                            .unwrap_or_default();
                        for cb in &callbacks {
                            cb(&bytes);
                        }
                    }
                    PtyEvent::Eof => {
                        let Some(shared) = weak.upgrade() else { break };
                        Self::handle_exit(&shared, &dispatch_id, generation, &child);
                        break;
                    }
                }
            }
        });

        processes.insert(
            id.clone(),
            TrackedProcess {
                process,
                generation,
            },
        );

        Ok((cols, rows))
    }

    /// Forward bytes to the shell's stdin. No-op if `id` is unknown.
    pub fn write(&self, id: &TerminalId, data: &[u8]) {
        let processes = self.shared.processes.lock();
        let Some(tracked) = processes.get(id) else {
            log::debug!("write({id}): no such process, dropping {} bytes", data.len());
            return;
        };
        if let Err(e) = tracked.process.write(data) {
            // Writes to a dying shell are routine; don't propagate.
            log::debug!("write({id}) failed: {e}");
        }
    }

    /// Forward a grid resize. Errors are logged and swallowed; resizing a
    /// dying process is routine.
    pub fn resize(&self, id: &TerminalId, cols: u16, rows: u16) {
        let processes = self.shared.processes.lock();
        let Some(tracked) = processes.get(id) else {
            log::debug!("resize({id}): no such process");
            return;
        };
        if let Err(e) = tracked.process.resize(cols, rows) {
            log::debug!("resize({id}) to {cols}x{rows} failed: {e}");
        }
    }

    /// Terminate the process for `id` and remove its bookkeeping.
    /// No-op if unknown; kill errors are swallowed.
    pub fn destroy(&self, id: &TerminalId) {
        let removed = self.shared.processes.lock().remove(id);
        match removed {
            Some(tracked) => {
                log::info!("destroy({id})");
                if let Err(e) = tracked.process.kill() {
                    log::debug!("destroy({id}): kill failed: {e}");
                }
            }
            None => log::debug!("destroy({id}): no such process"),
        }
    }

    /// Destroy every tracked process.
    pub fn destroy_all(&self) {
        let drained: Vec<(TerminalId, TrackedProcess)> =
            self.shared.processes.lock().drain().collect();
        log::info!("destroy_all: terminating {} process(es)", drained.len());
        for (id, tracked) in drained {
            if let Err(e) = tracked.process.kill() {
                log::debug!("destroy_all({id}): kill failed: {e}");
            }
        }
    }

    /// Whether a process exists for `id`.
    pub fn has(&self, id: &TerminalId) -> bool {
        self.shared.processes.lock().contains_key(id)
    }

    /// Ids of every tracked process.
    pub fn list(&self) -> Vec<TerminalId> {
        self.shared.processes.lock().keys().cloned().collect()
    }

    /// Register a broadcast listener for PTY output on `id`.
    ///
    /// Listeners may be registered before the process exists. Dropping the
    /// subscription unsubscribes; other listeners on the same id are
    /// unaffected. Within one id, callbacks observe bytes in read order.
    pub fn on_data<F>(&self, id: &TerminalId, callback: F) -> DataSubscription
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        self.shared
            .listeners
            .lock()
            .entry(id.clone())
            .or_default()
            .data
            .push((token, Arc::new(callback)));
        DataSubscription {
            shared: Arc::downgrade(&self.shared),
            id: id.clone(),
            token,
        }
    }

    /// Register a broadcast listener for process exit on `id`.
    ///
    /// Fires exactly once per process lifetime, whether the exit was
    /// requested via [`destroy`](Self::destroy) or spontaneous.
    pub fn on_exit<F>(&self, id: &TerminalId, callback: F) -> ExitSubscription
    where
        F: Fn(&ExitEvent) + Send + Sync + 'static,
    {
        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        self.shared
            .listeners
            .lock()
            .entry(id.clone())
            .or_default()
            .exit
            .push((token, Arc::new(callback)));
        ExitSubscription {
            shared: Arc::downgrade(&self.shared),
            id: id.clone(),
            token,
        }
    }

    /// Called from a dispatch thread when its process's reader hits EOF.
    fn handle_exit(
        shared: &Arc<Shared>,
        id: &TerminalId,
        generation: u64,
        child: &Arc<Mutex<Box<dyn portable_pty::Child + Send + Sync>>>,
    ) {
        // Evict our incarnation only; a destroy/create cycle may already
        // have installed a successor under the same id. When a successor
        // exists, the listener table belongs to it: consuming it here would
        // deliver a stale exit and strip the new process's subscriptions.
        {
            let mut processes = shared.processes.lock();
            match processes.get(id) {
                Some(tracked) if tracked.generation == generation => {
                    processes.remove(id);
                }
                Some(_) => {
                    let _ = wait_for_exit_code(child);
                    log::debug!("replaced process {id} exited; exit not delivered");
                    return;
                }
                None => {}
            }
        }

        let event = ExitEvent {
            code: wait_for_exit_code(child),
            signal: None,
        };
        log::info!("process {id} exited: {event:?}");

        // Take the exit listeners out of the table so the event cannot be
        // delivered twice; data listeners die with the table entry too.
        let callbacks: Vec<ExitCallback> = {
            let mut listeners = shared.listeners.lock();
            match listeners.remove(id) {
                Some(table) => table.exit.into_iter().map(|(_, cb)| cb).collect(),
                None => Vec::new(),
            }
        };
        for cb in &callbacks {
            cb(&event);
        }
    }
}

/// Poll the child briefly for its exit code after reader EOF. The wait
/// status usually lands within a scheduler tick of EOF; give it a little
/// longer before reporting an unknown code.
fn wait_for_exit_code(
    child: &Arc<Mutex<Box<dyn portable_pty::Child + Send + Sync>>>,
) -> Option<i32> {
    for _ in 0..100 {
        match child.lock().try_wait() {
            Ok(Some(status)) => return Some(status.exit_code() as i32),
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                log::debug!("try_wait failed after EOF: {e}");
                return None;
            }
        }
    }
    None
}

/// RAII handle for a data listener; unsubscribes on drop.
pub struct DataSubscription {
    shared: Weak<Shared>,
    id: TerminalId,
    token: u64,
}

impl Drop for DataSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            if let Some(table) = shared.listeners.lock().get_mut(&self.id) {
                table.data.retain(|(token, _)| *token != self.token);
            }
        }
    }
}

/// RAII handle for an exit listener; unsubscribes on drop.
pub struct ExitSubscription {
    shared: Weak<Shared>,
    id: TerminalId,
    token: u64,
}

impl Drop for ExitSubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            if let Some(table) = shared.listeners.lock().get_mut(&self.id) {
                table.exit.retain(|(token, _)| *token != self.token);
            }
        }
    }
}

/// Resolve the shell to spawn when the caller did not name one.
fn default_shell() -> String {
    #[cfg(unix)]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
    #[cfg(windows)]
    {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    }
}
