//! Terminal instance registry.
//!
//! Keeps every activated terminal's backend (and therefore its process)
//! mounted for the life of its owning work context, regardless of focus.
//! Focus and global suppression only toggle a visibility flag; instances
//! are removed solely on explicit close or confirmed context deletion. The
//! registry is explicitly owned and injectable; there is no hidden global.

pub mod suppression;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use harbor_backend::{
    BackendKind, BackendStatus, Container, MountCallbacks, MountOptions, TerminalBackend,
};
use harbor_config::{BackendPreference, Config};
use harbor_pty::{PtyProcessManager, TerminalId};

use crate::workdir::ContextId;
use suppression::SuppressionStack;

/// Builds backend instances of a requested kind. Injected so hosts (and
/// tests) control which concrete backends exist.
pub trait BackendFactory: Send {
    fn create(&self, kind: BackendKind) -> Box<dyn TerminalBackend>;
}

/// Receives status changes for every registered terminal.
pub type StatusSink = Arc<dyn Fn(&TerminalId, BackendStatus) + Send + Sync>;

/// One session row from the upstream session store.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub terminal_id: TerminalId,
    pub context: ContextId,
    pub cwd: PathBuf,
}

struct Instance {
    context: ContextId,
    cwd: PathBuf,
    container: Container,
    backend: Box<dyn TerminalBackend>,
    kind: BackendKind,
    visible: bool,
}

/// Map a configured preference onto what this build can actually run.
pub fn effective_backend_kind(pref: BackendPreference) -> BackendKind {
    match pref {
        BackendPreference::Software => BackendKind::Software,
        BackendPreference::NativeSurface => {
            if harbor_surface::native_surface_supported() {
                BackendKind::NativeSurface
            } else {
                log::info!("native surface unsupported on this platform, using software backend");
                BackendKind::Software
            }
        }
    }
}

pub struct TerminalInstanceRegistry {
    manager: PtyProcessManager,
    factory: Box<dyn BackendFactory>,
    config: Config,
    status_sink: StatusSink,
    instances: HashMap<TerminalId, Instance>,
    focused: Option<TerminalId>,
    suppression: SuppressionStack,
}

impl TerminalInstanceRegistry {
    pub fn new(
        manager: PtyProcessManager,
        factory: Box<dyn BackendFactory>,
        config: Config,
    ) -> Self {
        // Opt-in file logging; the registry is the subsystem's entry point.
        crate::debug::init_from_env();
        Self {
            manager,
            factory,
            config,
            status_sink: Arc::new(|_, _| {}),
            instances: HashMap::new(),
            focused: None,
            suppression: SuppressionStack::new(),
        }
    }

    /// Route status changes (creating/running/exited) to the host chrome.
    pub fn with_status_sink(mut self, sink: StatusSink) -> Self {
        self.status_sink = sink;
        self
    }

    /// Reconcile against the latest session snapshot. Only ever adds:
    /// sessions present upstream but not here get mounted, while instances
    /// missing from the snapshot stay untouched; the session store emits
    /// transient empty lists during refreshes, and identity is the terminal
    /// id, not presence in the latest snapshot.
    pub fn sync_sessions(
        &mut self,
        sessions: &[SessionRecord],
        container_for: &mut dyn FnMut(&TerminalId) -> Container,
    ) {
        for session in sessions {
            if self.instances.contains_key(&session.terminal_id) {
                continue;
            }
            let container = container_for(&session.terminal_id);
            let kind = effective_backend_kind(self.config.backend);
            self.activate(session, container, kind);
        }
        self.update_visibility();
    }

    fn activate(&mut self, session: &SessionRecord, container: Container, kind: BackendKind) {
        let id = session.terminal_id.clone();
        log::info!(
            "{id}: activating {kind:?} backend in {} (context {})",
            session.cwd.display(),
            session.context
        );

        let mut backend = self.factory.create(kind);
        let opts = self.mount_options(&id, &session.cwd);
        let sink = Arc::clone(&self.status_sink);
        let callback_id = id.clone();
        let callbacks = MountCallbacks::new(move |status| {
            sink(&callback_id, status);
        });

        if let Err(e) = backend.mount(container.clone(), opts, callbacks) {
            log::error!("{id}: mount failed: {e}");
            (self.status_sink)(&id, BackendStatus::Exited(None));
            return;
        }

        self.instances.insert(
            id,
            Instance {
                context: session.context.clone(),
                cwd: session.cwd.clone(),
                container,
                backend,
                kind,
                visible: false,
            },
        );
    }

    fn mount_options(&self, id: &TerminalId, cwd: &Path) -> MountOptions {
        let mut opts = MountOptions::new(id.clone(), cwd);
        opts.shell = self.config.shell.clone();
        opts.font = self.config.font.clone();
        opts.theme = self.config.load_theme();
        opts.scrollback = self.config.scrollback_lines;
        opts
    }

    pub fn is_mounted(&self, id: &TerminalId) -> bool {
        self.instances.contains_key(id)
    }

    pub fn mounted_count(&self) -> usize {
        self.instances.len()
    }

    pub fn terminal_ids(&self) -> Vec<TerminalId> {
        let mut ids: Vec<TerminalId> = self.instances.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn backend_kind(&self, id: &TerminalId) -> Option<BackendKind> {
        self.instances.get(id).map(|i| i.kind)
    }

    pub fn is_visible(&self, id: &TerminalId) -> bool {
        self.instances.get(id).is_some_and(|i| i.visible)
    }

    /// Change which terminal the focused tab shows.
    pub fn set_focused(&mut self, id: Option<TerminalId>) {
        if self.focused != id {
            self.focused = id;
            self.update_visibility();
        }
    }

    /// Hold a named visibility suppression (overlay, modal, drag).
    pub fn hold_suppression(&mut self, reason: impl Into<String>) {
        self.suppression.hold(reason);
        self.update_visibility();
    }

    pub fn release_suppression(&mut self, reason: &str) {
        self.suppression.release(reason);
        self.update_visibility();
    }

    /// Visible iff focused AND the suppression stack is empty; never
    /// mounts or unmounts anything.
    fn update_visibility(&mut self) {
        let allow = self.suppression.is_empty();
        for (id, instance) in self.instances.iter_mut() {
            let visible = allow && self.focused.as_ref() == Some(id);
            if instance.visible != visible {
                instance.visible = visible;
                instance.backend.set_visible(visible);
                if visible {
                    instance.backend.focus();
                }
            }
        }
    }

    /// Explicit per-id close: dispose the backend and destroy the process.
    pub fn close(&mut self, id: &TerminalId) {
        let Some(mut instance) = self.instances.remove(id) else {
            log::debug!("close({id}): not mounted");
            return;
        };
        log::info!("{id}: closing terminal");
        instance.backend.dispose();
        self.manager.destroy(id);
        if self.focused.as_ref() == Some(id) {
            self.focused = None;
        }
    }

    /// Confirmed context deletion: close every terminal the context owns.
    pub fn remove_context(&mut self, context: &ContextId) {
        let ids: Vec<TerminalId> = self
            .instances
            .iter()
            .filter(|(_, i)| &i.context == context)
            .map(|(id, _)| id.clone())
            .collect();
        log::info!("removing context {context}: {} terminal(s)", ids.len());
        for id in &ids {
            self.close(id);
        }
    }

    /// Tear the current backend down and bring up `kind` in its place.
    /// The process is destroyed and respawned: the two backend families do
    /// not share a transport, so a live shell cannot be handed across.
    pub fn switch_backend(&mut self, id: &TerminalId, kind: BackendKind) {
        if self.backend_kind(id) == Some(kind) {
            return;
        }
        self.remount(id, kind);
    }

    /// Manual restart: same backend kind, fresh process.
    pub fn restart(&mut self, id: &TerminalId) {
        let Some(kind) = self.backend_kind(id) else {
            log::debug!("restart({id}): not mounted");
            return;
        };
        self.remount(id, kind);
    }

    fn remount(&mut self, id: &TerminalId, kind: BackendKind) {
        let Some(mut instance) = self.instances.remove(id) else {
            log::debug!("remount({id}): not mounted");
            return;
        };
        log::info!("{id}: remounting as {kind:?}");
        instance.backend.dispose();
        self.manager.destroy(id);

        let session = SessionRecord {
            terminal_id: id.clone(),
            context: instance.context,
            cwd: instance.cwd,
        };
        self.activate(&session, instance.container, kind);
        self.update_visibility();
    }

    /// Host shutdown: dispose every backend and kill every process.
    pub fn shutdown(&mut self) {
        log::info!("registry shutdown: {} terminal(s)", self.instances.len());
        for (_, instance) in self.instances.iter_mut() {
            instance.backend.dispose();
        }
        self.instances.clear();
        self.manager.destroy_all();
    }
}
