//! Cross-platform software backend.
//!
//! Owns an `alacritty_terminal` emulator fed by the process manager's byte
//! stream and exposes styled viewport snapshots for the host to paint. At
//! mount it probes the container for an accelerated paint path and falls
//! back to snapshot painting silently when none is available.

pub mod fit;
pub mod keymap;
pub mod snapshot;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::term::test::TermSize;
use alacritty_terminal::term::{Config as TermConfig, Term, TermMode};
use alacritty_terminal::vte::ansi::Processor;
use parking_lot::Mutex;

use harbor_config::Theme;
use harbor_pty::{
    CreateOptions, DataSubscription, ExitSubscription, PtyProcessManager, TerminalId,
};

use crate::container::{AcceleratedPainter, BoundsObserver, Container};
use crate::contract::{
    BackendKind, BackendStatus, MountCallbacks, MountOptions, TerminalBackend,
};
use fit::{best_fit, CellMetrics};
use keymap::{dispose as dispose_key, Disposition, KeyEvent, LocalAction};
use snapshot::Snapshot;

/// Forwards emulator-originated events. Responses the emulator generates
/// (cursor position reports, device attributes) go straight back to the
/// shell; title and bell are logged for the host to pick up later.
struct EventProxy {
    manager: PtyProcessManager,
    terminal_id: TerminalId,
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        match event {
            Event::PtyWrite(text) => self.manager.write(&self.terminal_id, text.as_bytes()),
            Event::Title(title) => log::debug!("{}: title changed to {title:?}", self.terminal_id),
            Event::Bell => log::debug!("{}: bell", self.terminal_id),
            _ => {}
        }
    }
}

struct Emulator {
    term: Term<EventProxy>,
    processor: Processor,
    cols: u16,
    rows: u16,
}

impl Emulator {
    fn advance(&mut self, bytes: &[u8]) {
        self.processor.advance(&mut self.term, bytes);
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        if (cols, rows) == (self.cols, self.rows) {
            return;
        }
        self.cols = cols;
        self.rows = rows;
        self.term.resize(TermSize::new(cols as usize, rows as usize));
    }
}

struct SearchState {
    query: String,
    /// Viewport rows containing the query, top to bottom.
    matches: Vec<usize>,
    current: Option<usize>,
}

struct Mounted {
    terminal_id: TerminalId,
    emulator: Arc<Mutex<Emulator>>,
    theme: Arc<Mutex<Theme>>,
    visible: bool,
    painter: Option<Arc<dyn AcceleratedPainter>>,
    search: Option<SearchState>,
    _data_sub: DataSubscription,
    _exit_sub: ExitSubscription,
    _bounds_observer: BoundsObserver,
}

/// The software rendering backend.
///
/// One instance per terminal tab. Dropping or disposing it releases the
/// emulator and every subscription but leaves the shell process running;
/// process lifetime belongs to the manager's owner.
pub struct SoftwareTerminalBackend {
    manager: PtyProcessManager,
    mounted: Option<Mounted>,
    disposed: Arc<AtomicBool>,
}

impl SoftwareTerminalBackend {
    pub fn new(manager: PtyProcessManager) -> Self {
        Self {
            manager,
            mounted: None,
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Styled viewport snapshot for painting, `None` before mount or after
    /// dispose.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let mounted = self.mounted.as_ref()?;
        let theme = mounted.theme.lock().clone();
        let emulator = mounted.emulator.lock();
        Some(snapshot::capture(&emulator.term, &theme))
    }

    /// Whether an accelerated paint path was acquired at mount.
    pub fn uses_accelerated_paint(&self) -> bool {
        self.mounted
            .as_ref()
            .is_some_and(|m| m.painter.is_some())
    }

    /// Whether the host currently wants this backend painted.
    pub fn is_visible(&self) -> bool {
        self.mounted.as_ref().is_some_and(|m| m.visible)
    }

    /// Classify and act on a key event. Returns `false` when the event is a
    /// host-application shortcut the caller must handle itself.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        let Some(mounted) = self.mounted.as_ref() else {
            return false;
        };
        let app_cursor = mounted
            .emulator
            .lock()
            .term
            .mode()
            .contains(TermMode::APP_CURSOR);

        match dispose_key(event, app_cursor) {
            Disposition::PassThrough => false,
            Disposition::Ignored => true,
            Disposition::Forward(bytes) => {
                self.manager.write(&mounted.terminal_id, &bytes);
                true
            }
            Disposition::Local(action) => {
                self.run_local_action(action);
                true
            }
        }
    }

    fn run_local_action(&mut self, action: LocalAction) {
        match action {
            LocalAction::Clear => self.clear(),
            LocalAction::ToggleSearch => {
                if self.mounted.as_ref().is_some_and(|m| m.search.is_some()) {
                    self.search_close();
                } else if let Some(mounted) = self.mounted.as_mut() {
                    mounted.search = Some(SearchState {
                        query: String::new(),
                        matches: Vec::new(),
                        current: None,
                    });
                }
            }
            LocalAction::CopyOrInterrupt => {
                // ^C only when there is nothing selected to copy; the host
                // reads the copied text via copy_selection.
                if self.copy_selection().is_none() {
                    if let Some(mounted) = self.mounted.as_ref() {
                        self.manager.write(&mounted.terminal_id, &[0x03]);
                    }
                }
            }
            // Clipboard contents live with the host; it calls paste().
            LocalAction::Paste => {}
        }
    }

    /// Current selection as text, if any.
    pub fn copy_selection(&self) -> Option<String> {
        let mounted = self.mounted.as_ref()?;
        mounted.emulator.lock().term.selection_to_string()
    }

    /// Send clipboard text to the shell, honoring bracketed paste mode.
    pub fn paste(&mut self, text: &str) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        let normalized = text.replace("\r\n", "\r").replace('\n', "\r");
        let bracketed = mounted
            .emulator
            .lock()
            .term
            .mode()
            .contains(TermMode::BRACKETED_PASTE);
        if bracketed {
            let mut bytes = b"\x1b[200~".to_vec();
            bytes.extend_from_slice(normalized.as_bytes());
            bytes.extend_from_slice(b"\x1b[201~");
            self.manager.write(&mounted.terminal_id, &bytes);
        } else {
            self.manager.write(&mounted.terminal_id, normalized.as_bytes());
        }
    }

    /// Viewport row of the current search match.
    pub fn current_search_match(&self) -> Option<usize> {
        let search = self.mounted.as_ref()?.search.as_ref()?;
        search.current.map(|i| search.matches[i])
    }

    fn refresh_search(&mut self, query: &str) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        let Some(search) = mounted.search.as_mut() else {
            return;
        };
        if search.query != query {
            search.query = query.to_string();
            search.matches = snapshot
                .lines
                .iter()
                .enumerate()
                .filter(|(_, line)| line.text().contains(query))
                .map(|(row, _)| row)
                .collect();
            search.current = None;
        }
    }

    fn step_search(&mut self, query: &str, forward: bool) {
        self.refresh_search(query);
        let Some(search) = self.mounted.as_mut().and_then(|m| m.search.as_mut()) else {
            return;
        };
        if search.matches.is_empty() {
            search.current = None;
            return;
        }
        let len = search.matches.len();
        search.current = Some(match (search.current, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        });
    }

    /// Fit the emulator and PTY to `cols`x`rows`, deduping no-op resizes.
    fn apply_grid(&self, cols: u16, rows: u16) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        let mut emulator = mounted.emulator.lock();
        if (emulator.cols, emulator.rows) == (cols, rows) {
            return;
        }
        emulator.resize(cols, rows);
        drop(emulator);
        self.manager.resize(&mounted.terminal_id, cols, rows);
    }
}

impl TerminalBackend for SoftwareTerminalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software
    }

    fn supports_search(&self) -> bool {
        true
    }

    fn mount(
        &mut self,
        container: Container,
        opts: MountOptions,
        callbacks: MountCallbacks,
    ) -> anyhow::Result<()> {
        if self.mounted.is_some() {
            anyhow::bail!("backend already mounted for {}", opts.terminal_id);
        }
        if self.disposed.load(Ordering::SeqCst) {
            anyhow::bail!("backend for {} was disposed", opts.terminal_id);
        }

        callbacks.status_changed(BackendStatus::Creating);

        let metrics = CellMetrics::for_font_size(opts.font.size);
        let rect = container.bounds();
        let (cols, rows) = best_fit(&rect, &metrics.scaled(container.zoom_factor()));

        let term_config = TermConfig {
            scrolling_history: opts.scrollback,
            ..TermConfig::default()
        };
        let proxy = EventProxy {
            manager: self.manager.clone(),
            terminal_id: opts.terminal_id.clone(),
        };
        let term = Term::new(
            term_config,
            &TermSize::new(cols as usize, rows as usize),
            proxy,
        );
        let emulator = Arc::new(Mutex::new(Emulator {
            term,
            processor: Processor::new(),
            cols,
            rows,
        }));
        let theme = Arc::new(Mutex::new(opts.theme.clone()));

        let feed = Arc::clone(&emulator);
        let data_sub = self.manager.on_data(&opts.terminal_id, move |bytes| {
            feed.lock().advance(bytes);
        });

        let exit_callbacks = callbacks.clone();
        let exit_disposed = Arc::clone(&self.disposed);
        let exit_sub = self.manager.on_exit(&opts.terminal_id, move |event| {
            if !exit_disposed.load(Ordering::SeqCst) {
                exit_callbacks.status_changed(BackendStatus::Exited(event.code));
            }
        });

        let mut create = CreateOptions::new(&opts.cwd).with_size(cols, rows);
        if let Some(shell) = &opts.shell {
            create = create.with_shell(shell.clone());
        }
        match self.manager.create(&opts.terminal_id, create) {
            Ok((actual_cols, actual_rows)) => {
                // A pre-existing process may still be on its spawn-time grid;
                // the container-fitted grid wins.
                if (actual_cols, actual_rows) != (cols, rows) {
                    self.manager.resize(&opts.terminal_id, cols, rows);
                }
                callbacks.status_changed(BackendStatus::Running);
            }
            Err(e) => {
                // The tab stays usable as a corpse showing what went wrong.
                log::warn!("{}: shell failed to start: {e}", opts.terminal_id);
                let line = format!("\r\n[harbor] failed to start shell: {e}\r\n");
                emulator.lock().advance(line.as_bytes());
                callbacks.status_changed(BackendStatus::Exited(None));
            }
        }

        let fit_emulator = Arc::clone(&emulator);
        let fit_manager = self.manager.clone();
        let fit_id = opts.terminal_id.clone();
        let fit_container = container.clone();
        let fit_disposed = Arc::clone(&self.disposed);
        let bounds_observer = container.observe_bounds(move |rect| {
            if fit_disposed.load(Ordering::SeqCst) {
                return;
            }
            let zoom = fit_container.zoom_factor();
            let (cols, rows) = best_fit(&rect, &metrics.scaled(zoom));
            let mut emulator = fit_emulator.lock();
            if (emulator.cols, emulator.rows) == (cols, rows) {
                return;
            }
            emulator.resize(cols, rows);
            drop(emulator);
            fit_manager.resize(&fit_id, cols, rows);
        });

        let painter = match container.acquire_accelerated_painter() {
            Ok(painter) => Some(painter),
            Err(e) => {
                log::debug!("{}: software paint path: {e}", opts.terminal_id);
                None
            }
        };

        self.mounted = Some(Mounted {
            terminal_id: opts.terminal_id,
            emulator,
            theme,
            visible: true,
            painter,
            search: None,
            _data_sub: data_sub,
            _exit_sub: exit_sub,
            _bounds_observer: bounds_observer,
        });
        Ok(())
    }

    fn write(&mut self, data: &[u8]) {
        if let Some(mounted) = self.mounted.as_ref() {
            self.manager.write(&mounted.terminal_id, data);
        }
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.apply_grid(cols, rows);
    }

    fn focus(&mut self) {
        let Some(mounted) = self.mounted.as_ref() else {
            return;
        };
        let wants_report = mounted
            .emulator
            .lock()
            .term
            .mode()
            .contains(TermMode::FOCUS_IN_OUT);
        if wants_report {
            self.manager.write(&mounted.terminal_id, b"\x1b[I");
        }
    }

    fn clear(&mut self) {
        if let Some(mounted) = self.mounted.as_ref() {
            // Clear screen, home the cursor, drop scrollback.
            mounted.emulator.lock().advance(b"\x1b[H\x1b[2J\x1b[3J");
        }
    }

    fn set_visible(&mut self, visible: bool) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.visible = visible;
        }
    }

    fn update_theme(&mut self, theme: &Theme) {
        if let Some(mounted) = self.mounted.as_ref() {
            *mounted.theme.lock() = theme.clone();
        }
    }

    fn search_find_next(&mut self, query: &str) {
        self.step_search(query, true);
    }

    fn search_find_previous(&mut self, query: &str) {
        self.step_search(query, false);
    }

    fn search_close(&mut self) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.search = None;
        }
    }

    fn dispose(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
        if let Some(mounted) = self.mounted.take() {
            log::debug!("{}: software backend disposed", mounted.terminal_id);
            // Subscriptions and the bounds observer disconnect on drop; the
            // shell process is deliberately left untouched.
        }
    }
}

impl Drop for SoftwareTerminalBackend {
    fn drop(&mut self) {
        if self.mounted.is_some() {
            self.dispose();
        }
    }
}
