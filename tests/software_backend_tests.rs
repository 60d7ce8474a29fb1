//! Software backend mount/dispose behavior with real shells.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use harbor_term::{
    BackendStatus, Container, FrameRect, MountCallbacks, MountOptions, PtyProcessManager,
    SoftwareTerminalBackend, TerminalBackend, TerminalId,
};

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}

fn recording_callbacks() -> (MountCallbacks, Arc<Mutex<Vec<BackendStatus>>>) {
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    let callbacks = MountCallbacks::new(move |status| {
        sink.lock().push(status);
    });
    (callbacks, statuses)
}

fn mount_opts(id: &TerminalId, dir: &std::path::Path) -> MountOptions {
    let mut opts = MountOptions::new(id.clone(), dir);
    opts.shell = Some("/bin/sh".to_string());
    opts
}

#[test]
fn mounted_shell_output_reaches_the_snapshot() {
    let manager = PtyProcessManager::new();
    let mut backend = SoftwareTerminalBackend::new(manager.clone());
    let container = Container::new(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    let id = TerminalId::new("sw-echo");
    let dir = tempfile::tempdir().unwrap();

    let (callbacks, statuses) = recording_callbacks();
    backend
        .mount(container, mount_opts(&id, dir.path()), callbacks)
        .unwrap();

    assert_eq!(
        statuses.lock().as_slice(),
        &[BackendStatus::Creating, BackendStatus::Running]
    );

    backend.write(b"echo snapshot_marker\n");
    assert!(wait_until(Duration::from_secs(10), || {
        backend
            .snapshot()
            .is_some_and(|s| s.text().contains("snapshot_marker"))
    }));

    manager.destroy(&id);
}

#[test]
fn spawn_failure_reports_exited_and_renders_inline_error() {
    let manager = PtyProcessManager::new();
    let mut backend = SoftwareTerminalBackend::new(manager.clone());
    let container = Container::new(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    let id = TerminalId::new("sw-bad-shell");
    let dir = tempfile::tempdir().unwrap();

    let mut opts = MountOptions::new(id.clone(), dir.path());
    opts.shell = Some("/definitely/not/a/shell".to_string());

    let (callbacks, statuses) = recording_callbacks();
    // mount itself succeeds; the failure is rendered, not thrown
    backend.mount(container, opts, callbacks).unwrap();

    assert_eq!(
        statuses.lock().as_slice(),
        &[BackendStatus::Creating, BackendStatus::Exited(None)]
    );
    let snap = backend.snapshot().unwrap();
    assert!(snap.text().contains("failed to start shell"));
    assert!(!manager.has(&id));
}

#[test]
fn dispose_never_destroys_the_process() {
    let manager = PtyProcessManager::new();
    let mut backend = SoftwareTerminalBackend::new(manager.clone());
    let container = Container::new(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    let id = TerminalId::new("sw-dispose");
    let dir = tempfile::tempdir().unwrap();

    backend
        .mount(container, mount_opts(&id, dir.path()), MountCallbacks::noop())
        .unwrap();
    assert!(manager.has(&id));

    backend.dispose();
    assert!(backend.snapshot().is_none());
    assert!(manager.has(&id), "process must survive backend disposal");

    manager.destroy(&id);
}

#[test]
fn exit_after_dispose_is_not_reported() {
    let manager = PtyProcessManager::new();
    let mut backend = SoftwareTerminalBackend::new(manager.clone());
    let container = Container::new(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    let id = TerminalId::new("sw-late-exit");
    let dir = tempfile::tempdir().unwrap();

    let (callbacks, statuses) = recording_callbacks();
    backend
        .mount(container, mount_opts(&id, dir.path()), callbacks)
        .unwrap();
    backend.dispose();

    let before = statuses.lock().len();
    manager.write(&id, b"exit 0\n");
    assert!(wait_until(Duration::from_secs(10), || !manager.has(&id)));
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(statuses.lock().len(), before);
}

#[test]
fn rapid_identical_bounds_changes_resize_once_per_distinct_size() {
    let manager = PtyProcessManager::new();
    let mut backend = SoftwareTerminalBackend::new(manager.clone());
    let container = Container::new(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    let id = TerminalId::new("sw-refit");
    let dir = tempfile::tempdir().unwrap();

    backend
        .mount(
            container.clone(),
            mount_opts(&id, dir.path()),
            MountCallbacks::noop(),
        )
        .unwrap();
    let baseline = backend.snapshot().unwrap();

    // Same rect fired repeatedly: the grid must not churn.
    for _ in 0..20 {
        container.set_bounds(FrameRect::new(0.0, 0.0, 640.0, 384.0));
    }
    let unchanged = backend.snapshot().unwrap();
    assert_eq!(
        (unchanged.columns, unchanged.rows),
        (baseline.columns, baseline.rows)
    );

    container.set_bounds(FrameRect::new(0.0, 0.0, 1280.0, 768.0));
    let grown = backend.snapshot().unwrap();
    assert!(grown.columns > baseline.columns);

    manager.destroy(&id);
}
