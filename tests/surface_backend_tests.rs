//! Native surface backend behavior against a recording mock host.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use harbor_surface::{
    NullEventSink, SurfaceBridge, SurfaceError, SurfaceHandle, SurfaceHost, SurfaceOptions,
    PARKED_RECT,
};
use harbor_term::{
    BackendStatus, Container, FrameRect, MountCallbacks, MountOptions, NativeSurfaceBackend,
    TerminalBackend, TerminalId,
};

#[derive(Debug, Clone, PartialEq)]
enum HostCall {
    Create(FrameRect),
    SetFrame(FrameRect),
    SetFocus(bool),
    Destroy,
}

#[derive(Default)]
struct RecordingHost {
    next: AtomicU64,
    calls: Mutex<Vec<HostCall>>,
    fail_create: bool,
    /// While set, `create_surface` blocks; lets a test order dispose
    /// ahead of the mount continuation.
    hold_create: Arc<AtomicBool>,
}

impl RecordingHost {
    fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    fn last_frame(&self) -> Option<FrameRect> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|c| match c {
                HostCall::SetFrame(rect) => Some(*rect),
                HostCall::Create(rect) => Some(*rect),
                _ => None,
            })
    }
}

impl SurfaceHost for RecordingHost {
    fn init_runtime(&self) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn create_surface(&self, opts: &SurfaceOptions) -> Result<SurfaceHandle, SurfaceError> {
        while self.hold_create.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
        if self.fail_create {
            return Err(SurfaceError::Host("create refused".to_string()));
        }
        self.calls.lock().push(HostCall::Create(opts.frame));
        Ok(SurfaceHandle(self.next.fetch_add(1, Ordering::SeqCst)))
    }

    fn set_frame(&self, _h: SurfaceHandle, frame: FrameRect) -> Result<(), SurfaceError> {
        self.calls.lock().push(HostCall::SetFrame(frame));
        Ok(())
    }

    fn set_content_scale(&self, _h: SurfaceHandle, _s: f64) -> Result<(), SurfaceError> {
        Ok(())
    }

    fn set_focus(&self, _h: SurfaceHandle, focused: bool) -> Result<(), SurfaceError> {
        self.calls.lock().push(HostCall::SetFocus(focused));
        Ok(())
    }

    fn destroy_surface(&self, _h: SurfaceHandle) -> Result<(), SurfaceError> {
        self.calls.lock().push(HostCall::Destroy);
        Ok(())
    }
}

struct Fixture {
    runtime: tokio::runtime::Runtime,
    host: Arc<RecordingHost>,
    bridge: Arc<SurfaceBridge>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_host(RecordingHost::default())
    }

    fn with_host(host: RecordingHost) -> Self {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let host = Arc::new(host);
        let bridge = Arc::new(SurfaceBridge::new(host.clone(), Arc::new(NullEventSink)));
        Self {
            runtime,
            host,
            bridge,
        }
    }

    fn backend(&self) -> NativeSurfaceBackend {
        NativeSurfaceBackend::new(Arc::clone(&self.bridge), self.runtime.handle().clone())
    }
}

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

fn mount(
    backend: &mut NativeSurfaceBackend,
    container: &Container,
    id: &TerminalId,
) -> Arc<Mutex<Vec<BackendStatus>>> {
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    let callbacks = MountCallbacks::new(move |status| sink.lock().push(status));
    let opts = MountOptions::new(id.clone(), std::env::temp_dir());
    backend.mount(container.clone(), opts, callbacks).unwrap();
    statuses
}

#[test]
fn mount_creates_surface_focuses_and_reports_running() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(100.0, 80.0, 640.0, 360.0));
    let id = TerminalId::new("ns-mount");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    assert_eq!(
        fixture.host.calls(),
        vec![
            HostCall::Create(FrameRect::new(100.0, 80.0, 640.0, 360.0)),
            HostCall::SetFocus(true),
        ]
    );
    assert!(container.is_cleared());
    assert!(container.is_passthrough());
    assert!(fixture.bridge.has_surface(&id));
}

#[test]
fn mount_scales_the_rect_by_the_live_zoom_factor() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(10.0, 20.0, 300.0, 200.0));
    container.set_zoom_factor(2.0);
    let id = TerminalId::new("ns-zoom");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    assert_eq!(
        fixture.host.last_frame(),
        Some(FrameRect::new(20.0, 40.0, 600.0, 400.0))
    );
}

#[test]
fn surface_creation_failure_reports_exited() {
    let fixture = Fixture::with_host(RecordingHost {
        fail_create: true,
        ..RecordingHost::default()
    });
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 100.0, 100.0));
    let id = TerminalId::new("ns-fail");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Exited(None))
    }));
    assert!(!fixture.bridge.has_surface(&id));
}

#[test]
fn hide_parks_and_show_restores_the_exact_rect() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let rect = FrameRect::new(100.0, 80.0, 640.0, 360.0);
    let container = Container::new(rect);
    let id = TerminalId::new("ns-park");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    backend.set_visible(false);
    let parked = fixture.host.last_frame().unwrap();
    assert_eq!(parked, PARKED_RECT);
    assert!(parked.x < 0.0 && parked.y < 0.0);
    assert_eq!((parked.w, parked.h), (1.0, 1.0));
    assert!(fixture.bridge.has_surface(&id), "parking never destroys");

    backend.set_visible(true);
    assert_eq!(fixture.host.last_frame(), Some(rect));
}

#[test]
fn resize_hint_forwards_a_frame_resync() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 400.0, 300.0));
    let id = TerminalId::new("ns-resync");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    // No bounds or zoom change happens here, so the only possible source
    // of a SetFrame is the hint being forwarded as a resync.
    backend.resize(120, 40);
    let rect = FrameRect::new(0.0, 0.0, 400.0, 300.0);
    assert!(wait_until(Duration::from_secs(5), || {
        fixture.host.calls().contains(&HostCall::SetFrame(rect))
    }));
}

#[test]
fn bounds_changes_while_parked_do_not_unpark() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 400.0, 300.0));
    let id = TerminalId::new("ns-parked-bounds");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    backend.set_visible(false);
    assert_eq!(fixture.host.last_frame(), Some(PARKED_RECT));

    let moved = FrameRect::new(50.0, 60.0, 500.0, 350.0);
    container.set_bounds(moved);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(fixture.host.last_frame(), Some(PARKED_RECT));

    // Restoring picks up the bounds change that happened while hidden.
    backend.set_visible(true);
    assert_eq!(fixture.host.last_frame(), Some(moved));
}

#[test]
fn rapid_bounds_changes_coalesce_per_distinct_size() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 400.0, 300.0));
    let id = TerminalId::new("ns-coalesce");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    let target = FrameRect::new(0.0, 0.0, 500.0, 300.0);
    for _ in 0..25 {
        container.set_bounds(target);
    }
    assert!(wait_until(Duration::from_secs(5), || {
        fixture.host.last_frame() == Some(target)
    }));
    // settle, then count: identical rects must collapse to one SetFrame
    std::thread::sleep(Duration::from_millis(50));
    let frames: Vec<_> = fixture
        .host
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HostCall::SetFrame(rect) if *rect == target))
        .collect();
    assert_eq!(frames.len(), 1);
}

#[test]
fn dispose_cancels_sync_destroys_surface_and_restores_container() {
    let fixture = Fixture::new();
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 400.0, 300.0));
    let id = TerminalId::new("ns-dispose");

    let statuses = mount(&mut backend, &container, &id);
    assert!(wait_until(Duration::from_secs(5), || {
        statuses.lock().last() == Some(&BackendStatus::Running)
    }));

    backend.dispose();
    assert!(!fixture.bridge.has_surface(&id));
    assert!(!container.is_passthrough());
    assert!(fixture.host.calls().contains(&HostCall::Destroy));

    // late bounds changes do nothing after disposal
    let before = fixture.host.calls().len();
    container.set_bounds(FrameRect::new(0.0, 0.0, 999.0, 999.0));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(fixture.host.calls().len(), before);
}

#[test]
fn dispose_before_a_failed_mount_suppresses_the_exited_status() {
    let host = RecordingHost {
        fail_create: true,
        ..RecordingHost::default()
    };
    let hold = Arc::clone(&host.hold_create);
    hold.store(true, Ordering::SeqCst);

    let fixture = Fixture::with_host(host);
    let mut backend = fixture.backend();
    let container = Container::new(FrameRect::new(0.0, 0.0, 100.0, 100.0));
    let id = TerminalId::new("ns-fail-disposed");

    let statuses = mount(&mut backend, &container, &id);
    backend.dispose();
    hold.store(false, Ordering::SeqCst);

    // The continuation fails the creation after disposal; a dead instance
    // must not report anything.
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(statuses.lock().as_slice(), &[BackendStatus::Creating]);
}

#[test]
fn dispose_racing_mount_rolls_back_the_created_surface() {
    let fixture = Fixture::new();
    let id = TerminalId::new("ns-race");
    let container = Container::new(FrameRect::new(0.0, 0.0, 100.0, 100.0));
    let mut backend = fixture.backend();
    let _statuses = mount(&mut backend, &container, &id);
    // Dispose immediately; the mount continuation may or may not have run
    // yet. Either way it must not leave a live surface behind.
    backend.dispose();

    assert!(wait_until(Duration::from_secs(5), || {
        !fixture.bridge.has_surface(&id)
    }));
    std::thread::sleep(Duration::from_millis(50));
    assert!(!fixture.bridge.has_surface(&id));
}

#[test]
fn capability_probe_matches_the_build_target() {
    assert_eq!(
        harbor_term::native_surface_supported(),
        cfg!(target_os = "macos")
    );
}
