//! Process manager lifecycle tests against real shells.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use harbor_term::{CreateOptions, PtyProcessManager, TerminalId};

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

fn sh_options(cwd: &std::path::Path) -> CreateOptions {
    CreateOptions::new(cwd).with_shell("/bin/sh")
}

#[test]
fn create_twice_spawns_one_process_with_same_dimensions() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-create-twice");
    let dir = tempfile::tempdir().unwrap();

    let first = manager.create(&id, sh_options(dir.path())).unwrap();
    let second = manager.create(&id, sh_options(dir.path())).unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.list(), vec![id.clone()]);

    manager.destroy(&id);
}

#[test]
fn data_arrives_in_write_order() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-write-order");
    let dir = tempfile::tempdir().unwrap();

    let output = Arc::new(Mutex::new(Vec::<u8>::new()));
    let sink = Arc::clone(&output);
    let _sub = manager.on_data(&id, move |bytes| {
        sink.lock().extend_from_slice(bytes);
    });

    manager.create(&id, sh_options(dir.path())).unwrap();
    manager.write(&id, b"echo first_marker\n");
    manager.write(&id, b"echo second_marker\n");

    assert!(wait_until(Duration::from_secs(10), || {
        let text = String::from_utf8_lossy(&output.lock()).to_string();
        // Look at shell output, not the echoed-back command line.
        let first = text.rfind("first_marker");
        let second = text.rfind("second_marker");
        matches!((first, second), (Some(a), Some(b)) if a < b)
    }));

    manager.destroy(&id);
}

#[test]
fn destroy_makes_id_unknown_and_later_calls_are_noops() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-destroy");
    let dir = tempfile::tempdir().unwrap();

    manager.create(&id, sh_options(dir.path())).unwrap();
    assert!(manager.has(&id));

    manager.destroy(&id);
    assert!(!manager.has(&id));
    assert!(manager.list().is_empty());

    // Swallowed, never panics.
    manager.write(&id, b"x");
    manager.resize(&id, 100, 30);
    manager.destroy(&id);
}

#[test]
fn exit_fires_exactly_once_and_clears_the_id() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-exit-once");
    let dir = tempfile::tempdir().unwrap();

    let exits = Arc::new(AtomicUsize::new(0));
    let codes = Arc::new(Mutex::new(Vec::new()));
    let exits_sink = Arc::clone(&exits);
    let codes_sink = Arc::clone(&codes);
    let _sub = manager.on_exit(&id, move |event| {
        exits_sink.fetch_add(1, Ordering::SeqCst);
        codes_sink.lock().push(event.code);
    });

    manager.create(&id, sh_options(dir.path())).unwrap();
    manager.write(&id, b"exit 0\n");

    assert!(wait_until(Duration::from_secs(10), || {
        exits.load(Ordering::SeqCst) == 1
    }));
    assert!(wait_until(Duration::from_secs(5), || !manager.has(&id)));

    // Give any stray second delivery time to show up.
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(exits.load(Ordering::SeqCst), 1);
    assert_eq!(codes.lock().as_slice(), &[Some(0)]);
}

#[test]
fn unsubscribing_one_data_listener_leaves_others_attached() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-unsub");
    let dir = tempfile::tempdir().unwrap();

    let kept = Arc::new(Mutex::new(Vec::<u8>::new()));
    let dropped = Arc::new(Mutex::new(Vec::<u8>::new()));

    let kept_sink = Arc::clone(&kept);
    let _kept_sub = manager.on_data(&id, move |bytes| {
        kept_sink.lock().extend_from_slice(bytes);
    });
    let dropped_sink = Arc::clone(&dropped);
    let dropped_sub = manager.on_data(&id, move |bytes| {
        dropped_sink.lock().extend_from_slice(bytes);
    });

    manager.create(&id, sh_options(dir.path())).unwrap();
    drop(dropped_sub);
    manager.write(&id, b"echo still_listening\n");

    assert!(wait_until(Duration::from_secs(10), || {
        String::from_utf8_lossy(&kept.lock()).contains("still_listening")
    }));
    assert!(!String::from_utf8_lossy(&dropped.lock()).contains("still_listening"));

    manager.destroy(&id);
}

#[test]
fn full_lifecycle_scenario() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t1");
    let dir = tempfile::tempdir().unwrap();

    let output = Arc::new(Mutex::new(Vec::<u8>::new()));
    let sink = Arc::clone(&output);
    let _sub = manager.on_data(&id, move |bytes| {
        sink.lock().extend_from_slice(bytes);
    });

    let dims = manager.create(&id, sh_options(dir.path())).unwrap();
    assert_eq!(dims, (80, 24));

    manager.write(&id, b"echo hi\n");
    assert!(wait_until(Duration::from_secs(10), || {
        String::from_utf8_lossy(&output.lock()).contains("hi")
    }));

    manager.resize(&id, 120, 40);
    // stty reflects the resized PTY
    output.lock().clear();
    manager.write(&id, b"stty size\n");
    assert!(wait_until(Duration::from_secs(10), || {
        String::from_utf8_lossy(&output.lock()).contains("40 120")
    }));

    manager.destroy(&id);
    assert!(!manager.has(&id));
    manager.write(&id, b"x");
}

#[test]
fn late_exit_of_a_replaced_process_stays_with_that_process() {
    let manager = PtyProcessManager::new();
    let id = TerminalId::new("t-replace");
    let dir = tempfile::tempdir().unwrap();

    manager.create(&id, sh_options(dir.path())).unwrap();
    // A background child keeps the pty slave open past the shell's death,
    // so the first process's reader sees EOF well after the kill.
    manager.write(&id, b"sleep 2 &\n");
    std::thread::sleep(Duration::from_millis(300));
    manager.destroy(&id);

    // Recreate under the same id, then subscribe as a fresh mount would.
    manager.create(&id, sh_options(dir.path())).unwrap();
    let exits = Arc::new(AtomicUsize::new(0));
    let exit_count = Arc::clone(&exits);
    let _exit_sub = manager.on_exit(&id, move |_| {
        exit_count.fetch_add(1, Ordering::SeqCst);
    });
    let output = Arc::new(Mutex::new(Vec::<u8>::new()));
    let sink = Arc::clone(&output);
    let _data_sub = manager.on_data(&id, move |bytes| {
        sink.lock().extend_from_slice(bytes);
    });

    // Let the first process's delayed EOF land. It must not reach the
    // successor's listeners or consume them.
    std::thread::sleep(Duration::from_secs(3));
    assert_eq!(exits.load(Ordering::SeqCst), 0);
    assert!(manager.has(&id));

    manager.write(&id, b"echo successor_alive\n");
    assert!(wait_until(Duration::from_secs(10), || {
        String::from_utf8_lossy(&output.lock()).contains("successor_alive")
    }));

    // The successor's own exit still fires, exactly once.
    manager.destroy(&id);
    assert!(wait_until(Duration::from_secs(10), || {
        exits.load(Ordering::SeqCst) == 1
    }));
    assert_eq!(exits.load(Ordering::SeqCst), 1);
}
