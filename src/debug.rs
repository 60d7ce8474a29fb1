//! File-backed sink for the `log` facade, controlled by HARBOR_DEBUG:
//! - 0 or unset: no logging
//! - 1: errors only
//! - 2: warnings and errors
//! - 3: info (lifecycle events, surface operations)
//! - 4: everything (frame sync, grid fitting, per-operation trace)
//!
//! Records from every crate in the workspace land in
//! `harbor_term_debug.log` under the temp dir; stderr is mirrored only
//! when RUST_LOG is also set. Keeping debug output off stdout/stderr by
//! default avoids corrupting TUI apps that share the terminal.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Instant;

use log::LevelFilter;
use parking_lot::Mutex;

/// Where the session log lands.
pub fn log_file_path() -> PathBuf {
    std::env::temp_dir().join("harbor_term_debug.log")
}

fn level_from_env() -> Option<LevelFilter> {
    let raw = std::env::var("HARBOR_DEBUG").ok()?;
    match raw.trim().parse::<u8>() {
        Ok(1) => Some(LevelFilter::Error),
        Ok(2) => Some(LevelFilter::Warn),
        Ok(3) => Some(LevelFilter::Info),
        Ok(n) if n >= 4 => Some(LevelFilter::Trace),
        _ => None,
    }
}

struct FileSink {
    file: Mutex<File>,
    started: Instant,
    mirror_stderr: bool,
}

impl log::Log for FileSink {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{:>10.3}] {:5} {}: {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args()
        );
        let mut file = self.file.lock();
        let _ = writeln!(file, "{line}");
        let _ = file.flush();
        if self.mirror_stderr {
            eprintln!("{line}");
        }
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }
}

static INIT: OnceLock<bool> = OnceLock::new();

/// Install the file sink if HARBOR_DEBUG asks for one.
///
/// Idempotent; returns whether the sink is active. A no-op when the
/// variable is unset or the host already installed its own logger.
pub fn init_from_env() -> bool {
    *INIT.get_or_init(|| {
        let Some(level) = level_from_env() else {
            return false;
        };
        let path = log_file_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => f,
            // Never let diagnostics interfere with the terminals themselves.
            Err(_) => return false,
        };
        let sink = FileSink {
            file: Mutex::new(file),
            started: Instant::now(),
            mirror_stderr: std::env::var_os("RUST_LOG").is_some(),
        };
        if log::set_boxed_logger(Box::new(sink)).is_err() {
            return false;
        }
        log::set_max_level(level);
        log::info!("debug session started (level={level})");
        true
    })
}
