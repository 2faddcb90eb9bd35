//! Logging setup shared by both binaries.
//!
//! Human-readable output goes to stderr by default. With `--logs` events are
//! appended to a size-capped file in the temp dir instead (optionally as JSON
//! lines), so the robot's raw-mode terminal is never scribbled on.

use crate::config::LogArgs;
use std::{
    env, fs,
    io::{self, Write},
    panic,
    path::PathBuf,
    sync::{Mutex, OnceLock},
};
use tracing_subscriber::fmt::time::UtcTime;

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
static LOGGING_INIT: OnceLock<()> = OnceLock::new();
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

/// Path to the per-role log file we rotate between runs.
pub fn log_file_path(role: &str) -> PathBuf {
    env::var("ROVERVOX_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join(format!("rovervox_{role}.log")))
}

/// Append-only file writer that truncates itself once it would exceed `max_bytes`.
pub(crate) struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    pub(crate) fn new(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn rotate_if_needed(&mut self, next_len: usize) {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return;
        }
        if let Ok(file) = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.bytes_written = 0;
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.rotate_if_needed(buf.len());
        let written = self.file.write(buf)?;
        self.bytes_written = self.bytes_written.saturating_add(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Install the global tracing subscriber for `role` ("robot" or "voice").
/// Calling it more than once is harmless.
pub fn init_logging(role: &str, args: &LogArgs) {
    let _ = LOGGING_INIT.get_or_init(|| {
        let level = args.log_level.as_tracing();
        let file_writer = if args.logs && !args.no_logs {
            LogWriter::new(log_file_path(role), LOG_MAX_BYTES)
        } else {
            None
        };

        let result = match (file_writer, args.log_json) {
            (Some(writer), true) => tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_writer(Mutex::new(writer))
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish(),
            ),
            (Some(writer), false) => tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_ansi(false)
                    .with_writer(Mutex::new(writer))
                    .finish(),
            ),
            (None, true) => tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_writer(io::stderr)
                    .finish(),
            ),
            (None, false) => tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_timer(UtcTime::rfc_3339())
                    .with_max_level(level)
                    .with_writer(io::stderr)
                    .finish(),
            ),
        };
        if result.is_err() {
            eprintln!("rovervox: a tracing subscriber was already installed");
        }
    });
}

/// Record panics through tracing and put the terminal back before the default
/// hook prints its message.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            crate::terminal_restore::restore_terminal();
            log_panic(info);
            previous(info);
        }));
    });
}

fn log_panic(info: &panic::PanicHookInfo<'_>) {
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());
    let payload = if let Some(text) = info.payload().downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = info.payload().downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    };
    tracing::error!(
        %location,
        %payload,
        version = env!("CARGO_PKG_VERSION"),
        "panic"
    );
}
