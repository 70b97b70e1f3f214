//! Dual-sink lifecycle logger
//!
//! Every record goes to stdout as-is and is appended to a durable log
//! file with a leading timestamp. The file sink is opened in append mode
//! at construction and created if absent; if it cannot be opened the
//! logger degrades to console-only. Sink write failures are swallowed:
//! a logging failure must never abort the operation that logged.

use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Default durable sink path, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "wos.log";

/// Timestamp layout for durable-sink records.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Console + append-only file logger for bus lifecycle events.
pub struct BusLogger {
    path: PathBuf,
    file: Option<Mutex<File>>,
}

impl BusLogger {
    /// Open a logger with the durable sink at `path`.
    ///
    /// Never fails: an unopenable file leaves the console sink active on
    /// its own.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(f) => Some(Mutex::new(f)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "log file unavailable, console only");
                None
            }
        };
        Self { path, file }
    }

    /// Path of the durable sink.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` to both sinks.
    ///
    /// Records reach the file in emission order; the timestamp prefix is
    /// applied only to the durable sink.
    pub fn log(&self, text: &str) {
        println!("{text}");

        if let Some(file) = &self.file {
            let stamp = Local::now().format(TIMESTAMP_FORMAT);
            // Holding the lock across the write keeps records whole and ordered.
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{stamp} {text}");
            }
        }
    }
}

impl std::fmt::Debug for BusLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusLogger")
            .field("path", &self.path)
            .field("file_sink", &self.file.is_some())
            .finish()
    }
}

impl Default for BusLogger {
    fn default() -> Self {
        Self::open(DEFAULT_LOG_PATH)
    }
}
