//! # Debug log
//!
//! Buffered implementation of the `log` facade. While the editor owns the
//! terminal, writing log lines to stdout would tear the display, so records
//! accumulate in memory and are flushed to a file when the process exits —
//! on fatal exits included.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// A `log::Log` sink that keeps formatted lines in memory until `flush`.
pub struct DebugLog {
    lines: Mutex<Vec<String>>,
    path: PathBuf,
}

impl DebugLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { lines: Mutex::new(Vec::new()), path: path.into() }
    }

    /// Install a `DebugLog` writing to `path` as the global logger.
    ///
    /// # Errors
    ///
    /// Will return `Err` if a global logger was already installed.
    pub fn install(path: impl Into<PathBuf>) -> Result<(), SetLoggerError> {
        log::set_logger(Box::leak(Box::new(Self::new(path))))?;
        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl Log for DebugLog {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= Level::Debug }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("[{}] {}", record.level(), record.args()));
        }
    }

    /// Write the pending lines to disk and clear the buffer. Nothing happens
    /// when no line was logged; I/O errors are swallowed since the terminal
    /// is already being torn down when this runs.
    fn flush(&self) {
        let Ok(mut lines) = self.lines.lock() else { return };
        if lines.is_empty() {
            return;
        }
        if let Ok(mut file) = File::create(&self.path) {
            for line in lines.iter() {
                if writeln!(file, "{line}").is_err() {
                    break;
                }
            }
        }
        lines.clear();
    }
}
