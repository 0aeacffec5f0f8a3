//! File-based logging with a minimum-level gate.
//! Lines go to a file because stdout/stderr belong to the TUI; without a
//! logfile on the command line, logging is off entirely.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};

static LOGGER: Mutex<Option<File>> = Mutex::new(None);
static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Opens the logfile and sets the level gate. With no path, logging stays
/// disabled and the level is irrelevant.
/// Returns Ok(true) when logging is enabled, Ok(false) when it is off, or
/// Err with a message when the file couldn't be opened.
pub fn init(logfile: Option<String>, verbose: bool) -> Result<bool, String> {
    let min = if verbose { Level::Debug } else { Level::Info };
    MIN_LEVEL.store(min as u8, Ordering::Relaxed);

    let Some(path) = logfile else {
        return Ok(false);
    };
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            *LOGGER.lock().unwrap() = Some(file);
            info(&format!("logging to {path}"));
            Ok(true)
        }
        Err(e) => Err(format!("Failed to open log file '{path}': {e}")),
    }
}

/// Appends one timestamped line, if logging is enabled and the level passes.
pub fn write(level: Level, msg: &str) {
    if (level as u8) < MIN_LEVEL.load(Ordering::Relaxed) {
        return;
    }
    let mut logger = LOGGER.lock().unwrap();
    if let Some(ref mut file) = *logger {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(file, "{timestamp} {:5} {msg}", level.tag());
        let _ = file.flush();
    }
}

pub fn debug(msg: &str) {
    write(Level::Debug, msg);
}

pub fn info(msg: &str) {
    write(Level::Info, msg);
}

pub fn warn(msg: &str) {
    write(Level::Warn, msg);
}

pub fn error(msg: &str) {
    write(Level::Error, msg);
}
