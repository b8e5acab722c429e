//! Append-only run log at `~/.stallwatch/stallwatch.log`.
//!
//! The library never opens the file on its own. The binary calls
//! [`init_with_debug`] once; until then every `swlog*` macro is a no-op, so
//! embedding callers get no files and no output.
//!
//! Runs log at `Info` by default. `--debug` or `STALLWATCH_DEBUG=1` lowers
//! the cutoff to `Debug`. Per-task scoring lines sit at `Trace`, below
//! anything the binary writes.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static SINK: OnceLock<Sink> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// Destination file plus the most verbose level it accepts.
#[derive(Debug)]
pub struct Sink {
    path: PathBuf,
    max_level: LogLevel,
}

impl Sink {
    /// Truncate `path` and accept messages up to `max_level`.
    pub fn create(path: impl Into<PathBuf>, max_level: LogLevel) -> io::Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, "")?;
        Ok(Self { path, max_level })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn accepts(&self, level: LogLevel) -> bool {
        level <= self.max_level
    }

    /// Append one timestamped line. Dropped messages are not an error.
    pub fn write(&self, level: LogLevel, msg: &str) -> io::Result<()> {
        if !self.accepts(level) {
            return Ok(());
        }
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "[{}] [{}] {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            level.label(),
            msg
        )
    }
}

/// True when the flag is set or `STALLWATCH_DEBUG` is `1` or `true`.
fn debug_requested(flag: bool, env: Option<&str>) -> bool {
    flag || env.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Open the run log. Later calls keep the first sink.
pub fn init_with_debug(debug: bool) {
    let env = std::env::var("STALLWATCH_DEBUG").ok();
    let max_level = if debug_requested(debug, env.as_deref()) {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let Some(home) = dirs::home_dir() else {
        return;
    };
    if let Ok(sink) = Sink::create(home.join(".stallwatch").join("stallwatch.log"), max_level) {
        let _ = SINK.set(sink);
    }
}

/// Target of the `swlog*` macros.
pub fn log_at(level: LogLevel, msg: &str) {
    if let Some(sink) = SINK.get() {
        let _ = sink.write(level, msg);
    }
}

#[macro_export]
macro_rules! swlog {
    ($($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! swlog_error {
    ($($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! swlog_warn {
    ($($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! swlog_debug {
    ($($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! swlog_trace {
    ($($arg:tt)*) => {
        $crate::log::log_at($crate::log::LogLevel::Trace, &format!($($arg)*))
    };
}
