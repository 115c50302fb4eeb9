//! Leveled logging for the `finbridge` workspace.
//!
//! The logger is a process-wide singleton with an atomic level filter. Every
//! record carries the module path of the call site. Records go to stderr by
//! default; tests can switch on an in-memory capture buffer and inspect what
//! the bridge reported.
//!
//! # Example
//!
//! ```
//! use finbridge_log::{debug, info, warn, Level};
//!
//! finbridge_log::set_level(Level::Debug);
//!
//! info!("bridge ready with {} classes", 9);
//! debug!("vtable: {:?}", ["get_value", "is_a"]);
//! warn!("handle released twice");
//! ```

use std::fmt::{self, Arguments};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

/// Environment variable read by [`init_from_env`].
pub const ENV_VAR: &str = "FINBRIDGE_LOG";

/// Severity of a log record, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Failures the bridge cannot recover from on its own.
    Error = 0,
    /// Misuse that was tolerated, such as a lenient double release.
    Warn = 1,
    /// Lifecycle milestones.
    Info = 2,
    /// Registry and binding table construction.
    Debug = 3,
    /// Per-call detail.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLevelError(String);

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid log level: {}", self.0)
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Parses a level name, ignoring case.
    ///
    /// ```
    /// use finbridge_log::Level;
    ///
    /// assert_eq!("warn".parse::<Level>(), Ok(Level::Warn));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// A single captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Severity the record was logged at.
    pub level: Level,
    /// Module path of the call site.
    pub target: String,
    /// Formatted message.
    pub message: String,
}

/// The global logger.
///
/// Holds the level filter and the optional capture buffer. Obtain it with
/// [`get_logger`].
pub struct Logger {
    level: AtomicU8,
    capturing: AtomicBool,
    captured: Mutex<Vec<Record>>,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            capturing: AtomicBool::new(false),
            captured: Mutex::new(Vec::new()),
        }
    }

    /// Sets the most verbose level that will be emitted.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current level filter.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Returns true if a record at `level` passes the filter.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    fn write(&self, level: Level, target: &str, args: Arguments<'_>) {
        if self.capturing.load(Ordering::Acquire) {
            let mut captured = self
                .captured
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            captured.push(Record {
                level,
                target: target.to_string(),
                message: args.to_string(),
            });
            return;
        }

        static RESET: &str = "\x1b[0m";
        let color = level.color_code();
        eprintln!("{color}[{level}]{RESET} {target}: {args}");
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at `Level::Info` on first use.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Info))
}

/// Sets the level filter of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Returns the level filter of the global logger.
pub fn level() -> Level {
    get_logger().level()
}

/// Sets the level filter from a level name.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if `s` is not a level name; the current level
/// is left unchanged.
pub fn set_level_from_str(s: &str) -> Result<(), ParseLevelError> {
    set_level(s.parse()?);
    Ok(())
}

/// Applies the level named by the `FINBRIDGE_LOG` environment variable.
///
/// Returns the level now in effect. An unset variable keeps the current
/// level.
///
/// # Errors
///
/// Returns [`ParseLevelError`] if the variable is set to something that is
/// not a level name.
pub fn init_from_env() -> Result<Level, ParseLevelError> {
    if let Ok(value) = std::env::var(ENV_VAR) {
        set_level_from_str(&value)?;
    }
    Ok(level())
}

/// Routes every subsequent record into the capture buffer instead of stderr.
pub fn start_capture() {
    get_logger().capturing.store(true, Ordering::Release);
}

/// Routes records back to stderr. The buffer keeps what it holds.
pub fn stop_capture() {
    get_logger().capturing.store(false, Ordering::Release);
}

/// Returns a copy of every captured record.
pub fn captured() -> Vec<Record> {
    get_logger()
        .captured
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Drains the capture buffer.
pub fn take_captured() -> Vec<Record> {
    std::mem::take(
        &mut *get_logger()
            .captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner),
    )
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments<'_>) {
    let logger = get_logger();
    if logger.enabled(level) {
        logger.write(level, target, args);
    }
}

/// Logs at an explicit level, tagging the record with the caller's module.
///
/// ```
/// use finbridge_log::{log, Level};
///
/// log!(level: Level::Info, "loaded {} bindings", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs at `Level::Error`.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at `Level::Warn`.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at `Level::Info`.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at `Level::Debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at `Level::Trace`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
