use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use spin::Mutex;

/// Sink installed by the board support package (UART, trace buffer, host stderr).
pub type LogWriter = fn(fmt::Arguments<'_>);

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);
static UPTIME_TICKS: AtomicU64 = AtomicU64::new(0);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::INFO.priority());
static WRITER: Mutex<Option<LogWriter>> = Mutex::new(None);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    PANIC,
    FATAL,
    ERROR,
    WARN,
    INFO,
    DEBUG,
    TRACE,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::PANIC => "PANIC",
            LogLevel::FATAL => "FATAL",
            LogLevel::ERROR => "ERROR",
            LogLevel::WARN => "WARN",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::TRACE => "TRACE",
        }
    }

    const fn priority(self) -> u8 {
        match self {
            LogLevel::PANIC => 0,
            LogLevel::FATAL => 1,
            LogLevel::ERROR => 2,
            LogLevel::WARN => 3,
            LogLevel::INFO => 4,
            LogLevel::DEBUG => 5,
            LogLevel::TRACE => 6,
        }
    }

    fn from_priority(value: u8) -> Self {
        match value {
            0 => LogLevel::PANIC,
            1 => LogLevel::FATAL,
            2 => LogLevel::ERROR,
            3 => LogLevel::WARN,
            4 => LogLevel::INFO,
            5 => LogLevel::DEBUG,
            _ => LogLevel::TRACE,
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("panic") {
            Some(LogLevel::PANIC)
        } else if value.eq_ignore_ascii_case("fatal") {
            Some(LogLevel::FATAL)
        } else if value.eq_ignore_ascii_case("error") {
            Some(LogLevel::ERROR)
        } else if value.eq_ignore_ascii_case("warn") || value.eq_ignore_ascii_case("warning") {
            Some(LogLevel::WARN)
        } else if value.eq_ignore_ascii_case("info") {
            Some(LogLevel::INFO)
        } else if value.eq_ignore_ascii_case("debug") {
            Some(LogLevel::DEBUG)
        } else if value.eq_ignore_ascii_case("trace") {
            Some(LogLevel::TRACE)
        } else {
            None
        }
    }
}

/// Install the output sink. Returns `false` if a writer was already installed
/// by an earlier call; the new writer replaces it either way.
pub fn init(writer: LogWriter) -> bool {
    *WRITER.lock() = Some(writer);
    LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.load(Ordering::Relaxed)
}

/// Remove the sink; later messages are dropped.
pub fn shutdown() {
    *WRITER.lock() = None;
    LOGGER_INITIALIZED.store(false, Ordering::SeqCst);
}

pub fn log(level: LogLevel, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }

    // The writer runs with the slot unlocked.
    let writer = *WRITER.lock();
    let Some(writer) = writer else {
        return;
    };

    writer(format_args!(
        "[{timestamp}] [{level}] {message}\n",
        timestamp = TimestampDisplay {
            ticks: UPTIME_TICKS.load(Ordering::Relaxed)
        },
        level = LevelDisplay(level),
        message = args,
    ));
}

pub fn enabled(level: LogLevel) -> bool {
    level.priority() <= LOG_LEVEL.load(Ordering::Relaxed)
}

pub fn set_max_level(level: LogLevel) {
    LOG_LEVEL.store(level.priority(), Ordering::Relaxed);
}

pub fn max_level() -> LogLevel {
    LogLevel::from_priority(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn parse_level_directive(cmdline: &str) -> Option<LogLevel> {
    for token in cmdline.split_whitespace() {
        if let Some((key, value)) = token.split_once('=') {
            if key.eq_ignore_ascii_case("log") || key.eq_ignore_ascii_case("loglevel") {
                if let Some(level) = LogLevel::from_str(value) {
                    return Some(level);
                }
            }
        }
    }
    None
}

/// Called from the clock tick so log lines carry the kernel uptime.
pub fn set_uptime_ticks(ticks: u64) {
    UPTIME_TICKS.store(ticks, Ordering::Relaxed);
}

pub fn uptime_ticks() -> u64 {
    UPTIME_TICKS.load(Ordering::Relaxed)
}

struct TimestampDisplay {
    ticks: u64,
}

impl fmt::Display for TimestampDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", self.ticks)
    }
}

struct LevelDisplay(LogLevel);

impl fmt::Display for LevelDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<5}", self.0.as_str())
    }
}
