//! Kernel-`printk`-style logging for the worker-pool engine
//!
//! Zero-dependency: no `log`/`tracing` crate sits behind this, just a
//! small `printk`-style facility. Level is controlled by the
//! `WPOOL_LOG_LEVEL` environment variable
//! (`off|error|warn|info|debug`, or `0`-`4`), read once and cached.
//!
//! # Output format
//!
//! `[LEVEL] [w<worker>] message`, e.g. `[WARN] [w2] spawn failed, retrying`.
//! `[w--]` when logged from a thread that hasn't registered a worker id
//! (e.g. the submitting thread).

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    if let Ok(val) = std::env::var("WPOOL_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            _ => LogLevel::Warn,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level(level: LogLevel) {
    INITIALIZED.store(true, Ordering::SeqCst);
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

thread_local! {
    static WORKER_ID: std::cell::Cell<Option<u32>> = const { std::cell::Cell::new(None) };
}

/// Tag the current thread as running worker `id`, for log context
pub fn set_worker_id(id: u32) {
    WORKER_ID.with(|w| w.set(Some(id)));
}

pub fn clear_worker_id() {
    WORKER_ID.with(|w| w.set(None));
}

fn format_context() -> String {
    match WORKER_ID.with(|w| w.get()) {
        Some(id) => format!("[w{}]", id),
        None => "[w--]".to_string(),
    }
}

#[doc(hidden)]
pub fn _wplog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} {} ", level.prefix(), format_context());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
}

#[macro_export]
macro_rules! wp_error {
    ($($arg:tt)*) => {{
        $crate::log::_wplog_impl($crate::log::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! wp_warn {
    ($($arg:tt)*) => {{
        $crate::log::_wplog_impl($crate::log::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! wp_info {
    ($($arg:tt)*) => {{
        $crate::log::_wplog_impl($crate::log::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! wp_debug {
    ($($arg:tt)*) => {{
        $crate::log::_wplog_impl($crate::log::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Debug);
    }

    #[test]
    fn test_worker_id_context() {
        assert_eq!(WORKER_ID.with(|w| w.get()), None);
        set_worker_id(3);
        assert_eq!(WORKER_ID.with(|w| w.get()), Some(3));
        clear_worker_id();
        assert_eq!(WORKER_ID.with(|w| w.get()), None);
    }

    #[test]
    fn test_macros_compile() {
        set_log_level(LogLevel::Off);
        wp_error!("err {}", 1);
        wp_warn!("warn");
        wp_info!("info {}", "x");
        wp_debug!("debug");
    }
}
