#![deny(missing_docs)]
//! Shared logging utilities for the exporter workspace.
//!
//! Provides the `engine_*` logging macros used across the codebase, the
//! logger initialization used by the CLI, and a minimal test initializer.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    TestLogger, WriteLogger,
};

thread_local! {
    /// Id of the conversation the controller is working on, if any.
    static CURRENT_ITEM: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Tags the current thread with the conversation being processed.
/// Pass `None` once the item is checkpointed.
pub fn set_current_item(id: Option<&str>) {
    CURRENT_ITEM.with(|v| *v.borrow_mut() = id.map(ToOwned::to_owned));
}

/// Returns the conversation id set by [`set_current_item`], or `"-"`.
pub fn current_item() -> String {
    CURRENT_ITEM.with(|v| v.borrow().clone().unwrap_or_else(|| "-".to_string()))
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("[{}] {}", $crate::current_item(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("[{}] {}", $crate::current_item(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("[{}] {}", $crate::current_item(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("[{}] {}", $crate::current_item(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("[{}] {}", $crate::current_item(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the given log file only.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Default log file, relative to the current working directory.
pub const LOG_FILE: &str = "./chat-export.log";

/// Initializes the global logger.
///
/// A log file that cannot be created is reported on stderr and skipped; the
/// terminal logger still works.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(Path::new(LOG_FILE), level, config) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<WriteLogger<File>>> {
    // One log spans every invocation.
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("warning: cannot open log file {}: {err}", path.display());
            None
        }
    }
}

/// Installs a logger whose output the test harness captures per test.
///
/// Later calls are no-ops, so every test may call this.
pub fn initialize_for_tests() {
    let _ = TestLogger::init(LevelFilter::Debug, build_config());
}
