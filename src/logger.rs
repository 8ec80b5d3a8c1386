//! Logging capability with colored terminal output.
//!
//! This module provides:
//! - `Logger` trait, injected into the engine instead of a global logger
//! - `TerminalLogger` for colored `[module]` prefixed output
//! - `NullLogger` for tests and embedding
//! - `log!` / `debug!` macros that format lazily
//!
//! # Example
//!
//! ```ignore
//! let logger: Arc<dyn Logger> = Arc::new(TerminalLogger::new(true));
//! log!(logger; "watch"; "modified file: {}", path);
//! debug!(logger; "hub"; "broadcast to {} consumers", count);
//! ```

use std::io::{Write, stdout};
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

/// Minimal logging capability required by the engine.
pub trait Logger: Send + Sync {
    /// Print a message with a module prefix.
    fn log(&self, module: &str, message: &str);

    /// Whether debug output is wanted (checked before formatting).
    fn is_verbose(&self) -> bool {
        false
    }

    /// Print a debug message. Only shown when verbose.
    fn debug(&self, module: &str, message: &str) {
        if self.is_verbose() {
            self.log(module, message);
        }
    }

    /// Print an error and terminate the process.
    fn fatal(&self, module: &str, message: &str) -> ! {
        self.log(module, message);
        std::process::exit(1)
    }
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!(logger; "module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr; $module:expr; $($arg:tt)*) => {{
        $crate::logger::Logger::log(&*$logger, $module, &format!($($arg)*))
    }};
}

/// Log a debug message (only formatted when the logger is verbose)
///
/// # Usage
/// ```ignore
/// debug!(logger; "module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr; $module:expr; $($arg:tt)*) => {{
        if $crate::logger::Logger::is_verbose(&*$logger) {
            $crate::logger::Logger::log(&*$logger, $module, &format!($($arg)*))
        }
    }};
}

/// Format an error with its full `source()` chain, `: `-separated.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// ============================================================================
// Terminal Logger
// ============================================================================

/// Colored stdout logger, the default for the engine and the dev server.
#[derive(Debug, Default)]
pub struct TerminalLogger {
    verbose: AtomicBool,
}

impl TerminalLogger {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose: AtomicBool::new(verbose),
        }
    }

    /// Toggle debug output at runtime
    pub fn set_verbose(&self, v: bool) {
        self.verbose.store(v, Ordering::SeqCst);
    }
}

impl Logger for TerminalLogger {
    fn log(&self, module: &str, message: &str) {
        let module_lower = module.to_ascii_lowercase();
        let prefix = colorize_prefix(module, &module_lower);

        let mut stdout = stdout().lock();
        writeln!(stdout, "{prefix} {message}").ok();
        stdout.flush().ok();
    }

    fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::SeqCst)
    }
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "serve" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" | "fatal" => prefix.bright_red().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Null Logger
// ============================================================================

/// Discards everything except `fatal`, which still exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _module: &str, _message: &str) {}
}

// ============================================================================
// Tests
// ============================================================================
