//! Logging types and configuration.

use crate::config::LoggingSettings;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Debug information (tool command lines, raw output).
    Debug,
    /// General information.
    #[default]
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
}

/// Configuration for per-job logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to output.
    pub level: LogLevel,
    /// Filter tool output and off-step progress from the pushed stream.
    pub compact: bool,
    /// Progress update step percentage.
    pub progress_step: u32,
    /// Number of tool output lines retained for error diagnosis.
    pub error_tail: usize,
    /// Prefix pushed lines with a timestamp.
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: LogLevel::Info,
            compact: settings.compact,
            progress_step: settings.progress_step.max(1),
            error_tail: settings.error_tail,
            show_timestamps: settings.show_timestamps,
        }
    }
}

/// Callback receiving each pushed log line.
pub type LogCallback = Box<dyn Fn(&str) + Send + Sync>;
