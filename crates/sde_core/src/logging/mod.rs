//! Per-job logging with file and push-callback output.
//!
//! The observability collaborator (GUI, CLI, test harness) receives every
//! log line through a pushed callback; the core never renders or buffers
//! a full transcript. A bounded tail of tool output is retained per job
//! and doubles as the diagnostic text on failure.

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel};
