//! Batch orchestration.
//!
//! Sequences per-file jobs over a discovered file set with fault
//! isolation: every per-file error is converted into a `JobResult` at
//! the file boundary, so one bad file never aborts the batch. Only
//! root-directory and configuration problems are fatal, and only before
//! any job has started.
//!
//! # Architecture
//!
//! ```text
//! BatchRunner (Idle → Running → Completed | Cancelled)
//!     └── per file: Probe → Plan → Execute → JobResult
//! ```

mod batch;

use thiserror::Error;

use crate::discovery::DiscoveryError;
use crate::models::BatchState;

pub use batch::{BatchRunner, CancelHandle, LineCallback, ResultCallback};

/// Errors that abort a batch before any job runs.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The root directory could not be scanned.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The runner is single-use and has already left Idle.
    #[error("batch runner already used (state: {state})")]
    NotIdle { state: BatchState },
}
