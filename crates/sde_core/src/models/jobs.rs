//! Encode plan, job result, and batch report data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::enums::JobOutcome;
use super::filters::FilterGraph;

/// Everything the executor needs to encode one file.
///
/// Built fresh per file by the planner; never shared or mutated after
/// construction. Contains no timestamps so identical inputs always yield
/// identical plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodePlan {
    /// Source file path.
    pub input_path: PathBuf,

    /// Computed output path: `<root>/<subfolder>/<stem><suffix><ext>`.
    pub output_path: PathBuf,

    /// Ordered audio filter chain.
    pub filters: FilterGraph,

    /// Encoder name passed to the engine (e.g. "aac", "libmp3lame").
    pub audio_codec: String,

    /// Target audio bitrate in bits/second.
    pub bitrate_bps: u64,

    /// Source duration in seconds, when known; scales progress reporting.
    pub duration_secs: Option<f64>,

    /// Original codec name when the encoder could not preserve it and a
    /// fallback was substituted. Recorded for diagnostics only.
    pub codec_substituted_from: Option<String>,
}

impl EncodePlan {
    /// Bitrate rendered in the engine's `NNNk` argument form.
    pub fn bitrate_arg(&self) -> String {
        format!("{}k", self.bitrate_bps / 1000)
    }
}

/// Outcome of one per-file job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Outcome classification.
    pub outcome: JobOutcome,

    /// Source file the job was for.
    pub input_path: PathBuf,

    /// Output file, when one was produced.
    pub output_path: Option<PathBuf>,

    /// Bounded diagnostic text (reason for skip, tool error tail, etc.).
    pub detail: String,
}

impl JobResult {
    /// Create a success result.
    pub fn success(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            outcome: JobOutcome::Success,
            input_path,
            output_path: Some(output_path),
            detail: String::new(),
        }
    }

    /// Create a skipped result with a reason.
    pub fn skipped(input_path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            outcome: JobOutcome::Skipped,
            input_path,
            output_path: None,
            detail: reason.into(),
        }
    }

    /// Create a failed result with diagnostic text.
    pub fn failed(input_path: PathBuf, detail: impl Into<String>) -> Self {
        Self {
            outcome: JobOutcome::Failed,
            input_path,
            output_path: None,
            detail: detail.into(),
        }
    }
}

/// Summary counts over a batch report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Ordered record of every attempted job in a batch.
///
/// Created when the batch starts, appended to as jobs complete (in
/// discovery order), and finalized exactly once when the batch completes
/// or is cancelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Job results in file-discovery order.
    pub results: Vec<JobResult>,

    /// When the batch started (RFC 3339).
    pub started_at: String,

    /// When the batch reached a terminal state; `None` while running.
    pub finished_at: Option<String>,
}

impl BatchReport {
    /// Create a report stamped with the current time.
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            started_at: chrono::Local::now().to_rfc3339(),
            finished_at: None,
        }
    }

    /// Append a job result.
    pub fn push(&mut self, result: JobResult) {
        self.results.push(result);
    }

    /// Mark the report finished. Idempotent.
    pub fn finalize(&mut self) {
        if self.finished_at.is_none() {
            self.finished_at = Some(chrono::Local::now().to_rfc3339());
        }
    }

    /// Whether `finalize` has been called.
    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Compute summary counts.
    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary {
            total: self.results.len(),
            ..Default::default()
        };
        for result in &self.results {
            match result.outcome {
                JobOutcome::Success => summary.succeeded += 1,
                JobOutcome::Skipped => summary.skipped += 1,
                JobOutcome::Failed => summary.failed += 1,
            }
        }
        summary
    }
}
