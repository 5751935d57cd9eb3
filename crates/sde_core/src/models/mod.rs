//! Data model: source files, probed audio facts, filter graphs, encode
//! plans, and batch reporting types.

pub mod enums;
pub mod filters;
pub mod jobs;
pub mod media;

pub use enums::{BatchState, CompressionProfile, JobOutcome};
pub use filters::{EqBand, FilterGraph, FilterStage};
pub use jobs::{BatchReport, BatchSummary, EncodePlan, JobResult};
pub use media::{AudioStreamInfo, SourceFile};
