//! Configuration: TOML-backed settings and validation.
//!
//! Settings are organized into sections that map to TOML tables; unknown
//! keys are ignored for forward compatibility. `validate` clamps numeric
//! fields into their documented safe ranges and produces the
//! `ValidatedSettings` value that the planner and orchestrator require,
//! so out-of-range values can never reach a job.

mod settings;
mod validate;

pub use settings::{
    EncodingSettings, EqBandSettings, ExecutionSettings, FilterSettings, LoggingSettings,
    OutputSettings, Settings,
};
pub use validate::{validate, ValidatedSettings, ValidationError};
