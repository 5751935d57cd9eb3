//! Settings validation and range clamping.
//!
//! Numeric fields are clamped into documented safe ranges; only
//! configurations that cannot produce a usable batch are rejected.

use thiserror::Error;

use super::settings::Settings;

/// Safe range for the high-pass cutoff, in Hz.
pub const HIGHPASS_RANGE_HZ: (u32, u32) = (20, 300);

/// Safe range for the loudness target, in LUFS.
pub const LOUDNESS_RANGE_LUFS: (f64, f64) = (-36.0, -6.0);

/// Safe range for equalizer band gain, in dB.
pub const EQ_GAIN_RANGE_DB: (f64, f64) = (-24.0, 24.0);

/// Safe range for equalizer band width, in Q units.
pub const EQ_WIDTH_RANGE: (f64, f64) = (0.1, 10.0);

/// Safe range for the static volume adjustment, in dB.
pub const VOLUME_RANGE_DB: (f64, f64) = (-12.0, 12.0);

/// Safe range for the fallback bitrate, in kbps.
pub const BITRATE_RANGE_KBPS: (u32, u32) = (32, 1024);

/// Errors for configurations that cannot be repaired by clamping.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Output naming would write enhanced files over their inputs.
    #[error("output suffix and subfolder are both empty; outputs would collide with inputs")]
    OutputCollidesWithInput,

    /// The fallback codec is not one the engine can encode to.
    #[error("unrecognized fallback codec '{0}'")]
    UnknownFallbackCodec(String),

    /// A tool path is empty.
    #[error("{tool} path is empty")]
    EmptyToolPath { tool: &'static str },
}

/// Settings that have passed `validate`.
///
/// This is the only settings type the planner and orchestrator accept,
/// so unclamped values cannot reach a job.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    inner: Settings,
}

impl ValidatedSettings {
    /// Access the validated settings.
    pub fn settings(&self) -> &Settings {
        &self.inner
    }
}

/// Validate raw settings, clamping numeric fields into safe ranges.
///
/// Clamping is logged but not an error; rejection is reserved for
/// configurations with no usable interpretation. Unknown keys were
/// already dropped at parse time.
pub fn validate(mut settings: Settings) -> Result<ValidatedSettings, ValidationError> {
    if settings.output.suffix.is_empty() && settings.output.subfolder.is_empty() {
        return Err(ValidationError::OutputCollidesWithInput);
    }
    if settings.execution.ffmpeg_path.is_empty() {
        return Err(ValidationError::EmptyToolPath { tool: "ffmpeg" });
    }
    if settings.execution.ffprobe_path.is_empty() {
        return Err(ValidationError::EmptyToolPath { tool: "ffprobe" });
    }
    if !crate::plan::is_known_encoder(&settings.encoding.fallback_codec) {
        return Err(ValidationError::UnknownFallbackCodec(
            settings.encoding.fallback_codec.clone(),
        ));
    }

    let filters = &mut settings.filters;
    filters.highpass_cutoff_hz = clamp_u32(
        "filters.highpass_cutoff_hz",
        filters.highpass_cutoff_hz,
        HIGHPASS_RANGE_HZ,
    );
    filters.loudness_target_lufs = clamp_f64(
        "filters.loudness_target_lufs",
        filters.loudness_target_lufs,
        LOUDNESS_RANGE_LUFS,
    );
    filters.volume_boost_db = clamp_f64(
        "filters.volume_boost_db",
        filters.volume_boost_db,
        VOLUME_RANGE_DB,
    );
    for band in &mut filters.eq_bands {
        band.gain_db = clamp_f64("filters.eq_bands.gain_db", band.gain_db, EQ_GAIN_RANGE_DB);
        band.width = clamp_f64("filters.eq_bands.width", band.width, EQ_WIDTH_RANGE);
    }

    settings.encoding.default_bitrate_kbps = clamp_u32(
        "encoding.default_bitrate_kbps",
        settings.encoding.default_bitrate_kbps,
        BITRATE_RANGE_KBPS,
    );

    if settings.execution.max_concurrent_jobs == 0 {
        tracing::warn!("execution.max_concurrent_jobs of 0 raised to 1");
        settings.execution.max_concurrent_jobs = 1;
    }
    if settings.logging.progress_step == 0 {
        settings.logging.progress_step = 1;
    }

    Ok(ValidatedSettings { inner: settings })
}

fn clamp_u32(field: &str, value: u32, (lo, hi): (u32, u32)) -> u32 {
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        tracing::warn!("{} of {} clamped to {}", field, value, clamped);
    }
    clamped
}

fn clamp_f64(field: &str, value: f64, (lo, hi): (f64, f64)) -> f64 {
    // NaN has no usable interpretation either way; pin it to the low end.
    if value.is_nan() {
        tracing::warn!("{} is NaN, replaced with {}", field, lo);
        return lo;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        tracing::warn!("{} of {} clamped to {}", field, value, clamped);
    }
    clamped
}
