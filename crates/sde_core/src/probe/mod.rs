//! Audio stream probing via ffprobe.
//!
//! Asks the probe tool for the first audio stream's metadata in JSON
//! form and parses exactly the fields the planner needs. Parsing is
//! tolerant: a missing or malformed individual field degrades to
//! "unknown" rather than failing the probe.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use thiserror::Error;

use crate::models::AudioStreamInfo;

/// Errors from probing a source file.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The probe tool itself could not be started.
    #[error("probe tool '{tool}' not found or not executable: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The source file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file has no audio stream at all.
    #[error("no audio stream in {0}")]
    NoAudioStream(PathBuf),

    /// The probe tool exited non-zero.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The probe tool's output was not parseable JSON.
    #[error("failed to parse probe output: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Probe the first audio stream of a source file.
///
/// Invokes `<tool> -v error -select_streams a:0 -show_streams
/// -show_format -of json <file>` and extracts codec name, bitrate,
/// channel count, sample rate, and container duration.
pub fn probe(tool: &str, path: &Path) -> Result<AudioStreamInfo, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::FileNotFound(path.to_path_buf()));
    }

    tracing::debug!("probing audio stream of {}", path.display());

    let output = Command::new(tool)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_streams",
            "-show_format",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|source| ProbeError::ToolNotFound {
            tool: tool.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ProbeError::CommandFailed {
            tool: tool.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json: Value = serde_json::from_slice(&output.stdout)?;
    parse_probe_json(&json, path)
}

/// Parse the JSON document produced by the probe tool.
///
/// Split out from `probe` so tolerance can be tested without the tool.
pub fn parse_probe_json(json: &Value, path: &Path) -> Result<AudioStreamInfo, ProbeError> {
    let stream = json
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .ok_or_else(|| ProbeError::NoAudioStream(path.to_path_buf()))?;

    let codec_name = stream
        .get("codec_name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    // ffprobe reports numeric fields as JSON strings; accept either form.
    let bit_rate = number_field(stream.get("bit_rate")).map(|v| v as u64);

    let channels = stream
        .get("channels")
        .and_then(|v| v.as_u64())
        .map(|c| c as u8);

    let sample_rate = number_field(stream.get("sample_rate")).map(|v| v as u32);

    // Stream duration when present, else container duration.
    let duration_secs = float_field(stream.get("duration"))
        .or_else(|| float_field(json.get("format").and_then(|f| f.get("duration"))));

    Ok(AudioStreamInfo {
        codec_name,
        bit_rate,
        channels,
        sample_rate,
        duration_secs,
    })
}

/// Extract a non-negative integer that may be encoded as string or number.
fn number_field(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Extract a float that may be encoded as string or number.
fn float_field(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
