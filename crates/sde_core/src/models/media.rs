//! Source file and probed audio-stream data structures.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A candidate input file produced by discovery.
///
/// Immutable once listed: discovery creates these, the probe and executor
/// only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path to the file.
    pub path: PathBuf,

    /// Lowercased extension without the leading dot (e.g. "mkv").
    pub extension: String,

    /// When discovery listed the file (RFC 3339).
    pub discovered_at: String,
}

impl SourceFile {
    /// Create a source file entry for an absolute path.
    pub fn new(path: PathBuf) -> Self {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        Self {
            path,
            extension,
            discovered_at: chrono::Local::now().to_rfc3339(),
        }
    }

    /// File name without extension, for output naming.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string())
    }

    /// File name including extension, for log display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Audio-stream facts probed from a source file.
///
/// Every field except the codec name is optional: the probe degrades
/// missing or malformed fields to `None` instead of failing, and
/// downstream consumers substitute configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Codec name as reported by the probe (e.g. "aac", "ac3").
    pub codec_name: String,

    /// Bit rate in bits/second, when the container reports one.
    pub bit_rate: Option<u64>,

    /// Number of audio channels.
    pub channels: Option<u8>,

    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,

    /// Container duration in seconds, used to scale encode progress.
    pub duration_secs: Option<f64>,
}

impl AudioStreamInfo {
    /// Short human-readable summary for job logs.
    pub fn describe(&self) -> String {
        let mut parts = vec![self.codec_name.clone()];
        if let Some(br) = self.bit_rate {
            parts.push(format!("{} kb/s", br / 1000));
        }
        if let Some(sr) = self.sample_rate {
            parts.push(format!("{} Hz", sr));
        }
        if let Some(ch) = self.channels {
            parts.push(format!("{} ch", ch));
        }
        parts.join(", ")
    }
}
