//! Settings struct with TOML-based sections.

use serde::{Deserialize, Serialize};

use crate::models::CompressionProfile;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Audio filter chain parameters.
    #[serde(default)]
    pub filters: FilterSettings,

    /// Output naming and placement.
    #[serde(default)]
    pub output: OutputSettings,

    /// Codec and bitrate fallbacks.
    #[serde(default)]
    pub encoding: EncodingSettings,

    /// External tool invocation and concurrency.
    #[serde(default)]
    pub execution: ExecutionSettings,

    /// Job log behavior.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Parse settings from a TOML document.
    ///
    /// Missing sections and fields take their defaults; unknown keys are
    /// ignored rather than rejected.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// One configurable equalizer band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBandSettings {
    /// Center frequency in Hz.
    pub frequency_hz: u32,

    /// Band width in Q units.
    #[serde(default = "default_eq_width")]
    pub width: f64,

    /// Gain in dB; negative attenuates.
    pub gain_db: f64,
}

fn default_eq_width() -> f64 {
    1.0
}

/// Dialogue filter chain parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// High-pass cutoff in Hz (safe range 20-300).
    #[serde(default = "default_highpass_cutoff")]
    pub highpass_cutoff_hz: u32,

    /// Equalizer bands, applied in order after the high-pass stage.
    #[serde(default = "default_eq_bands")]
    pub eq_bands: Vec<EqBandSettings>,

    /// Dynamic-range compression profile.
    #[serde(default)]
    pub compression_profile: CompressionProfile,

    /// Integrated loudness target in LUFS (safe range -36 to -6).
    #[serde(default = "default_loudness_target")]
    pub loudness_target_lufs: f64,

    /// Static volume adjustment in dB applied after normalization.
    #[serde(default)]
    pub volume_boost_db: f64,
}

fn default_highpass_cutoff() -> u32 {
    150
}

fn default_eq_bands() -> Vec<EqBandSettings> {
    vec![
        // Vocal presence boost.
        EqBandSettings {
            frequency_hz: 3000,
            width: 1.0,
            gain_db: 3.0,
        },
        // Muddiness cut.
        EqBandSettings {
            frequency_hz: 100,
            width: 1.0,
            gain_db: -3.0,
        },
    ]
}

fn default_loudness_target() -> f64 {
    -16.0
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            highpass_cutoff_hz: default_highpass_cutoff(),
            eq_bands: default_eq_bands(),
            compression_profile: CompressionProfile::default(),
            loudness_target_lufs: default_loudness_target(),
            volume_boost_db: 0.0,
        }
    }
}

/// Output naming and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Subfolder under the scanned root for enhanced files.
    #[serde(default = "default_subfolder")]
    pub subfolder: String,

    /// Suffix appended to the original stem.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Replace an existing output file instead of skipping the job.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_subfolder() -> String {
    "processed".to_string()
}

fn default_suffix() -> String {
    "_enhanced".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            subfolder: default_subfolder(),
            suffix: default_suffix(),
            overwrite: false,
        }
    }
}

/// Codec and bitrate fallbacks for when the probe comes up empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Encoder used when the source codec cannot be preserved.
    #[serde(default = "default_fallback_codec")]
    pub fallback_codec: String,

    /// Bitrate in kbps used when the source bitrate is unknown
    /// (safe range 32-1024).
    #[serde(default = "default_bitrate_kbps")]
    pub default_bitrate_kbps: u32,
}

fn default_fallback_codec() -> String {
    "aac".to_string()
}

fn default_bitrate_kbps() -> u32 {
    192
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            fallback_codec: default_fallback_codec(),
            default_bitrate_kbps: default_bitrate_kbps(),
        }
    }
}

/// External tool paths and batch concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Maximum number of files encoded at once. The engine already
    /// parallelizes one encode across all cores, so 1 is the default.
    #[serde(default = "default_max_jobs")]
    pub max_concurrent_jobs: usize,

    /// Encode tool invocation name or path.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Probe tool invocation name or path.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

fn default_max_jobs() -> usize {
    1
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_jobs(),
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

/// Job log behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Folder under the scanned root for per-job log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Filter tool output and progress spam from the pushed log stream.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Number of tool output lines retained for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: usize,

    /// Prefix pushed log lines with a timestamp.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_true() -> bool {
    true
}

fn default_progress_step() -> u32 {
    20
}

fn default_error_tail() -> usize {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
            compact: true,
            progress_step: default_progress_step(),
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[filters]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("highpass_cutoff_hz"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed = Settings::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[output]\nsubfolder = \"enhanced\"";
        let parsed = Settings::from_toml_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.output.subfolder, "enhanced");
        // Defaults applied for missing
        assert_eq!(parsed.filters.highpass_cutoff_hz, 150);
        assert_eq!(parsed.encoding.default_bitrate_kbps, 192);
        assert_eq!(parsed.execution.max_concurrent_jobs, 1);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let content = "[filters]\nhighpass_cutoff_hz = 120\nshimmer_amount = 9\n\n[telemetry]\nenabled = true";
        let parsed = Settings::from_toml_str(content).unwrap();
        assert_eq!(parsed.filters.highpass_cutoff_hz, 120);
    }

    #[test]
    fn default_eq_bands_boost_and_cut() {
        let bands = Settings::default().filters.eq_bands;
        assert_eq!(bands.len(), 2);
        assert!(bands[0].gain_db > 0.0);
        assert!(bands[1].gain_db < 0.0);
    }
}
