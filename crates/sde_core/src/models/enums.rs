//! Core enums used throughout the crate.

use serde::{Deserialize, Serialize};

/// Dynamic-range compression profile applied to the dialogue chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionProfile {
    /// No compression stage.
    Off,
    /// Gentle levelling (low ratio, slow release).
    Light,
    /// Dialogue-tuned compression (higher ratio, fast release).
    #[default]
    SpeechTuned,
}

impl std::fmt::Display for CompressionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionProfile::Off => write!(f, "off"),
            CompressionProfile::Light => write!(f, "light"),
            CompressionProfile::SpeechTuned => write!(f, "speech-tuned"),
        }
    }
}

/// Outcome of a single per-file job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// Output file was written and verified non-empty.
    Success,
    /// File was deliberately not processed (no audio stream, or the
    /// output already exists and overwrite is off).
    Skipped,
    /// The encode was attempted and did not produce a usable output.
    Failed,
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "Success"),
            JobOutcome::Skipped => write!(f, "Skipped"),
            JobOutcome::Failed => write!(f, "Failed"),
        }
    }
}

/// Lifecycle state of a batch run.
///
/// Transitions: Idle → Running → (Completed | Cancelled). Terminal states
/// never transition further; a new batch requires a fresh runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl BatchState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Cancelled)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchState::Idle => write!(f, "idle"),
            BatchState::Running => write!(f, "running"),
            BatchState::Completed => write!(f, "completed"),
            BatchState::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_profile_serializes_kebab_case() {
        let json = serde_json::to_string(&CompressionProfile::SpeechTuned).unwrap();
        assert_eq!(json, "\"speech-tuned\"");
    }

    #[test]
    fn compression_profile_deserializes_kebab_case() {
        let profile: CompressionProfile = serde_json::from_str("\"light\"").unwrap();
        assert_eq!(profile, CompressionProfile::Light);
    }

    #[test]
    fn batch_state_terminality() {
        assert!(!BatchState::Idle.is_terminal());
        assert!(!BatchState::Running.is_terminal());
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::Cancelled.is_terminal());
    }
}
