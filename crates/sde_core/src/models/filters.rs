//! Declarative audio filter graph.
//!
//! The graph is a data description of the transformations the external
//! encode engine applies during re-encoding; no signal processing happens
//! in this crate. Stage order is load-bearing: rearranging stages changes
//! the acoustic result, so the graph preserves insertion order and the
//! planner is the only place stages are assembled.

use serde::{Deserialize, Serialize};

use super::enums::CompressionProfile;

/// A single parametric equalizer band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    /// Center frequency in Hz.
    pub frequency_hz: u32,
    /// Band width in Q units.
    pub width: f64,
    /// Gain in dB; negative attenuates.
    pub gain_db: f64,
}

/// One stage of the audio filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterStage {
    /// High-pass filter removing low-frequency rumble below the cutoff.
    Highpass { cutoff_hz: u32 },
    /// Parametric equalization of a single band.
    Equalizer(EqBand),
    /// Dynamic-range compression with the given profile.
    Compressor(CompressionProfile),
    /// Loudness normalization to an integrated LUFS target.
    Loudnorm { target_lufs: f64 },
    /// Static volume adjustment, applied after normalization.
    Volume { gain_db: f64 },
}

impl FilterStage {
    /// Render this stage as an engine filter expression.
    pub fn to_expression(&self) -> String {
        match self {
            FilterStage::Highpass { cutoff_hz } => format!("highpass=f={}", cutoff_hz),
            FilterStage::Equalizer(band) => format!(
                "equalizer=f={}:t=q:w={}:g={}",
                band.frequency_hz, band.width, band.gain_db
            ),
            FilterStage::Compressor(profile) => match profile {
                // Off is filtered out by the planner; rendering it as a
                // 1:1 compressor keeps the expression valid regardless.
                CompressionProfile::Off => "acompressor=ratio=1".to_string(),
                CompressionProfile::Light => {
                    "acompressor=threshold=-20dB:ratio=2:attack=20:release=400".to_string()
                }
                CompressionProfile::SpeechTuned => {
                    "acompressor=threshold=-25dB:ratio=6:attack=10:release=200".to_string()
                }
            },
            FilterStage::Loudnorm { target_lufs } => {
                format!("loudnorm=I={}:TP=-1.5:LRA=11", target_lufs)
            }
            FilterStage::Volume { gain_db } => format!("volume={}dB", gain_db),
        }
    }
}

/// Ordered chain of filter stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGraph {
    stages: Vec<FilterStage>,
}

impl FilterGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the end of the chain.
    pub fn push(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }

    /// Stages in application order.
    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    /// Whether the graph has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Render the whole chain as a comma-joined engine expression.
    pub fn to_expression(&self) -> String {
        self.stages
            .iter()
            .map(FilterStage::to_expression)
            .collect::<Vec<_>>()
            .join(",")
    }
}
