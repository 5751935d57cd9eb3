//! Plan construction from probed facts and settings.

use std::path::Path;

use crate::config::{Settings, ValidatedSettings};
use crate::models::{
    AudioStreamInfo, CompressionProfile, EncodePlan, EqBand, FilterGraph, FilterStage, SourceFile,
};

/// Source codec name to engine encoder name.
///
/// Codecs absent from this table cannot be preserved; the configured
/// fallback encoder is substituted and the substitution recorded in the
/// plan.
const ENCODER_MAP: &[(&str, &str)] = &[
    ("aac", "aac"),
    ("ac3", "ac3"),
    ("eac3", "eac3"),
    ("mp3", "libmp3lame"),
    ("mp2", "mp2"),
    ("opus", "libopus"),
    ("vorbis", "libvorbis"),
    ("flac", "flac"),
    ("alac", "alac"),
    ("pcm_s16le", "pcm_s16le"),
    ("pcm_s24le", "pcm_s24le"),
];

/// Look up the engine encoder for a source codec name.
pub fn encoder_for(codec_name: &str) -> Option<&'static str> {
    ENCODER_MAP
        .iter()
        .find(|(codec, _)| *codec == codec_name)
        .map(|(_, encoder)| *encoder)
}

/// Whether a codec name maps to a usable encoder (for settings
/// validation of the fallback codec).
pub fn is_known_encoder(codec_name: &str) -> bool {
    encoder_for(codec_name).is_some()
}

/// Build the encode plan for one source file.
///
/// Pure function of its inputs. Stage order is fixed — highpass,
/// equalization, compression, loudness normalization, volume — because
/// reordering changes the acoustic result. Never fails: out-of-range
/// settings were rejected or clamped during validation.
pub fn build_plan(
    file: &SourceFile,
    audio: &AudioStreamInfo,
    settings: &ValidatedSettings,
    root: &Path,
) -> EncodePlan {
    let settings = settings.settings();
    let filters = build_filter_graph(settings);

    // Re-encode at the source bitrate when it is known, so no quality
    // headroom is lost; otherwise use the configured default.
    let bitrate_bps = audio
        .bit_rate
        .unwrap_or(settings.encoding.default_bitrate_kbps as u64 * 1000);

    let (audio_codec, codec_substituted_from) = match encoder_for(&audio.codec_name) {
        Some(encoder) => (encoder.to_string(), None),
        None => {
            let fallback = encoder_for(&settings.encoding.fallback_codec)
                .unwrap_or("aac")
                .to_string();
            (fallback, Some(audio.codec_name.clone()))
        }
    };

    let file_name = format!(
        "{}{}.{}",
        file.stem(),
        settings.output.suffix,
        file.extension
    );
    let output_path = root.join(&settings.output.subfolder).join(file_name);

    EncodePlan {
        input_path: file.path.clone(),
        output_path,
        filters,
        audio_codec,
        bitrate_bps,
        duration_secs: audio.duration_secs,
        codec_substituted_from,
    }
}

/// Assemble the filter chain from validated settings.
fn build_filter_graph(settings: &Settings) -> FilterGraph {
    let filters = &settings.filters;
    let mut graph = FilterGraph::new();

    graph.push(FilterStage::Highpass {
        cutoff_hz: filters.highpass_cutoff_hz,
    });

    for band in &filters.eq_bands {
        graph.push(FilterStage::Equalizer(EqBand {
            frequency_hz: band.frequency_hz,
            width: band.width,
            gain_db: band.gain_db,
        }));
    }

    if filters.compression_profile != CompressionProfile::Off {
        graph.push(FilterStage::Compressor(filters.compression_profile));
    }

    graph.push(FilterStage::Loudnorm {
        target_lufs: filters.loudness_target_lufs,
    });

    // Applied last so the normalization target is not skewed by it.
    if filters.volume_boost_db != 0.0 {
        graph.push(FilterStage::Volume {
            gain_db: filters.volume_boost_db,
        });
    }

    graph
}
