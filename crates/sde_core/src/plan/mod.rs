//! Encode planning.
//!
//! Turns probed audio facts plus validated settings into an `EncodePlan`:
//! the ordered filter graph, target codec/bitrate, and output path for
//! one file. Planning is pure (no I/O, no clock); identical inputs
//! always produce identical plans.

mod builder;

pub use builder::{build_plan, encoder_for, is_known_encoder};
