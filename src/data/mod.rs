//! Synthetic input data.

pub mod synth;

pub use synth::{generate_signal, SynthSignal};
