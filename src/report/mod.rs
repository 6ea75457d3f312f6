//! Terminal reports for runs and synthetic data.

pub mod format;

pub use format::{format_run_summary, format_synth_summary};
