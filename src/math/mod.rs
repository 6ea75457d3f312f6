//! Numeric utilities: robust central tendency and two-sample variance.

pub mod stats;

pub use stats::*;
