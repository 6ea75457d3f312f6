//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - threaded through the detect/scrub loop
//! - exported to JSON/CSV
//! - reloaded later for plotting

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ScrubError;

/// Spatial axis iterated as "slices" for slice-granularity analysis.
///
/// Signals are laid out `(x, y, z, t)`, so the axis index doubles as the
/// ndarray axis number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceAxis {
    X,
    Y,
    #[default]
    Z,
}

impl SliceAxis {
    pub const ALL: [SliceAxis; 3] = [SliceAxis::X, SliceAxis::Y, SliceAxis::Z];

    /// Array axis number of the slice direction.
    pub fn index(self) -> usize {
        match self {
            SliceAxis::X => 0,
            SliceAxis::Y => 1,
            SliceAxis::Z => 2,
        }
    }

    /// The two spatial axes averaged over when reducing a volume to one value per slice.
    ///
    /// Ascending order.
    pub fn in_plane_axes(self) -> (usize, usize) {
        match self {
            SliceAxis::X => (1, 2),
            SliceAxis::Y => (0, 2),
            SliceAxis::Z => (0, 1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SliceAxis::X => "x",
            SliceAxis::Y => "y",
            SliceAxis::Z => "z",
        }
    }
}

impl fmt::Display for SliceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Case-insensitive; this is what the CLI and `TSVAR_SLICE_AXIS` go through.
impl FromStr for SliceAxis {
    type Err = ScrubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(SliceAxis::X),
            "y" => Ok(SliceAxis::Y),
            "z" => Ok(SliceAxis::Z),
            _ => Err(ScrubError::InvalidAxis(s.to_string())),
        }
    }
}

/// What the controller does with flagged time indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScrubMode {
    /// Replace whole volumes.
    #[default]
    Volume,
    /// Replace one slice at a time, each slice driven by its own regressor column.
    Slice,
    /// Detect only; the signal is never modified.
    Off,
}

impl ScrubMode {
    pub fn display_name(self) -> &'static str {
        match self {
            ScrubMode::Volume => "volume",
            ScrubMode::Slice => "slice",
            ScrubMode::Off => "off",
        }
    }
}

/// A maximal block of consecutive flagged time indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub start: usize,
    pub len: usize,
}

impl Run {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Exclusive end index (the first unflagged index after the run).
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// The last unflagged index before the run, if any.
    pub fn before(&self) -> Option<usize> {
        self.start.checked_sub(1)
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// Engine configuration for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrubConfig {
    pub slice_axis: SliceAxis,
    /// Normalised variance above which a volume/slice is flagged.
    pub threshold: f64,
    pub mode: ScrubMode,
    /// Optional safety cap on loop iterations.
    ///
    /// `None` runs until convergence. When set and reached without convergence,
    /// the run ends in the Failed state with `ScrubError::IterationLimit`.
    pub max_iterations: Option<usize>,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            slice_axis: SliceAxis::Z,
            threshold: DEFAULT_THRESHOLD,
            mode: ScrubMode::Volume,
            max_iterations: None,
        }
    }
}

impl ScrubConfig {
    pub fn validate(&self) -> Result<(), ScrubError> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ScrubError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

pub const DEFAULT_THRESHOLD: f64 = 5.0;

/// A full `tsvar run` configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_path: PathBuf,
    /// Basename for every output file.
    pub output: PathBuf,
    pub scrub: ScrubConfig,

    pub save_var: bool,
    pub save_reg: bool,
    pub save_varimg: bool,
    pub save_summary: bool,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
}

/// Parameters for synthetic signal generation.
#[derive(Debug, Clone)]
pub struct SynthConfig {
    /// `(x, y, z, t)`.
    pub shape: [usize; 4],
    pub seed: u64,
    /// Mean intensity of the clean signal.
    pub baseline: f64,
    /// Standard deviation of the per-voxel Gaussian noise.
    pub noise_sd: f64,
    /// Probability that a volume receives a whole-volume spike.
    pub spike_prob: f64,
    /// Spike magnitude as a multiple of `baseline`.
    pub spike_scale: f64,
    /// Probability that a (volume, slice) pair receives a single-slice spike.
    pub slice_spike_prob: f64,
    pub slice_axis: SliceAxis,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            shape: [8, 8, 6, 40],
            seed: 42,
            baseline: 100.0,
            noise_sd: 1.0,
            spike_prob: 0.05,
            spike_scale: 1.0,
            slice_spike_prob: 0.01,
            slice_axis: SliceAxis::Z,
        }
    }
}

/// On-disk volume container (JSON).
///
/// `data` is row-major over `shape` (last axis fastest). The affine is opaque
/// spatial metadata copied from inputs to outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeFile {
    pub tool: String,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub affine: Option<[[f64; 4]; 4]>,
    pub data: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_axis_parses_case_insensitively() {
        assert_eq!("X".parse::<SliceAxis>().unwrap(), SliceAxis::X);
        assert_eq!(" z ".parse::<SliceAxis>().unwrap(), SliceAxis::Z);
        assert!(matches!("w".parse::<SliceAxis>(), Err(ScrubError::InvalidAxis(_))));
        for axis in SliceAxis::ALL {
            assert_eq!(axis.to_string().parse::<SliceAxis>().unwrap(), axis);
        }
    }

    #[test]
    fn in_plane_axes_exclude_slice_axis() {
        for axis in SliceAxis::ALL {
            let (a, b) = axis.in_plane_axes();
            assert!(a < b);
            assert_ne!(a, axis.index());
            assert_ne!(b, axis.index());
        }
    }

    #[test]
    fn run_boundaries() {
        let run = Run::new(0, 2);
        assert_eq!(run.before(), None);
        assert_eq!(run.end(), 2);

        let run = Run::new(3, 2);
        assert_eq!(run.before(), Some(2));
        assert_eq!(run.indices().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn config_rejects_non_positive_threshold() {
        let mut config = ScrubConfig::default();
        assert!(config.validate().is_ok());
        config.threshold = 0.0;
        assert_eq!(config.validate(), Err(ScrubError::InvalidThreshold(0.0)));
        config.threshold = f64::NAN;
        assert!(config.validate().is_err());
    }
}
