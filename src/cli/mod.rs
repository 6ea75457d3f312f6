//! Command-line parsing for `tsvar`.
//!
//! Argument parsing and command dispatch stay separate from the engine. Scrub
//! settings can also come from the environment (or a `.env` file); an explicit
//! flag always wins.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{ScrubMode, SliceAxis, DEFAULT_THRESHOLD};
use crate::logging::DEFAULT_LOG_LEVEL;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tsvar", version, about = "Variance-based artifact detection and scrubbing for 4-D signals")]
pub struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. warn, info, debug).
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect bad volumes/slices, scrub them, and write regressors and diagnostics.
    Run(RunArgs),
    /// Re-plot variance traces and regressors exported by `tsvar run`.
    Plot(PlotArgs),
    /// Write a synthetic signal with injected volume and slice spikes.
    Synth(SynthArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Input 4-D signal (JSON volume container).
    #[arg(short = 'd', long, value_name = "JSON")]
    pub data: PathBuf,

    /// Basename for all output files (`<base>_volumereg.csv`, ...).
    #[arg(short = 'o', long, value_name = "BASE")]
    pub output: PathBuf,

    /// Spatial axis treated as the slice direction (x, y or z).
    #[arg(short = 'a', long, env = "TSVAR_SLICE_AXIS", default_value_t = SliceAxis::Z)]
    pub slice_axis: SliceAxis,

    /// Normalised variance above which a volume or slice is flagged.
    #[arg(short = 't', long, env = "TSVAR_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Scrubbing granularity, or `off` to only detect.
    #[arg(short = 's', long, value_enum, env = "TSVAR_SCRUB", default_value_t = ScrubMode::Volume)]
    pub scrub: ScrubMode,

    /// Stop with an error if not converged after this many iterations.
    #[arg(long, env = "TSVAR_MAX_ITERATIONS", value_parser = parse_positive)]
    pub max_iterations: Option<usize>,

    /// Save per-iteration volume and slice variance CSVs.
    #[arg(long)]
    pub save_var: bool,

    /// Save the final volume and slice regressors as 0/1 CSVs.
    #[arg(long)]
    pub save_reg: bool,

    /// Save the per-iteration voxel variance image.
    #[arg(long)]
    pub save_varimg: bool,

    /// Save a JSON run summary.
    #[arg(long)]
    pub save_summary: bool,

    /// Render ASCII plots of the last iteration.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct PlotArgs {
    /// Basename given to `tsvar run --output`.
    #[arg(short = 'i', long, value_name = "BASE")]
    pub input: PathBuf,

    /// Threshold line drawn on variance traces.
    #[arg(short = 't', long, env = "TSVAR_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Plot width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 16)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output path for the generated signal (JSON volume container).
    #[arg(short = 'o', long, value_name = "JSON")]
    pub output: PathBuf,

    /// Signal shape as X,Y,Z,T.
    #[arg(long, value_parser = parse_shape, default_value = "8,8,6,40")]
    pub shape: [usize; 4],

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean intensity of the clean signal.
    #[arg(long, default_value_t = 100.0)]
    pub baseline: f64,

    /// Standard deviation of per-sample Gaussian noise.
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Probability of a whole-volume spike at each time index.
    #[arg(long, default_value_t = 0.05)]
    pub spike_prob: f64,

    /// Spike magnitude as a multiple of the baseline.
    #[arg(long, default_value_t = 1.0)]
    pub spike_scale: f64,

    /// Probability of a single-slice spike at each (time, slice).
    #[arg(long, default_value_t = 0.01)]
    pub slice_spike_prob: f64,

    /// Axis along which single-slice spikes are injected (x, y or z).
    #[arg(long, default_value_t = SliceAxis::Z)]
    pub slice_axis: SliceAxis,
}

fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive integer, got '{raw}'")),
    }
}

fn parse_shape(raw: &str) -> Result<[usize; 4], String> {
    let parts: Vec<usize> = raw
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid shape '{raw}': {e}"))?;
    <[usize; 4]>::try_from(parts.as_slice())
        .map_err(|_| format!("invalid shape '{raw}': expected 4 comma-separated sizes X,Y,Z,T"))
}
