//! The `tsvar run` workflow.
//!
//! load signal -> controller loop (per-iteration exports) -> final exports
//!
//! The front-end only prints what comes back.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{RunConfig, ScrubMode};
use crate::engine::{IterationController, IterationReport, ScrubOutcome, VarianceAnalysis};
use crate::error::AppError;
use crate::io::{
    read_signal, scrubbed_signal_path, slice_regressor_path, slice_variance_path, summary_path,
    variance_image_path, volume_regressor_path, volume_variance_path, write_column_csv, write_matrix_csv,
    write_slice_regressor_csv, write_summary_json, write_volume, write_volume_regressor_csv, Affine,
    RunSummary,
};

/// Variance of the last completed iteration, kept for plotting.
#[derive(Debug, Clone)]
pub struct LastIteration {
    pub iteration: usize,
    pub variance: VarianceAnalysis,
}

/// All outputs of a single `tsvar run`.
#[derive(Debug, Clone)]
pub struct ScrubRun {
    pub outcome: ScrubOutcome,
    pub last_iteration: Option<LastIteration>,
    /// Files written, in order.
    pub written: Vec<PathBuf>,
}

/// Execute the full run. A Failed outcome is returned, not raised; final
/// outputs are only written for Converged/Disabled runs.
pub fn run_scrub(config: &RunConfig) -> Result<ScrubRun, AppError> {
    let loaded = read_signal(&config.data_path)?;
    info!(
        path = %config.data_path.display(),
        shape = ?loaded.signal.shape(),
        axis = config.scrub.slice_axis.label(),
        mode = config.scrub.mode.display_name(),
        "loaded signal"
    );

    let affine = loaded.affine;
    let controller = IterationController::new(loaded.signal, config.scrub)?;

    let mut written = Vec::new();
    let mut last_iteration = None;
    let outcome = controller.run(|report| {
        written.extend(write_iteration_outputs(config, report, affine)?);
        last_iteration = Some(LastIteration {
            iteration: report.iteration,
            variance: report.variance.clone(),
        });
        Ok::<(), AppError>(())
    })?;

    if outcome.error().is_none() {
        written.extend(write_final_outputs(config, &outcome, affine)?);
    } else {
        debug!("run failed; final outputs skipped");
    }

    Ok(ScrubRun {
        outcome,
        last_iteration,
        written,
    })
}

fn write_iteration_outputs(
    config: &RunConfig,
    report: &IterationReport,
    affine: Option<Affine>,
) -> Result<Vec<PathBuf>, AppError> {
    let base = &config.output;
    let i = report.iteration;
    let mut written = Vec::new();

    if config.save_var {
        let path = volume_variance_path(base, i);
        write_column_csv(&path, report.variance.volume.view())?;
        written.push(path);

        let path = slice_variance_path(base, i);
        write_matrix_csv(&path, report.variance.slice.view())?;
        written.push(path);
    }
    if config.save_varimg {
        let path = variance_image_path(base, i);
        write_volume(&path, report.variance.image.view(), affine)?;
        written.push(path);
    }
    Ok(written)
}

fn write_final_outputs(
    config: &RunConfig,
    outcome: &ScrubOutcome,
    affine: Option<Affine>,
) -> Result<Vec<PathBuf>, AppError> {
    let base = &config.output;
    let mut written = Vec::new();

    if config.save_reg {
        let path = volume_regressor_path(base);
        write_volume_regressor_csv(&path, &outcome.volume_regressor)?;
        written.push(path);

        let path = slice_regressor_path(base);
        write_slice_regressor_csv(&path, &outcome.slice_regressor)?;
        written.push(path);
    }
    if config.scrub.mode != ScrubMode::Off {
        let path = scrubbed_signal_path(base);
        write_volume(&path, outcome.signal.view(), affine)?;
        written.push(path);
    }
    if config.save_summary {
        let path = summary_path(base);
        let summary = RunSummary::from_outcome(&config.data_path, &config.scrub, outcome);
        write_summary_json(&path, &summary)?;
        written.push(path);
    }
    Ok(written)
}
