//! The detect → flag → scrub loop.
//!
//! `IterationController` is an explicit state machine:
//!
//! ```text
//! Running --(no bad volumes)------------> Converged
//! Running --(mode = off, after pass 1)--> Disabled
//! Running --(whole series excluded)-----> Failed
//! Running --(iteration cap reached)-----> Failed
//! ```
//!
//! The two regressors are owned by the controller and only ever grow
//! (logical OR across iterations). Variance is recomputed from scratch on the
//! working signal every iteration.

use ndarray::{Array1, Array2, Array4, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{ScrubConfig, ScrubMode};
use crate::engine::scrub::{scrub_slices, scrub_volumes};
use crate::engine::threshold::{flag, Flags};
use crate::engine::variance::{analyze, validate_signal_shape, VarianceAnalysis, TIME_AXIS};
use crate::error::ScrubError;

/// Controller state.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Running,
    /// A variance pass flagged zero volumes.
    Converged,
    /// Scrubbing is off; a single detection pass was made.
    Disabled,
    /// The loop stopped on an unrecoverable condition.
    Failed(ScrubError),
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ControllerState::Running)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControllerState::Running => "running",
            ControllerState::Converged => "converged",
            ControllerState::Disabled => "disabled",
            ControllerState::Failed(_) => "failed",
        }
    }
}

/// Everything observed during one completed iteration.
#[derive(Debug, Clone)]
pub struct IterationReport {
    /// 1-based.
    pub iteration: usize,
    pub variance: VarianceAnalysis,
    pub flags: Flags,
    /// Volumes flagged this iteration that were not flagged before.
    pub newly_flagged_volumes: usize,
    pub newly_flagged_slices: usize,
}

/// Per-iteration counts kept for the final summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationSummary {
    pub iteration: usize,
    pub bad_volumes: usize,
    pub bad_slices: usize,
    pub newly_flagged_volumes: usize,
    pub newly_flagged_slices: usize,
}

impl From<&IterationReport> for IterationSummary {
    fn from(report: &IterationReport) -> Self {
        Self {
            iteration: report.iteration,
            bad_volumes: report.flags.bad_volumes(),
            bad_slices: report.flags.bad_slices(),
            newly_flagged_volumes: report.newly_flagged_volumes,
            newly_flagged_slices: report.newly_flagged_slices,
        }
    }
}

/// Final result of a controller run.
#[derive(Debug, Clone)]
pub struct ScrubOutcome {
    pub state: ControllerState,
    /// Number of completed iterations.
    pub iterations: usize,
    pub volume_regressor: Array1<bool>,
    pub slice_regressor: Array2<bool>,
    /// Final working signal (identical to the input when scrubbing is off).
    pub signal: Array4<f64>,
    pub history: Vec<IterationSummary>,
}

impl ScrubOutcome {
    pub fn flagged_volumes(&self) -> usize {
        self.volume_regressor.iter().filter(|&&b| b).count()
    }

    pub fn flagged_slices(&self) -> usize {
        self.slice_regressor.iter().filter(|&&b| b).count()
    }

    /// The failure that ended the run, if any.
    pub fn error(&self) -> Option<&ScrubError> {
        match &self.state {
            ControllerState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct IterationController {
    config: ScrubConfig,
    state: ControllerState,
    completed: usize,
    signal: Array4<f64>,
    volume_regressor: Array1<bool>,
    slice_regressor: Array2<bool>,
    history: Vec<IterationSummary>,
}

impl IterationController {
    /// Validate configuration and preconditions; no variance work happens here.
    pub fn new(signal: Array4<f64>, config: ScrubConfig) -> Result<Self, ScrubError> {
        config.validate()?;
        validate_signal_shape(signal.shape())?;

        let n_vol = signal.len_of(Axis(TIME_AXIS));
        let n_slice = signal.len_of(Axis(config.slice_axis.index()));

        Ok(Self {
            config,
            state: ControllerState::Running,
            completed: 0,
            signal,
            volume_regressor: Array1::from_elem(n_vol, false),
            slice_regressor: Array2::from_elem((n_vol, n_slice), false),
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn volume_regressor(&self) -> &Array1<bool> {
        &self.volume_regressor
    }

    /// Run one iteration.
    ///
    /// Returns `None` when the controller is already terminal, or when this
    /// iteration failed; in the latter case the state is `Failed`, the
    /// regressors keep that iteration's flags and the working signal is left
    /// as it was before the iteration.
    pub fn step(&mut self) -> Option<IterationReport> {
        if self.state.is_terminal() {
            return None;
        }

        if let Some(limit) = self.config.max_iterations {
            if self.completed >= limit {
                warn!(limit, "iteration cap reached before convergence");
                self.state = ControllerState::Failed(ScrubError::IterationLimit { limit });
                return None;
            }
        }

        let iteration = self.completed + 1;
        match self.iterate(iteration) {
            Ok(report) => {
                self.completed = iteration;
                self.history.push(IterationSummary::from(&report));
                Some(report)
            }
            Err(err) => {
                warn!(iteration, error = %err, "scrubbing failed");
                self.state = ControllerState::Failed(err);
                None
            }
        }
    }

    /// Drive the loop to a terminal state, handing each iteration to `sink`.
    ///
    /// Sink errors abort the loop and are returned as-is.
    pub fn run<E, F>(mut self, mut sink: F) -> Result<ScrubOutcome, E>
    where
        F: FnMut(&IterationReport) -> Result<(), E>,
    {
        while let Some(report) = self.step() {
            sink(&report)?;
        }
        Ok(self.finish())
    }

    pub fn finish(self) -> ScrubOutcome {
        ScrubOutcome {
            state: self.state,
            iterations: self.completed,
            volume_regressor: self.volume_regressor,
            slice_regressor: self.slice_regressor,
            signal: self.signal,
            history: self.history,
        }
    }

    fn iterate(&mut self, iteration: usize) -> Result<IterationReport, ScrubError> {
        let variance = analyze(self.signal.view(), self.config.slice_axis)?;
        let flags = flag(&variance.volume, &variance.slice, self.config.threshold)?;

        let newly_flagged_volumes = Zip::from(&flags.volume)
            .and(&self.volume_regressor)
            .fold(0usize, |n, &now, &before| n + usize::from(now && !before));
        let newly_flagged_slices = Zip::from(&flags.slice)
            .and(&self.slice_regressor)
            .fold(0usize, |n, &now, &before| n + usize::from(now && !before));

        self.volume_regressor = Zip::from(&self.volume_regressor)
            .and(&flags.volume)
            .map_collect(|&a, &b| a || b);
        self.slice_regressor = Zip::from(&self.slice_regressor)
            .and(&flags.slice)
            .map_collect(|&a, &b| a || b);

        let scrubbed = match self.config.mode {
            ScrubMode::Off => None,
            ScrubMode::Volume => Some(scrub_volumes(&self.signal, &self.volume_regressor)?),
            ScrubMode::Slice => Some(scrub_slices(
                &self.signal,
                self.slice_regressor.view(),
                self.config.slice_axis,
            )?),
        };
        if let Some(signal) = scrubbed {
            self.signal = signal;
        }

        info!(
            iteration,
            bad_volumes = flags.bad_volumes(),
            bad_slices = flags.bad_slices(),
            newly_flagged_volumes,
            "iteration complete"
        );

        if self.config.mode == ScrubMode::Off {
            self.state = ControllerState::Disabled;
        } else if flags.bad_volumes() == 0 {
            debug!(iteration, "no bad volumes left");
            self.state = ControllerState::Converged;
        }

        Ok(IterationReport {
            iteration,
            variance,
            flags,
            newly_flagged_volumes,
            newly_flagged_slices,
        })
    }
}

/// Run the controller to completion without a diagnostics sink.
pub fn scrub_signal(signal: Array4<f64>, config: ScrubConfig) -> Result<ScrubOutcome, ScrubError> {
    let controller = IterationController::new(signal, config)?;
    controller.run(|_| Ok::<(), ScrubError>(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SliceAxis;

    fn config(mode: ScrubMode) -> ScrubConfig {
        ScrubConfig {
            slice_axis: SliceAxis::Z,
            threshold: 5.0,
            mode,
            max_iterations: None,
        }
    }

    fn flat_signal(n_vol: usize) -> Array4<f64> {
        Array4::from_elem((2, 2, 2, n_vol), 100.0)
    }

    /// Flat signal at 100 with every voxel of volume `t` raised by `bump`.
    fn spiked_signal(n_vol: usize, t: usize, bump: f64) -> Array4<f64> {
        let mut signal = flat_signal(n_vol);
        signal.index_axis_mut(Axis(TIME_AXIS), t).mapv_inplace(|v| v + bump);
        signal
    }

    #[test]
    fn clean_signal_converges_on_first_iteration() {
        let input = flat_signal(6);
        let outcome = scrub_signal(input.clone(), config(ScrubMode::Volume)).unwrap();

        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.iterations, 1);
        assert!(outcome.volume_regressor.iter().all(|&b| !b));
        assert!(outcome.slice_regressor.iter().all(|&b| !b));
        assert_eq!(outcome.signal, input);
    }

    #[test]
    fn spike_is_flagged_scrubbed_and_converges() {
        let input = spiked_signal(6, 2, 100.0);
        let outcome = scrub_signal(input, config(ScrubMode::Volume)).unwrap();

        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(
            outcome.volume_regressor.to_vec(),
            vec![false, false, true, false, false, false]
        );
        assert!(outcome.signal.iter().all(|&v| v == 100.0));
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history[0].bad_volumes, 1);
        assert_eq!(outcome.history[0].newly_flagged_volumes, 1);
        assert_eq!(outcome.history[1].bad_volumes, 0);
    }

    #[test]
    fn off_mode_never_modifies_the_signal() {
        let input = spiked_signal(6, 4, 100.0);
        let outcome = scrub_signal(input.clone(), config(ScrubMode::Off)).unwrap();

        assert_eq!(outcome.state, ControllerState::Disabled);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.signal, input);
        assert!(outcome.volume_regressor[4]);
        assert_eq!(outcome.flagged_volumes(), 1);
    }

    #[test]
    fn slice_mode_only_touches_the_flagged_slice() {
        let mut input = flat_signal(6);
        input
            .index_axis_mut(Axis(2), 1)
            .index_axis_mut(Axis(2), 3)
            .mapv_inplace(|v| v + 200.0);

        let outcome = scrub_signal(input, config(ScrubMode::Slice)).unwrap();

        assert_eq!(outcome.state, ControllerState::Converged);
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.volume_regressor[3]);
        assert!(outcome.slice_regressor[[3, 1]]);
        assert!(!outcome.slice_regressor[[3, 0]]);
        assert!(outcome.signal.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn regressors_only_grow_across_iterations() {
        let mut input = flat_signal(8);
        input.index_axis_mut(Axis(TIME_AXIS), 2).mapv_inplace(|v| v + 150.0);
        input.index_axis_mut(Axis(TIME_AXIS), 6).mapv_inplace(|v| v + 60.0);

        let mut controller = IterationController::new(input, config(ScrubMode::Volume)).unwrap();
        let mut snapshots = vec![controller.volume_regressor().clone()];
        while controller.step().is_some() {
            snapshots.push(controller.volume_regressor().clone());
        }

        assert_eq!(controller.state(), &ControllerState::Converged);
        for pair in snapshots.windows(2) {
            for (before, after) in pair[0].iter().zip(pair[1].iter()) {
                assert!(!before || *after, "a flag was cleared");
            }
        }
        assert!(snapshots.last().unwrap()[2]);
    }

    #[test]
    fn whole_series_exclusion_fails_without_touching_the_signal() {
        // Two voxels with timecourses [1, 2, 3] and [2, 3, 1]: every volume differs
        // from the median somewhere, so a tiny threshold flags them all.
        let input = Array4::from_shape_vec((2, 1, 1, 3), vec![1.0, 2.0, 3.0, 2.0, 3.0, 1.0]).unwrap();
        let mut cfg = config(ScrubMode::Volume);
        cfg.threshold = 0.01;

        let mut controller = IterationController::new(input.clone(), cfg).unwrap();
        assert!(controller.step().is_none());
        assert_eq!(
            controller.state(),
            &ControllerState::Failed(ScrubError::WholeSeriesExcluded { volumes: 3 })
        );
        assert!(controller.step().is_none());

        let outcome = controller.finish();
        assert_eq!(outcome.iterations, 0);
        assert_eq!(outcome.signal, input);
        assert!(outcome.error().is_some());
        // The failing pass's flags survive even though nothing was scrubbed.
        assert!(outcome.volume_regressor.iter().all(|&b| b));
        assert_eq!(outcome.flagged_volumes(), 3);
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn iteration_cap_ends_in_failure() {
        let input = spiked_signal(6, 2, 100.0);
        let mut cfg = config(ScrubMode::Volume);
        cfg.max_iterations = Some(1);

        let outcome = scrub_signal(input, cfg).unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(
            outcome.state,
            ControllerState::Failed(ScrubError::IterationLimit { limit: 1 })
        );
        assert!(outcome.volume_regressor[2]);
    }

    #[test]
    fn preconditions_are_checked_up_front() {
        assert_eq!(
            IterationController::new(flat_signal(1), config(ScrubMode::Volume)).err(),
            Some(ScrubError::DegenerateTimeseries { volumes: 1 })
        );

        let mut cfg = config(ScrubMode::Volume);
        cfg.threshold = -1.0;
        assert_eq!(
            IterationController::new(flat_signal(4), cfg).err(),
            Some(ScrubError::InvalidThreshold(-1.0))
        );
    }

    #[test]
    fn sink_sees_every_completed_iteration() {
        let input = spiked_signal(6, 0, 100.0);
        let controller = IterationController::new(input, config(ScrubMode::Volume)).unwrap();

        let mut seen = Vec::new();
        let outcome = controller
            .run(|report| {
                seen.push((report.iteration, report.variance.volume.len()));
                Ok::<(), ScrubError>(())
            })
            .unwrap();

        assert_eq!(seen, vec![(1, 6), (2, 6)]);
        assert_eq!(outcome.iterations, 2);
    }
}
