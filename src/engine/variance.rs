//! Variance analysis of a 4-D signal against its temporal median.
//!
//! For every time index the volume is compared voxel-by-voxel with the median
//! volume (median across time, which resists outlier volumes that have not yet
//! been scrubbed). The per-voxel variance of that two-sample set is averaged
//! within each slice, then across slices, and both results are divided by the
//! mean intensity of the whole signal so the threshold does not depend on the
//! signal's units.

use ndarray::{Array1, Array2, Array3, ArrayView4, Axis, Zip};
use rayon::prelude::*;
use tracing::debug;

use crate::domain::SliceAxis;
use crate::error::ScrubError;
use crate::math::{pair_variance, temporal_median};

/// Axis number of time in `(x, y, z, t)` signals.
pub const TIME_AXIS: usize = 3;

/// Output of one variance pass.
#[derive(Debug, Clone)]
pub struct VarianceAnalysis {
    /// Normalised variance per time index, shape `(T,)`.
    pub volume: Array1<f64>,
    /// Normalised variance per (time index, slice), shape `(T, S)`.
    pub slice: Array2<f64>,
    /// Per-voxel temporal variance, shape `(X, Y, Z)`. Not normalised.
    pub image: Array3<f64>,
    /// The normaliser: mean of the whole signal.
    pub mean_intensity: f64,
}

/// Check that a signal shape can be analysed: rank 4, non-empty in space,
/// and at least two volumes.
pub fn validate_signal_shape(shape: &[usize]) -> Result<(), ScrubError> {
    if shape.len() != 4 {
        return Err(ScrubError::ShapeMismatch {
            context: "signal rank",
            expected: vec![4],
            actual: vec![shape.len()],
        });
    }
    if shape[..TIME_AXIS].iter().any(|&n| n == 0) {
        return Err(ScrubError::EmptySignal {
            shape: shape.to_vec(),
        });
    }
    if shape[TIME_AXIS] <= 1 {
        return Err(ScrubError::DegenerateTimeseries {
            volumes: shape[TIME_AXIS],
        });
    }
    Ok(())
}

/// Compute volume variance, slice variance and the variance image.
pub fn analyze(signal: ArrayView4<'_, f64>, axis: SliceAxis) -> Result<VarianceAnalysis, ScrubError> {
    validate_signal_shape(signal.shape())?;

    let n_vol = signal.len_of(Axis(TIME_AXIS));
    let n_slice = signal.len_of(Axis(axis.index()));

    let mean_intensity = signal.mean().unwrap_or(f64::NAN);
    if !(mean_intensity.is_finite() && mean_intensity > 0.0) {
        return Err(ScrubError::NonPositiveMeanIntensity(mean_intensity));
    }

    let image = signal.var_axis(Axis(TIME_AXIS), 0.0);
    let reference = signal.map_axis(Axis(TIME_AXIS), |lane| {
        temporal_median(lane).unwrap_or(f64::NAN)
    });

    debug!(
        volumes = n_vol,
        slices = n_slice,
        axis = axis.label(),
        mean_intensity,
        "variance pass"
    );

    // The higher in-plane axis is removed first so the lower one keeps its index.
    let (lo, hi) = axis.in_plane_axes();
    let rows: Vec<Vec<f64>> = (0..n_vol)
        .into_par_iter()
        .map(|t| {
            let volume = signal.index_axis(Axis(TIME_AXIS), t);
            let spread = Zip::from(&volume)
                .and(&reference)
                .map_collect(|&v, &m| pair_variance(v, m));
            spread
                .mean_axis(Axis(hi))
                .and_then(|plane| plane.mean_axis(Axis(lo)))
                .map(|per_slice| per_slice.to_vec())
                .unwrap_or_default()
        })
        .collect();

    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    let actual_len = flat.len();
    let slice_raw = Array2::from_shape_vec((n_vol, n_slice), flat).map_err(|_| ScrubError::ShapeMismatch {
        context: "slice variance",
        expected: vec![n_vol * n_slice],
        actual: vec![actual_len],
    })?;

    let volume_raw = slice_raw.mean_axis(Axis(1)).ok_or(ScrubError::ShapeMismatch {
        context: "volume variance",
        expected: vec![n_vol],
        actual: vec![0],
    })?;

    Ok(VarianceAnalysis {
        volume: volume_raw.mapv(|v| v / mean_intensity),
        slice: slice_raw.mapv(|v| v / mean_intensity),
        image,
        mean_intensity,
    })
}
