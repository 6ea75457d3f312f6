//! Replace flagged runs with data from their unflagged temporal neighbours.
//!
//! Replacement policy for a run `[start, end)` over `T` time indices:
//! - both neighbours exist: elementwise mean of `start - 1` and `end`
//! - run touches index 0: copy of `end`
//! - run touches index `T - 1`: copy of `start - 1`
//! - run covers the whole series: `ScrubError::WholeSeriesExcluded`
//!
//! The replacement is computed once per run and broadcast over every time
//! index in the run. Scrubbing always works on a copy; the caller's signal is
//! never touched, and nothing outside the runs changes.

use ndarray::parallel::prelude::*;
use ndarray::{Array, Array1, Array4, ArrayView, ArrayView2, ArrayViewMut, Axis, RemoveAxis, Zip};

use crate::domain::{Run, SliceAxis};
use crate::engine::runs::find_runs;
use crate::engine::variance::TIME_AXIS;
use crate::error::ScrubError;

/// Time axis of a single-slice slab (one spatial axis removed).
const SLAB_TIME_AXIS: usize = TIME_AXIS - 1;

/// Which part of each flagged time index is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrubTarget {
    /// Whole volumes.
    Volume,
    /// Only the cross-section `index` along `axis`.
    Slice { axis: SliceAxis, index: usize },
}

/// Scrub `runs` out of `signal` at the requested granularity.
pub fn scrub(signal: &Array4<f64>, runs: &[Run], target: ScrubTarget) -> Result<Array4<f64>, ScrubError> {
    let mut out = signal.clone();
    match target {
        ScrubTarget::Volume => apply_runs(out.view_mut(), Axis(TIME_AXIS), runs)?,
        ScrubTarget::Slice { axis, index } => {
            let n_slice = out.len_of(Axis(axis.index()));
            if index >= n_slice {
                return Err(ScrubError::ShapeMismatch {
                    context: "slice index",
                    expected: vec![n_slice],
                    actual: vec![index],
                });
            }
            let slab = out.index_axis_mut(Axis(axis.index()), index);
            apply_runs(slab, Axis(SLAB_TIME_AXIS), runs)?;
        }
    }
    Ok(out)
}

/// Volume-granularity scrub driven by a volume regressor.
pub fn scrub_volumes(signal: &Array4<f64>, regressor: &Array1<bool>) -> Result<Array4<f64>, ScrubError> {
    let n_vol = signal.len_of(Axis(TIME_AXIS));
    if regressor.len() != n_vol {
        return Err(ScrubError::ShapeMismatch {
            context: "volume regressor",
            expected: vec![n_vol],
            actual: vec![regressor.len()],
        });
    }
    let runs = find_runs(regressor);
    scrub(signal, &runs, ScrubTarget::Volume)
}

/// Slice-granularity scrub driven by a `(T, S)` slice regressor.
///
/// Column `s` of the regressor decides the runs for slice `s` only. Slabs
/// never alias, so they are processed in parallel.
pub fn scrub_slices(
    signal: &Array4<f64>,
    regressor: ArrayView2<'_, bool>,
    axis: SliceAxis,
) -> Result<Array4<f64>, ScrubError> {
    let expected = (signal.len_of(Axis(TIME_AXIS)), signal.len_of(Axis(axis.index())));
    if regressor.dim() != expected {
        return Err(ScrubError::ShapeMismatch {
            context: "slice regressor",
            expected: vec![expected.0, expected.1],
            actual: regressor.shape().to_vec(),
        });
    }

    let plans: Vec<Vec<Run>> = regressor
        .axis_iter(Axis(1))
        .map(find_runs)
        .collect();

    let mut out = signal.clone();
    out.axis_iter_mut(Axis(axis.index()))
        .into_par_iter()
        .enumerate()
        .try_for_each(|(s, slab)| apply_runs(slab, Axis(SLAB_TIME_AXIS), &plans[s]))?;
    Ok(out)
}

fn apply_runs<D: RemoveAxis>(
    mut series: ArrayViewMut<'_, f64, D>,
    time_axis: Axis,
    runs: &[Run],
) -> Result<(), ScrubError> {
    let n_time = series.len_of(time_axis);
    for run in runs {
        if run.len == 0 {
            continue;
        }
        if run.end() > n_time {
            return Err(ScrubError::ShapeMismatch {
                context: "run end",
                expected: vec![n_time],
                actual: vec![run.end()],
            });
        }
        let fill = boundary_fill(series.view(), time_axis, *run)?;
        for t in run.indices() {
            series.index_axis_mut(time_axis, t).assign(&fill);
        }
    }
    Ok(())
}

fn boundary_fill<D: RemoveAxis>(
    series: ArrayView<'_, f64, D>,
    time_axis: Axis,
    run: Run,
) -> Result<Array<f64, D::Smaller>, ScrubError> {
    let n_time = series.len_of(time_axis);
    let after = run.end();
    match (run.before(), after < n_time) {
        (Some(before), true) => {
            let prev = series.index_axis(time_axis, before);
            let next = series.index_axis(time_axis, after);
            Ok(Zip::from(&prev).and(&next).map_collect(|&a, &b| (a + b) / 2.0))
        }
        (None, true) => Ok(series.index_axis(time_axis, after).to_owned()),
        (Some(before), false) => Ok(series.index_axis(time_axis, before).to_owned()),
        (None, false) => Err(ScrubError::WholeSeriesExcluded { volumes: n_time }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2, Array3};

    /// Five volumes whose voxels are all distinct.
    fn signal() -> Array4<f64> {
        Array4::from_shape_fn((2, 2, 3, 5), |(x, y, z, t)| {
            1.0 + (t * t) as f64 * 7.0 + x as f64 + 2.0 * y as f64 + 4.0 * z as f64
        })
    }

    fn volume(a: &Array4<f64>, t: usize) -> Array3<f64> {
        a.index_axis(Axis(TIME_AXIS), t).to_owned()
    }

    fn regressor(flags: &[bool]) -> Array1<bool> {
        arr1(flags)
    }

    #[test]
    fn interior_run_uses_mean_of_neighbours() {
        let input = signal();
        let out = scrub_volumes(&input, &regressor(&[false, true, true, false, false])).unwrap();

        let expected = (&volume(&input, 0) + &volume(&input, 3)) / 2.0;
        assert_eq!(volume(&out, 1), expected);
        assert_eq!(volume(&out, 2), expected);
        for t in [0, 3, 4] {
            assert_eq!(volume(&out, t), volume(&input, t));
        }
        assert_eq!(out.shape(), input.shape());
    }

    #[test]
    fn start_edge_run_copies_successor() {
        let input = signal();
        let out = scrub_volumes(&input, &regressor(&[true, true, false, false, false])).unwrap();

        assert_eq!(volume(&out, 0), volume(&input, 2));
        assert_eq!(volume(&out, 1), volume(&input, 2));
        for t in 2..5 {
            assert_eq!(volume(&out, t), volume(&input, t));
        }
    }

    #[test]
    fn end_edge_run_copies_predecessor() {
        let input = signal();
        let out = scrub_volumes(&input, &regressor(&[false, false, false, true, true])).unwrap();

        assert_eq!(volume(&out, 3), volume(&input, 2));
        assert_eq!(volume(&out, 4), volume(&input, 2));
        for t in 0..3 {
            assert_eq!(volume(&out, t), volume(&input, t));
        }
    }

    #[test]
    fn whole_series_run_is_an_error() {
        let input = signal();
        let before = input.clone();
        let err = scrub_volumes(&input, &regressor(&[true; 5])).unwrap_err();
        assert_eq!(err, ScrubError::WholeSeriesExcluded { volumes: 5 });
        assert_eq!(input, before);
    }

    #[test]
    fn several_runs_in_one_pass() {
        let input = signal();
        let out = scrub_volumes(&input, &regressor(&[true, false, true, false, true])).unwrap();

        assert_eq!(volume(&out, 0), volume(&input, 1));
        assert_eq!(volume(&out, 2), (&volume(&input, 1) + &volume(&input, 3)) / 2.0);
        assert_eq!(volume(&out, 4), volume(&input, 3));
        assert_eq!(volume(&out, 1), volume(&input, 1));
        assert_eq!(volume(&out, 3), volume(&input, 3));
    }

    #[test]
    fn slice_scrub_leaves_other_slices_untouched() {
        let input = signal();
        let out = scrub(
            &input,
            &[Run::new(1, 2)],
            ScrubTarget::Slice { axis: SliceAxis::Z, index: 1 },
        )
        .unwrap();

        assert_eq!(out.shape(), input.shape());
        for s in [0, 2] {
            assert_eq!(out.index_axis(Axis(2), s), input.index_axis(Axis(2), s));
        }

        let slab_in = input.index_axis(Axis(2), 1);
        let slab_out = out.index_axis(Axis(2), 1);
        let expected = (&slab_in.index_axis(Axis(2), 0) + &slab_in.index_axis(Axis(2), 3)) / 2.0;
        assert_eq!(slab_out.index_axis(Axis(2), 1), expected);
        assert_eq!(slab_out.index_axis(Axis(2), 2), expected);
        assert_eq!(slab_out.index_axis(Axis(2), 4), slab_in.index_axis(Axis(2), 4));
    }

    #[test]
    fn slice_scrub_along_x_axis() {
        let input = signal();
        let out = scrub(
            &input,
            &[Run::new(4, 1)],
            ScrubTarget::Slice { axis: SliceAxis::X, index: 0 },
        )
        .unwrap();

        assert_eq!(out.index_axis(Axis(0), 1), input.index_axis(Axis(0), 1));
        let slab_in = input.index_axis(Axis(0), 0);
        assert_eq!(
            out.index_axis(Axis(0), 0).index_axis(Axis(2), 4),
            slab_in.index_axis(Axis(2), 3)
        );
    }

    #[test]
    fn slice_run_at_series_start_copies_successor() {
        let input = signal();
        let out = scrub(
            &input,
            &[Run::new(0, 1)],
            ScrubTarget::Slice { axis: SliceAxis::Z, index: 2 },
        )
        .unwrap();

        let slab_in = input.index_axis(Axis(2), 2);
        let slab_out = out.index_axis(Axis(2), 2);
        assert_eq!(slab_out.index_axis(Axis(2), 0), slab_in.index_axis(Axis(2), 1));
        for t in 1..5 {
            assert_eq!(slab_out.index_axis(Axis(2), t), slab_in.index_axis(Axis(2), t));
        }
        for z in 0..2 {
            assert_eq!(out.index_axis(Axis(2), z), input.index_axis(Axis(2), z));
        }
    }

    #[test]
    fn regressor_driven_slice_scrub_matches_per_slice_scrub() {
        let input = signal();
        let mut reg = Array2::from_elem((5, 3), false);
        reg[[1, 0]] = true;
        reg[[0, 2]] = true;
        reg[[4, 2]] = true;

        let out = scrub_slices(&input, reg.view(), SliceAxis::Z).unwrap();

        let mut expected = input.clone();
        for s in 0..3 {
            let runs = find_runs(reg.column(s));
            expected = scrub(&expected, &runs, ScrubTarget::Slice { axis: SliceAxis::Z, index: s }).unwrap();
        }
        assert_eq!(out, expected);
        assert_eq!(out.index_axis(Axis(2), 1), input.index_axis(Axis(2), 1));
    }

    #[test]
    fn fully_flagged_slice_column_is_an_error() {
        let input = signal();
        let mut reg = Array2::from_elem((5, 3), false);
        reg.column_mut(1).fill(true);
        assert_eq!(
            scrub_slices(&input, reg.view(), SliceAxis::Z).unwrap_err(),
            ScrubError::WholeSeriesExcluded { volumes: 5 }
        );
    }

    #[test]
    fn shape_errors() {
        let input = signal();
        assert!(matches!(
            scrub_volumes(&input, &regressor(&[false; 4])),
            Err(ScrubError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            scrub(&input, &[Run::new(4, 2)], ScrubTarget::Volume),
            Err(ScrubError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            scrub(&input, &[], ScrubTarget::Slice { axis: SliceAxis::Z, index: 3 }),
            Err(ScrubError::ShapeMismatch { .. })
        ));
        let reg = Array2::from_elem((5, 2), false);
        assert!(matches!(
            scrub_slices(&input, reg.view(), SliceAxis::Z),
            Err(ScrubError::ShapeMismatch { .. })
        ));
    }
}
