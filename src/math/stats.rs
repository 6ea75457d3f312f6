//! Small numeric helpers shared by the variance analysis.

use ndarray::ArrayView1;

/// Median of a slice (sorts in place).
///
/// Even-length inputs average the two middle values. Returns `None` for an
/// empty slice.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median of one voxel's timecourse.
pub fn temporal_median(lane: ArrayView1<'_, f64>) -> Option<f64> {
    let mut buf = lane.to_vec();
    median_mut(&mut buf)
}

/// Population variance of the two-sample set `{a, b}`.
///
/// `((a - m)^2 + (b - m)^2) / 2` with `m = (a + b) / 2`, which reduces to
/// `((a - b) / 2)^2`.
pub fn pair_variance(a: f64, b: f64) -> f64 {
    let half = (a - b) / 2.0;
    half * half
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median_mut(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median_mut(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median_mut(&mut []), None);
    }

    #[test]
    fn temporal_median_ignores_single_outlier() {
        let lane = arr1(&[100.0, 101.0, 500.0, 99.0, 100.0]);
        assert_eq!(temporal_median(lane.view()), Some(100.0));
    }

    #[test]
    fn pair_variance_matches_definition() {
        let (a, b) = (3.0_f64, 7.0_f64);
        let m = (a + b) / 2.0;
        let direct = ((a - m).powi(2) + (b - m).powi(2)) / 2.0;
        assert!((pair_variance(a, b) - direct).abs() < 1e-12);
        assert_eq!(pair_variance(5.0, 5.0), 0.0);
    }
}
