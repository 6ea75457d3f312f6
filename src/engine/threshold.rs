//! Threshold variance values into boolean "bad" flags.

use ndarray::{Array1, Array2};

use crate::error::ScrubError;

/// Flags for one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Flags {
    /// `volume[t]` is true when volume `t` exceeds the threshold.
    pub volume: Array1<bool>,
    /// `slice[[t, s]]` is true when slice `s` of volume `t` exceeds the threshold.
    pub slice: Array2<bool>,
}

impl Flags {
    pub fn bad_volumes(&self) -> usize {
        self.volume.iter().filter(|&&b| b).count()
    }

    pub fn bad_slices(&self) -> usize {
        self.slice.iter().filter(|&&b| b).count()
    }
}

/// Elementwise `value > threshold` at both granularities.
pub fn flag(volume: &Array1<f64>, slice: &Array2<f64>, threshold: f64) -> Result<Flags, ScrubError> {
    if slice.nrows() != volume.len() {
        return Err(ScrubError::ShapeMismatch {
            context: "slice variance rows",
            expected: vec![volume.len()],
            actual: vec![slice.nrows()],
        });
    }
    Ok(Flags {
        volume: volume.mapv(|v| v > threshold),
        slice: slice.mapv(|v| v > threshold),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn strictly_greater_than_threshold() {
        let volume = arr1(&[4.9, 5.0, 5.1]);
        let slice = arr2(&[[1.0, 9.0], [5.0, 5.0], [6.0, 0.0]]);
        let flags = flag(&volume, &slice, 5.0).unwrap();
        assert_eq!(flags.volume, arr1(&[false, false, true]));
        assert_eq!(flags.slice, arr2(&[[false, true], [false, false], [true, false]]));
        assert_eq!(flags.bad_volumes(), 1);
        assert_eq!(flags.bad_slices(), 2);
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let volume = arr1(&[1.0, 2.0]);
        let slice = arr2(&[[1.0], [2.0], [3.0]]);
        assert!(matches!(
            flag(&volume, &slice, 1.0),
            Err(ScrubError::ShapeMismatch { .. })
        ));
    }
}
