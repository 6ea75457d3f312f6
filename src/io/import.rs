//! Load previously exported CSVs for re-plotting.

use std::path::Path;

use csv::ReaderBuilder;
use ndarray::{Array1, Array2};

use crate::error::AppError;
use crate::io::export::{slice_regressor_path, volume_regressor_path, volume_variance_path};

/// Everything `tsvar plot` can find for one output basename.
#[derive(Debug, Clone)]
pub struct ExportedRun {
    /// Volume variance per iteration, iteration 1 first.
    pub volume_variance: Vec<Array1<f64>>,
    pub volume_regressor: Option<Array1<bool>>,
    pub slice_regressor: Option<Array2<bool>>,
}

/// Read a headerless numeric CSV into a `(rows, cols)` matrix.
pub fn read_matrix_csv(path: &Path) -> Result<Array2<f64>, AppError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut values = Vec::new();
    let mut n_rows = 0usize;
    let mut n_cols = 0usize;
    for (i, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| AppError::new(2, format!("Failed to read CSV '{}': {e}", path.display())))?;
        if i == 0 {
            n_cols = record.len();
        }
        for field in record.iter() {
            let v: f64 = field.parse().map_err(|_| {
                AppError::new(
                    2,
                    format!("Invalid number '{field}' on line {} of '{}'.", i + 1, path.display()),
                )
            })?;
            values.push(v);
        }
        n_rows += 1;
    }

    Array2::from_shape_vec((n_rows, n_cols), values)
        .map_err(|e| AppError::new(2, format!("Ragged CSV '{}': {e}", path.display())))
}

/// Read a single-column CSV.
pub fn read_column_csv(path: &Path) -> Result<Array1<f64>, AppError> {
    let matrix = read_matrix_csv(path)?;
    if matrix.ncols() > 1 {
        return Err(AppError::new(
            2,
            format!("Expected one column in '{}', found {}.", path.display(), matrix.ncols()),
        ));
    }
    Ok(matrix.iter().copied().collect())
}

fn to_flags<D: ndarray::Dimension>(values: ndarray::Array<f64, D>) -> ndarray::Array<bool, D> {
    values.mapv(|v| v != 0.0)
}

/// Load `volumevar1..N` (stopping at the first missing file) plus any regressors.
pub fn load_exported_run(base: &Path) -> Result<ExportedRun, AppError> {
    let mut volume_variance = Vec::new();
    for iteration in 1.. {
        let path = volume_variance_path(base, iteration);
        if !path.exists() {
            break;
        }
        volume_variance.push(read_column_csv(&path)?);
    }

    let vol_reg_path = volume_regressor_path(base);
    let volume_regressor = if vol_reg_path.exists() {
        Some(to_flags(read_column_csv(&vol_reg_path)?))
    } else {
        None
    };

    let slice_reg_path = slice_regressor_path(base);
    let slice_regressor = if slice_reg_path.exists() {
        Some(to_flags(read_matrix_csv(&slice_reg_path)?))
    } else {
        None
    };

    if volume_variance.is_empty() && volume_regressor.is_none() && slice_regressor.is_none() {
        return Err(AppError::new(
            2,
            format!("No exported variance or regressor files found for '{}'.", base.display()),
        ));
    }

    Ok(ExportedRun {
        volume_variance,
        volume_regressor,
        slice_regressor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::export::{write_column_csv, write_slice_regressor_csv, write_volume_regressor_csv};
    use ndarray::{arr1, arr2};
    use tempfile::tempdir;

    #[test]
    fn loads_iterations_until_first_gap() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("run");

        write_column_csv(&volume_variance_path(&base, 1), arr1(&[0.1, 9.5, 0.2]).view()).unwrap();
        write_column_csv(&volume_variance_path(&base, 2), arr1(&[0.1, 0.3, 0.2]).view()).unwrap();
        // Iteration 4 without 3 is ignored.
        write_column_csv(&volume_variance_path(&base, 4), arr1(&[7.0, 7.0, 7.0]).view()).unwrap();
        write_volume_regressor_csv(&volume_regressor_path(&base), &arr1(&[false, true, false])).unwrap();
        write_slice_regressor_csv(&slice_regressor_path(&base), &arr2(&[[false], [true], [false]])).unwrap();

        let run = load_exported_run(&base).unwrap();
        assert_eq!(run.volume_variance.len(), 2);
        assert_eq!(run.volume_variance[0], arr1(&[0.1, 9.5, 0.2]));
        assert_eq!(run.volume_regressor, Some(arr1(&[false, true, false])));
        assert_eq!(run.slice_regressor, Some(arr2(&[[false], [true], [false]])));
    }

    #[test]
    fn nothing_to_load_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_exported_run(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn bad_numbers_and_ragged_rows_are_rejected() {
        let dir = tempdir().unwrap();
        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, "1.0\nabc\n").unwrap();
        assert!(read_column_csv(&bad).is_err());

        let ragged = dir.path().join("ragged.csv");
        std::fs::write(&ragged, "1,2\n3\n").unwrap();
        assert!(read_matrix_csv(&ragged).is_err());

        let wide = dir.path().join("wide.csv");
        std::fs::write(&wide, "1,2\n3,4\n").unwrap();
        assert!(read_column_csv(&wide).is_err());
    }
}
