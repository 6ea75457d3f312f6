//! CSV exports of variance traces and regressors.
//!
//! Files are headerless, comma-separated, one row per time index, so they load
//! directly into spreadsheets or `numpy.loadtxt(..., delimiter=",")`.
//! Floats use the shortest representation that round-trips; regressors are 0/1.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::AppError;

/// `<base>_<suffix>`, e.g. `out_volumevar3.csv`.
pub fn output_path(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push("_");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn volume_variance_path(base: &Path, iteration: usize) -> PathBuf {
    output_path(base, &format!("volumevar{iteration}.csv"))
}

pub fn slice_variance_path(base: &Path, iteration: usize) -> PathBuf {
    output_path(base, &format!("slicevar{iteration}.csv"))
}

pub fn variance_image_path(base: &Path, iteration: usize) -> PathBuf {
    output_path(base, &format!("varimg{iteration}.json"))
}

pub fn volume_regressor_path(base: &Path) -> PathBuf {
    output_path(base, "volumereg.csv")
}

pub fn slice_regressor_path(base: &Path) -> PathBuf {
    output_path(base, "slicereg.csv")
}

pub fn scrubbed_signal_path(base: &Path) -> PathBuf {
    output_path(base, "scrub.json")
}

pub fn summary_path(base: &Path) -> PathBuf {
    output_path(base, "summary.json")
}

/// One value per line.
pub fn write_column_csv(path: &Path, values: ArrayView1<'_, f64>) -> Result<(), AppError> {
    write_rows(path, values.iter().map(|v| vec![v.to_string()]))
}

/// One row per time index, one column per slice.
pub fn write_matrix_csv(path: &Path, values: ArrayView2<'_, f64>) -> Result<(), AppError> {
    write_rows(
        path,
        values.rows().into_iter().map(|row| row.iter().map(f64::to_string).collect()),
    )
}

pub fn write_volume_regressor_csv(path: &Path, regressor: &Array1<bool>) -> Result<(), AppError> {
    write_rows(path, regressor.iter().map(|&b| vec![flag_field(b)]))
}

pub fn write_slice_regressor_csv(path: &Path, regressor: &Array2<bool>) -> Result<(), AppError> {
    write_rows(
        path,
        regressor.rows().into_iter().map(|row| row.iter().map(|&b| flag_field(b)).collect()),
    )
}

fn flag_field(b: bool) -> String {
    u8::from(b).to_string()
}

fn write_rows<I>(path: &Path, rows: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = open_writer(path)?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row to '{}': {e}", path.display())))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))
}

fn open_writer(path: &Path) -> Result<Writer<std::fs::File>, AppError> {
    WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))
}
