//! Read/write the JSON volume container.
//!
//! The schema is defined by `domain::VolumeFile`. Signals are 4-D `(x, y, z, t)`;
//! variance images are 3-D `(x, y, z)`. The affine is never interpreted, only
//! carried from the input to every output.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ndarray::{Array4, ArrayView, Dimension};

use crate::domain::VolumeFile;
use crate::error::AppError;

pub const TOOL_NAME: &str = "tsvar";

pub type Affine = [[f64; 4]; 4];

/// A validated 4-D signal plus its spatial metadata.
#[derive(Debug, Clone)]
pub struct LoadedSignal {
    pub signal: Array4<f64>,
    pub affine: Option<Affine>,
}

pub fn read_volume_file(path: &Path) -> Result<VolumeFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open volume '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid volume JSON '{}': {e}", path.display())))
}

/// Read and validate a 4-D signal.
pub fn read_signal(path: &Path) -> Result<LoadedSignal, AppError> {
    let file = read_volume_file(path)?;
    signal_from_file(file)
        .map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))
}

pub fn signal_from_file(file: VolumeFile) -> Result<LoadedSignal, AppError> {
    let [x, y, z, t] = <[usize; 4]>::try_from(file.shape.as_slice()).map_err(|_| {
        AppError::new(
            2,
            format!("Expected a 4-D signal (x, y, z, t), got shape {:?}.", file.shape),
        )
    })?;

    let expected = file
        .shape
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .ok_or_else(|| AppError::new(2, format!("Volume shape {:?} is too large.", file.shape)))?;
    if file.data.len() != expected {
        return Err(AppError::new(
            2,
            format!(
                "Volume data has {} values but shape {:?} needs {expected}.",
                file.data.len(),
                file.shape
            ),
        ));
    }
    if let Some(i) = file.data.iter().position(|v| !v.is_finite()) {
        return Err(AppError::new(2, format!("Volume data contains a non-finite value at index {i}.")));
    }

    let signal = Array4::from_shape_vec((x, y, z, t), file.data)
        .map_err(|e| AppError::new(2, format!("Invalid volume layout: {e}")))?;

    Ok(LoadedSignal {
        signal,
        affine: file.affine,
    })
}

/// Flatten an array of any rank into the container (row-major).
pub fn to_volume_file<D: Dimension>(array: ArrayView<'_, f64, D>, affine: Option<Affine>) -> VolumeFile {
    VolumeFile {
        tool: TOOL_NAME.to_string(),
        shape: array.shape().to_vec(),
        affine,
        data: array.iter().copied().collect(),
    }
}

pub fn write_volume<D: Dimension>(
    path: &Path,
    array: ArrayView<'_, f64, D>,
    affine: Option<Affine>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create volume '{}': {e}", path.display())))?;
    serde_json::to_writer(BufWriter::new(file), &to_volume_file(array, affine))
        .map_err(|e| AppError::new(2, format!("Failed to write volume '{}': {e}", path.display())))
}
