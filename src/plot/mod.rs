//! Terminal plots of variance traces and regressors.

pub mod ascii;

pub use ascii::{render_slice_regressor, render_variance_trace, render_volume_regressor};
