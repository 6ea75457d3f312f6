//! Input/output helpers.
//!
//! - volume container read/write (`volume`)
//! - CSV exports of variance traces and regressors (`export`)
//! - CSV import for re-plotting (`import`)
//! - run summary JSON (`summary`)

pub mod export;
pub mod import;
pub mod summary;
pub mod volume;

pub use export::*;
pub use import::*;
pub use summary::*;
pub use volume::*;
