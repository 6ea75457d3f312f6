//! `tsvar-scrub` library crate.
//!
//! Variance-based detection of artifactual volumes and slices in 4-D
//! `(x, y, z, t)` signals, and iterative scrubbing of what is found.
//!
//! The binary (`tsvar`) is a thin wrapper around this library so the engine
//! can be tested and embedded without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod plot;
pub mod report;
