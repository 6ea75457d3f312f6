//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - analysis configuration enums (`SliceAxis`, `ScrubMode`)
//! - run descriptors (`Run`) shared by detection and scrubbing
//! - run and generator configuration (`ScrubConfig`, `RunConfig`, `SynthConfig`)
//! - the on-disk volume container (`VolumeFile`)

pub mod types;

pub use types::*;
