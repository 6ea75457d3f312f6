//! Detection and scrubbing engine.
//!
//! Pipeline per iteration: [`variance::analyze`] → [`threshold::flag`] →
//! [`runs::find_runs`] → [`scrub::scrub`], driven by
//! [`controller::IterationController`] until convergence.

pub mod controller;
pub mod runs;
pub mod scrub;
pub mod threshold;
pub mod variance;

pub use controller::{
    scrub_signal, ControllerState, IterationController, IterationReport, IterationSummary, ScrubOutcome,
};
pub use runs::find_runs;
pub use scrub::{scrub, scrub_slices, scrub_volumes, ScrubTarget};
pub use threshold::{flag, Flags};
pub use variance::{analyze, validate_signal_shape, VarianceAnalysis, TIME_AXIS};
