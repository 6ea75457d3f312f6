//! Formatted terminal output.
//!
//! Formatting lives here so the engine stays free of presentation concerns and
//! output changes are localized.

use std::path::Path;

use ndarray::Array1;

use crate::data::SynthSignal;
use crate::domain::{RunConfig, SynthConfig};
use crate::engine::{ControllerState, ScrubOutcome};

/// Longest index list printed before eliding.
const MAX_LISTED: usize = 20;

/// Run header, per-iteration table and final regressor counts.
pub fn format_run_summary(config: &RunConfig, outcome: &ScrubOutcome) -> String {
    let scrub = &config.scrub;
    let mut out = String::new();

    out.push_str("=== tsvar - variance-based scrubbing ===\n");
    out.push_str(&format!("Input: {}\n", config.data_path.display()));
    out.push_str(&format!("Shape: {}\n", fmt_shape(outcome.signal.shape())));
    out.push_str(&format!(
        "Slice axis: {} | Threshold: {:.2} | Scrub: {} | Max iterations: {}\n",
        scrub.slice_axis.label(),
        scrub.threshold,
        scrub.mode.display_name(),
        scrub.max_iterations.map_or_else(|| "none".to_string(), |n| n.to_string()),
    ));

    out.push_str("\nIterations:\n");
    out.push_str(&format!(
        "{:>4} {:>10} {:>10} {:>10} {:>10}\n",
        "iter", "bad_vol", "bad_slice", "new_vol", "new_slice"
    ));
    out.push_str(&format!("{:-<4} {:-<10} {:-<10} {:-<10} {:-<10}\n", "", "", "", "", ""));
    for row in &outcome.history {
        out.push_str(&format!(
            "{:>4} {:>10} {:>10} {:>10} {:>10}\n",
            row.iteration, row.bad_volumes, row.bad_slices, row.newly_flagged_volumes, row.newly_flagged_slices
        ));
    }

    out.push('\n');
    out.push_str(&format!("Result: {}\n", fmt_state(outcome)));
    out.push_str(&format!(
        "Flagged volumes: {} / {} {}\n",
        outcome.flagged_volumes(),
        outcome.volume_regressor.len(),
        fmt_indices(&outcome.volume_regressor),
    ));
    out.push_str(&format!(
        "Flagged slices: {} / {}\n",
        outcome.flagged_slices(),
        outcome.slice_regressor.len(),
    ));

    out
}

/// What `tsvar synth` wrote and where the artifacts are.
pub fn format_synth_summary(path: &Path, config: &SynthConfig, synth: &SynthSignal) -> String {
    let mut out = String::new();
    out.push_str(&format!("Wrote {} ({})\n", path.display(), fmt_shape(synth.signal.shape())));
    out.push_str(&format!(
        "Seed: {} | Baseline: {:.2} | Noise sd: {:.2} | Spike scale: {:.2}\n",
        config.seed, config.baseline, config.noise_sd, config.spike_scale
    ));
    out.push_str(&format!(
        "Spiked volumes: {} {}\n",
        synth.spiked_volumes.len(),
        fmt_list(synth.spiked_volumes.iter().map(|t| t.to_string()))
    ));
    out.push_str(&format!(
        "Spiked slices ({}): {} {}\n",
        config.slice_axis.label(),
        synth.spiked_slices.len(),
        fmt_list(synth.spiked_slices.iter().map(|(t, s)| format!("{t}:{s}")))
    ));
    out
}

fn fmt_state(outcome: &ScrubOutcome) -> String {
    let n = outcome.iterations;
    match &outcome.state {
        ControllerState::Converged => format!("converged after {n} iteration(s)"),
        ControllerState::Disabled => format!("scrubbing off, {n} detection pass"),
        ControllerState::Failed(err) => format!("failed after {n} iteration(s): {err}"),
        ControllerState::Running => format!("running ({n} iteration(s) so far)"),
    }
}

fn fmt_shape(shape: &[usize]) -> String {
    let parts: Vec<String> = shape.iter().map(|n| n.to_string()).collect();
    parts.join("x")
}

fn fmt_indices(flags: &Array1<bool>) -> String {
    fmt_list(
        flags
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b)
            .map(|(t, _)| t.to_string()),
    )
}

fn fmt_list<I: Iterator<Item = String>>(items: I) -> String {
    let items: Vec<String> = items.collect();
    if items.len() > MAX_LISTED {
        format!("[{}, ... +{}]", items[..MAX_LISTED].join(", "), items.len() - MAX_LISTED)
    } else {
        format!("[{}]", items.join(", "))
    }
}
