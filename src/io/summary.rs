//! Machine-readable run summary (`<base>_summary.json`).

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::domain::ScrubConfig;
use crate::engine::{IterationSummary, ScrubOutcome};
use crate::error::AppError;
use crate::io::volume::TOOL_NAME;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub tool: String,
    /// Local time, RFC 3339.
    pub generated_at: String,
    pub input: PathBuf,
    pub shape: Vec<usize>,
    pub config: ScrubConfig,
    /// `converged`, `disabled` or `failed`.
    pub state: String,
    pub error: Option<String>,
    pub iterations: usize,
    pub flagged_volumes: usize,
    pub flagged_slices: usize,
    pub history: Vec<IterationSummary>,
}

impl RunSummary {
    pub fn from_outcome(input: &Path, config: &ScrubConfig, outcome: &ScrubOutcome) -> Self {
        Self {
            tool: TOOL_NAME.to_string(),
            generated_at: Local::now().to_rfc3339(),
            input: input.to_path_buf(),
            shape: outcome.signal.shape().to_vec(),
            config: *config,
            state: outcome.state.label().to_string(),
            error: outcome.error().map(|e| e.to_string()),
            iterations: outcome.iterations,
            flagged_volumes: outcome.flagged_volumes(),
            flagged_slices: outcome.flagged_slices(),
            history: outcome.history.clone(),
        }
    }
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))
}

pub fn read_summary_json(path: &Path) -> Result<RunSummary, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScrubMode;
    use crate::engine::scrub_signal;
    use ndarray::{Array4, Axis};
    use tempfile::tempdir;

    #[test]
    fn summary_reflects_outcome() {
        let mut signal = Array4::from_elem((2, 2, 2, 6), 100.0);
        signal.index_axis_mut(Axis(3), 1).mapv_inplace(|v| v * 2.0);
        let config = ScrubConfig {
            mode: ScrubMode::Volume,
            ..ScrubConfig::default()
        };
        let outcome = scrub_signal(signal, config).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = RunSummary::from_outcome(Path::new("in.json"), &config, &outcome);
        write_summary_json(&path, &summary).unwrap();
        let back = read_summary_json(&path).unwrap();

        assert_eq!(back.state, "converged");
        assert_eq!(back.error, None);
        assert_eq!(back.iterations, 2);
        assert_eq!(back.flagged_volumes, 1);
        assert_eq!(back.shape, vec![2, 2, 2, 6]);
        assert_eq!(back.config, config);
        assert_eq!(back.history.len(), 2);
        assert_eq!(back.history[0].newly_flagged_volumes, 1);
        assert!(!back.generated_at.is_empty());
    }
}
