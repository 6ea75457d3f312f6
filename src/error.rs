//! Error types.
//!
//! Two layers:
//! - [`ScrubError`]: typed failures raised by the detection/scrubbing engine.
//! - [`AppError`]: what the binary reports (message + process exit code).
//!
//! Exit codes:
//! - 2: usage, configuration or file errors
//! - 3: data preconditions (degenerate or empty signal)
//! - 4: computation failures

use thiserror::Error;

/// Failures raised by the engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScrubError {
    #[error("Invalid slice axis '{0}': expected one of x, y, z.")]
    InvalidAxis(String),

    #[error("Degenerate timeseries: need at least 2 volumes, got {volumes}.")]
    DegenerateTimeseries { volumes: usize },

    #[error("Entire timeseries ({volumes} volumes) excluded during scrubbing; no neighbour is left to interpolate from.")]
    WholeSeriesExcluded { volumes: usize },

    #[error("Shape mismatch for {context}: expected {expected:?}, got {actual:?}.")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid threshold {0}: must be finite and > 0.")]
    InvalidThreshold(f64),

    #[error("Empty signal: shape {shape:?} has a zero-length spatial axis.")]
    EmptySignal { shape: Vec<usize> },

    #[error("Mean signal intensity is {0}; normalisation requires a finite value > 0.")]
    NonPositiveMeanIntensity(f64),

    #[error("No convergence after {limit} iterations (iteration cap reached).")]
    IterationLimit { limit: usize },
}

impl ScrubError {
    /// Process exit code used when this error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ScrubError::InvalidAxis(_) | ScrubError::InvalidThreshold(_) => 2,
            ScrubError::DegenerateTimeseries { .. }
            | ScrubError::EmptySignal { .. }
            | ScrubError::NonPositiveMeanIntensity(_) => 3,
            ScrubError::WholeSeriesExcluded { .. }
            | ScrubError::ShapeMismatch { .. }
            | ScrubError::IterationLimit { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ScrubError> for AppError {
    fn from(err: ScrubError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
