//! Tracing subscriber setup for the binary.
//!
//! `RUST_LOG` wins when set; otherwise `default_level` applies to the whole
//! crate. Logs go to stderr so stdout only carries reports and plots.

use std::io::IsTerminal;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::error::AppError;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_tracing(default_level: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| AppError::new(2, format!("Invalid log level '{default_level}': {e}")))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
    Ok(())
}
