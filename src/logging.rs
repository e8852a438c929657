//! Structured logging setup.
//!
//! Logs go to stderr so report output on stdout stays machine-readable.
//! The filter defaults to `info` and honours `RUST_LOG`.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INITIALIZED: OnceLock<()> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(json: bool) -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json();
        tracing::subscriber::set_global_default(registry.with(layer))?;
    } else {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);
        tracing::subscriber::set_global_default(registry.with(layer))?;
    }

    let _ = INITIALIZED.set(());
    tracing::debug!(json, "logging initialized");
    Ok(())
}
