//! Structured logging initialization.
//!
//! Installs a `tracing` subscriber with an `EnvFilter` (default level
//! `info`, overridable through `RUST_LOG`). Tolerates being called when a
//! subscriber is already installed, so tests and embedding applications can
//! initialize freely.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}
