//! Process-wide logging setup, mirroring `env-tracing-logger`'s
//! console-layer-plus-`EnvFilter` pattern, gated by `RUST_LOG` (default
//! `info`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct Guard {}

impl Drop for Guard {
    fn drop(&mut self) {}
}

/// Initialize the global `tracing` subscriber: a compact, timestamped
/// console layer filtered by `RUST_LOG` (defaulting to `info` when
/// unset). Returns a guard that must be held for the lifetime of the
/// process.
pub fn init() -> impl Drop {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).compact();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    Guard {}
}
