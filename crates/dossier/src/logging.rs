//! Logging setup for embedding applications.
//!
//! The library logs through the `log` macros and opens `tracing` spans
//! around job execution; [`init_logging`] wires both into a single
//! subscriber. Hosts with their own subscriber can skip this and install
//! a `tracing-log` bridge themselves.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a formatting subscriber with an env-driven filter and bridges
/// `log` records into it. Safe to call once per process; later calls are
/// no-ops.
pub fn init_logging() {
    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for this crate.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dossier=info"));

    let registry_installed = tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .try_init()
        .is_ok();

    if registry_installed {
        // log::info! etc. from this crate flow into the subscriber.
        let _ = tracing_log::LogTracer::init();
    }
}
