//! Tracing subscriber initialization for embedding applications.
//!
//! The engine itself only emits `tracing` events; installing a subscriber
//! is the host process's call. `init_tracing` wires the conventional
//! env-filtered fmt subscriber.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install an env-filtered fmt subscriber as the global default.
///
/// Uses `RUST_LOG` when set, `info` otherwise. Safe to call more than once;
/// subsequent calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
