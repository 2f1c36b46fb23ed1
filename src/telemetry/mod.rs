//! Tracing initialization.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,icebreaker=debug,tower_http=info,axum=info";

/// Install the global subscriber. `RUST_LOG` overrides the default filter, e.g.
/// `RUST_LOG=icebreaker=trace,tower_http=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
