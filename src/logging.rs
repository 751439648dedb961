// src/logging.rs
use anyhow::Result;
use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global `tracing` subscriber, writing to stderr so command
/// output on stdout stays clean. `RUST_LOG` overrides `default_level`.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init(default_level: &str) -> Result<()> {
    let env_filter = env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(default_level), |directive| EnvFilter::new(&directive))
        .add_directive(
            "reqwest=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        )
        .add_directive(
            "hyper=warn"
                .parse()
                .unwrap_or_else(|_| tracing::Level::WARN.into()),
        );

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()?;
    Ok(())
}
