//! Logging configuration using tracing

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins; otherwise `level` (from the `[app]` table) applies to this
/// crate and everything else logs warnings only.
pub fn init(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))?;

    tracing::info!("Logo Studio starting");
    Ok(())
}

fn default_directive(level: &str) -> String {
    let level = level.trim();
    let level = if level.is_empty() { "info" } else { level };
    format!("logo_studio={level},warn")
}
