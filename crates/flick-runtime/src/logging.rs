//! Tracing setup for binaries and harnesses embedding the player.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global subscriber. `FLICK_LOG` overrides the default
/// level (standard env-filter syntax). Fails if a subscriber is
/// already installed.
pub fn init(default_level: Level) -> Result<()> {
    let filter = EnvFilter::try_from_env("FLICK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
