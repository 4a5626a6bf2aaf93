//! avatar-autopilot binary
//!
//! Loads the agent configuration and runs the reconnection supervisor against
//! the in-process simulated world until Ctrl-C or a fatal error.
//!
//! ## Configuration (file via `config` crate, overrides via flags / env)
//!
//! | Key                              | Default        | Description                      |
//! |----------------------------------|----------------|----------------------------------|
//! | `AUTOPILOT_CONFIG`               | `config.json`  | Agent config file (optional)     |
//! | `AUTOPILOT_SCENARIO`             | –              | Simulated world scenario (JSON)  |
//! | `AUTOPILOT_MAX_RECONNECT_ATTEMPTS` | from config  | Consecutive disconnects tolerated |
//! | `AUTOPILOT_RECONNECT_DELAY_MS`   | from config    | Wait between reconnect attempts  |

use anyhow::{Context, Result};
use avatar_autopilot::{AgentConfig, Scenario, SimConnector, Supervisor};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "avatar-autopilot", about = "Avatar Autopilot", version)]
struct Args {
    /// Agent configuration file
    #[arg(long, env = "AUTOPILOT_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Scenario for the simulated world (defaults to an empty flat world)
    #[arg(long, env = "AUTOPILOT_SCENARIO")]
    scenario: Option<PathBuf>,

    /// Consecutive disconnects tolerated before giving up
    #[arg(long, env = "AUTOPILOT_MAX_RECONNECT_ATTEMPTS")]
    max_reconnect_attempts: Option<u32>,

    /// Wait between reconnect attempts (ms)
    #[arg(long, env = "AUTOPILOT_RECONNECT_DELAY_MS")]
    reconnect_delay_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("avatar_autopilot=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = AgentConfig::load(Some(args.config.as_path()))
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(attempts) = args.max_reconnect_attempts {
        config.timings.max_reconnect_attempts = attempts;
    }
    if let Some(delay) = args.reconnect_delay_ms {
        config.timings.reconnect_delay_ms = delay;
    }

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path).context("loading scenario")?,
        None => Scenario::default(),
    };

    log::info!(
        "Starting avatar-autopilot (mode={}, combat={}, sleep={}, building={}, max_reconnects={})",
        config.required_mode,
        config.combat_settings.enabled,
        config.auto_sleep,
        config.building_enabled,
        config.timings.max_reconnect_attempts,
    );

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Shutting down (ctrl-c)");
                shutdown.cancel();
            }
        });
    }

    let mut supervisor = Supervisor::new(SimConnector::new(scenario), Arc::new(config), shutdown);
    supervisor.run().await.context("agent stopped")?;

    log::info!("avatar-autopilot stopped");
    Ok(())
}
