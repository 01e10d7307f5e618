//! Engine binary for the croft farm automation bot.
//!
//! Wires together configuration, structured logging, a farm backend, and
//! the cycle scheduler, then runs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `croft-config.yaml`
//! 3. Construct the farm backend and session state
//! 4. Create the push-notification channel
//! 5. Start the scheduler and await the first-cycle report
//! 6. Trigger an expansion pass (post-login cooldowns are cleared)
//! 7. Wait for ctrl-c, then stop cleanly
//!
//! The in-memory [`StubFarm`] stands in for the wire transport here;
//! a live deployment substitutes a transport-backed [`FarmClient`].
//!
//! [`FarmClient`]: croft_core::FarmClient

mod stub;

use std::path::Path;
use std::sync::Arc;

use croft_core::{BotConfig, FarmBot, FarmClient, Recommender};
use croft_types::SessionState;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::stub::StubFarm;

/// Default configuration file path, overridable via `CROFT_CONFIG`.
const DEFAULT_CONFIG_PATH: &str = "croft-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if initialization fails. Once the scheduler is
/// running, remote failures are contained and logged, never fatal.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("croft-engine starting");

    // 2. Load configuration.
    let config = load_config();
    info!(
        cycle_interval_secs = config.cycle.interval_secs,
        auto_unlock = config.actions.auto_unlock,
        auto_upgrade = config.actions.auto_upgrade,
        "configuration loaded"
    );

    // 3. Construct the farm backend and session state.
    let now_secs = chrono::Utc::now().timestamp();
    let farm = Arc::new(StubFarm::starting_farm(now_secs));
    let session = Arc::new(tokio::sync::Mutex::new(SessionState {
        identity: "demo-farmer".to_owned(),
        level: 12,
        currency: 5_000,
    }));

    // 4. Create the push-notification channel. The transport layer owns
    //    the sender; the scheduler subscribes with the receiver.
    let (push_tx, push_rx) = broadcast::channel(64);
    // Kept alive for the process lifetime so the channel stays open.
    let _push_tx = push_tx;

    // 5. Start the scheduler and await the first-cycle report.
    let bot = FarmBot::new(
        config,
        Arc::clone(&farm) as Arc<dyn FarmClient>,
        Arc::clone(&farm) as Arc<dyn Recommender>,
        Arc::clone(&session),
    );
    let (first_tx, first_rx) = oneshot::channel();
    bot.start(push_rx, Some(first_tx));

    match first_rx.await {
        Ok(stats) => {
            let identity = session.lock().await.identity.clone();
            info!(%identity, summary = %stats.summary(), "login report: first cycle complete");
        }
        Err(_closed) => warn!("scheduler stopped before the first cycle completed"),
    }

    // 6. Post-login expansion pass with cooldowns cleared.
    bot.expand_now().await;

    // 7. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("interrupt received");
    bot.stop();

    info!("croft-engine stopped");
    Ok(())
}

/// Load configuration from `CROFT_CONFIG` or the default path, falling
/// back to defaults when no file exists.
fn load_config() -> BotConfig {
    let path = std::env::var("CROFT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let path = Path::new(&path);
    if !path.exists() {
        info!(path = %path.display(), "no config file found, using defaults");
        return BotConfig::default();
    }
    match BotConfig::from_file(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "config load failed, using defaults");
            BotConfig::default()
        }
    }
}
