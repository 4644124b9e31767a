// SPDX-License-Identifier: MIT

//! Daemon entry-point wiring: configuration, logging, bus connection, and
//! the supervisor's discover/run/shutdown sequence.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod logging;

pub use config::{Config, ConfigError};
pub use logging::init as init_logging;

use std::sync::Arc;

use scriptmesh_bus::{Bus, BusError, NatsBus};
use scriptmesh_core::resolve_host_id;
use scriptmesh_supervisor::{Supervisor, SupervisorConfig};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to bus")]
    BusConnect(#[from] BusError),
}

/// Connect to the bus and drive the supervisor until a shutdown signal
/// arrives, then tear everything down. Returns once shutdown is complete.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let bus = NatsBus::connect(&config.bus_url, config.connect_timeout).await?;
    run_with_bus(config, Arc::new(bus.clone())).await;
    let _ = bus.flush().await;
    Ok(())
}

async fn run_with_bus<B: Bus + 'static>(config: Config, bus: Arc<B>) {
    let host_id = resolve_host_id(&config.host_id);
    info!(bus_url = %config.bus_url, scripts_dir = %config.scripts_dir.display(), host_id = %host_id, "starting");

    let supervisor_config = SupervisorConfig {
        scripts_dir: config.scripts_dir.clone(),
        host_id,
        describe_deadline: config.describe_deadline,
        handle_deadline: config.handle_deadline,
        shutdown_grace: config.shutdown_grace,
    };
    let supervisor = Arc::new(Supervisor::new(supervisor_config, bus));

    let admitted = supervisor.discover().await;
    info!(admitted, "initial discovery complete");

    let root_token = supervisor.root_token();
    let run_handle = tokio::spawn(Supervisor::run(supervisor.clone()));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, cancelling");
    root_token.cancel();

    if let Err(e) = run_handle.await {
        error!(error = %e, "supervisor run loop panicked");
    }
    info!("shutdown complete");
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler, watching SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
