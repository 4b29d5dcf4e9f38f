mod api;
mod config;
mod coordinator;
mod error;
mod facade;
mod link;
mod oplog;
mod registry;
#[cfg(test)]
mod testing;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use api::ApiState;
use config::{BridgeConfig, Cli};
use coordinator::FollowCoordinator;
use facade::CommandFacade;
use oplog::{OpLog, OpLogLayer};
use registry::{Fleet, VehicleRegistry};
use transport::TcpConnector;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BridgeConfig::load(cli.config.as_deref())?.with_cli(&cli);

    let oplog = OpLog::new(config.log_capacity);
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(OpLogLayer::new(oplog.clone()))
        .init();

    info!("Vehicle link bridge starting");
    for vehicle in &config.vehicles {
        info!("  candidate vehicle: {}", vehicle);
    }

    let connector = Arc::new(TcpConnector::new(config.link.connect_timeout()));
    let registry = Arc::new(VehicleRegistry::new(
        connector,
        config.vehicles.clone(),
        config.link.clone(),
        config.discovery.clone(),
    ));

    let active = registry.rediscover().await;
    info!("{} of {} vehicle(s) answering", active.len(), config.vehicles.len());

    let shutdown = CancellationToken::new();
    if config.discovery.interval_ms > 0 {
        let interval = Duration::from_millis(config.discovery.interval_ms);
        tokio::spawn(registry.clone().discovery_loop(interval, shutdown.child_token()));
    }

    let facade = Arc::new(CommandFacade::new(registry, config.default_target()));
    let coordinator = Arc::new(FollowCoordinator::new(facade.clone()));
    let state = Arc::new(ApiState {
        facade,
        coordinator: coordinator.clone(),
        oplog,
        follow_interval: config.follow.interval(),
        idle_timeout: config.http.idle_timeout(),
    });

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("bind HTTP listener on {}", config.listen))?;

    tokio::select! {
        result = api::serve(listener, state) => {
            if let Err(e) = result {
                error!("HTTP API stopped: {:#}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    coordinator.stop().await;
    shutdown.cancel();
    Ok(())
}
