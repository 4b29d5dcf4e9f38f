use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use swarmlink_shared::{defaults, Position};
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vehicle_sim::{SimConfig, SimVehicle};

#[derive(Debug, Parser)]
#[command(name = "vehicle-sim", version, about = "Simulated vehicle RPC service")]
struct Cli {
    /// Address of the first vehicle; further vehicles use consecutive ports
    #[arg(long, default_value = defaults::VEHICLE_ENDPOINT)]
    listen: SocketAddr,

    /// Number of vehicles to simulate
    #[arg(long, default_value_t = 1)]
    count: u16,

    /// Home latitude of the first vehicle
    #[arg(long, default_value_t = 47.397742)]
    lat: f64,

    /// Home longitude of the first vehicle
    #[arg(long, default_value_t = 8.545594)]
    lon: f64,

    /// Start without a position fix
    #[arg(long)]
    no_fix: bool,

    /// Telemetry period in milliseconds
    #[arg(long, default_value_t = defaults::SIM_TELEMETRY_INTERVAL_MS)]
    telemetry_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let mut tasks = Vec::new();

    for index in 0..cli.count {
        let mut addr = cli.listen;
        addr.set_port(cli.listen.port() + index);

        // Spread vehicles ~10 m apart so they are distinguishable on a map
        let config = SimConfig {
            home: Position {
                latitude_deg: cli.lat + index as f64 * 0.0001,
                longitude_deg: cli.lon,
                absolute_altitude_m: 488.0,
                relative_altitude_m: 0.0,
            },
            without_fix: cli.no_fix,
            telemetry_interval: Duration::from_millis(cli.telemetry_ms),
        };

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        info!("Simulated vehicle listening on {}", addr);

        tasks.push(tokio::spawn(accept_loop(listener, SimVehicle::new(config))));
    }

    for task in tasks {
        task.await??;
    }
    Ok(())
}

async fn accept_loop(listener: TcpListener, sim: SimVehicle) -> Result<()> {
    loop {
        let (socket, addr) = listener.accept().await?;
        socket.set_nodelay(true)?;
        debug!("Connection from: {}", addr);

        let sim = sim.clone();
        tokio::spawn(async move {
            if let Err(e) = sim.serve(socket).await {
                error!("Session with {} failed: {}", addr, e);
            }
        });
    }
}
