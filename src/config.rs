//! Bridge configuration: optional TOML file overlaid with CLI flags

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use swarmlink_shared::defaults;

use crate::link::VehicleEndpoint;
use crate::registry::Target;

#[derive(Debug, Parser)]
#[command(name = "swarmlink-bridge", version, about = "HTTP bridge to streaming vehicle RPC links")]
pub struct Cli {
    /// TOML config file; every field is optional
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Candidate vehicle endpoint (host:port); repeat for more vehicles
    #[arg(long = "vehicle", value_name = "HOST:PORT")]
    pub vehicles: Vec<VehicleEndpoint>,

    /// Default leader-follower tick period
    #[arg(long)]
    pub follow_interval_ms: Option<u64>,

    /// Reopen telemetry streams that break, with exponential backoff
    #[arg(long)]
    pub resubscribe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub listen: SocketAddr,
    /// Candidate endpoints probed by discovery; the first is the default target
    pub vehicles: Vec<VehicleEndpoint>,
    pub link: LinkConfig,
    pub discovery: DiscoveryConfig,
    pub follow: FollowConfig,
    pub http: HttpConfig,
    /// Entries kept for `GET /logs`
    pub log_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub connect_timeout_ms: u64,
    pub resubscribe: bool,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub probe_timeout_ms: u64,
    /// Count a vehicle as answering only once it reports a valid fix
    pub require_fix: bool,
    /// Re-run discovery this often; 0 runs it only at startup
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Close a connection that sends no complete request for this long
    pub idle_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen: defaults::BRIDGE_LISTEN
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8081))),
            vehicles: Vec::new(),
            link: LinkConfig::default(),
            discovery: DiscoveryConfig::default(),
            follow: FollowConfig::default(),
            http: HttpConfig::default(),
            log_capacity: defaults::LOG_CAPACITY,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: defaults::CONNECT_TIMEOUT_MS,
            resubscribe: false,
            max_backoff_ms: defaults::MAX_BACKOFF_MS,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
            require_fix: true,
            interval_ms: 0,
        }
    }
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::FOLLOW_INTERVAL_MS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: defaults::HTTP_IDLE_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl DiscoveryConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl FollowConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl HttpConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl BridgeConfig {
    /// Read the file if one is given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let s = std::fs::read_to_string(path)
                    .with_context(|| format!("read config {}", path.display()))?;
                Self::from_toml(&s)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse config toml")
    }

    /// Apply CLI flags on top of the file
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(listen) = cli.listen {
            self.listen = listen;
        }
        if !cli.vehicles.is_empty() {
            self.vehicles = cli.vehicles.clone();
        }
        if let Some(interval) = cli.follow_interval_ms {
            self.follow.interval_ms = interval;
        }
        if cli.resubscribe {
            self.link.resubscribe = true;
        }
        if self.vehicles.is_empty() {
            self.vehicles = default_vehicles();
        }
        self
    }

    /// Target used when a request names no vehicle
    pub fn default_target(&self) -> Target {
        self.vehicles
            .first()
            .cloned()
            .map(Target::One)
            .unwrap_or(Target::All)
    }
}

fn default_vehicles() -> Vec<VehicleEndpoint> {
    defaults::VEHICLE_ENDPOINT.parse().into_iter().collect()
}
