//! In-memory transport backed by simulated vehicles

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::io::DuplexStream;
use vehicle_sim::SimVehicle;

use crate::link::VehicleEndpoint;
use crate::transport::traits::LinkConnector;

/// Connects endpoints to in-process [`SimVehicle`]s over duplex pipes
#[derive(Default)]
pub struct MemoryConnector {
    vehicles: HashMap<VehicleEndpoint, SimVehicle>,
    opened: AtomicUsize,
    /// Simulated connect latency
    delay: Duration,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(mut self, endpoint: &str, sim: SimVehicle) -> Self {
        let endpoint = endpoint.parse().expect("test endpoint");
        self.vehicles.insert(endpoint, sim);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Streams opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkConnector for MemoryConnector {
    type Stream = DuplexStream;

    async fn open(&self, endpoint: &VehicleEndpoint) -> Result<Self::Stream> {
        let sim = self
            .vehicles
            .get(endpoint)
            .cloned()
            .ok_or_else(|| anyhow!("connection refused: {}", endpoint))?;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(async move {
            let _ = sim.serve(server).await;
        });
        Ok(client)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
