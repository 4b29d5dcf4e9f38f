//! TCP transport to vehicle RPC services

use crate::link::VehicleEndpoint;
use crate::transport::traits::LinkConnector;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Opens one TCP connection per channel
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl LinkConnector for TcpConnector {
    type Stream = TcpStream;

    async fn open(&self, endpoint: &VehicleEndpoint) -> Result<Self::Stream> {
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((endpoint.host(), endpoint.port())),
        )
        .await
        .map_err(|_| anyhow!("connect to {} timed out after {:?}", endpoint, self.connect_timeout))?
        .with_context(|| format!("connect to {}", endpoint))?;

        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}
