//! Transport abstraction for vehicle link streams

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::link::VehicleEndpoint;

/// A byte stream carrying one logical channel
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> TransportStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Opens streams to vehicle RPC endpoints
///
/// Every channel of a vehicle (command plus each telemetry channel) gets its
/// own stream, so implementations must allow many concurrent opens.
#[async_trait]
pub trait LinkConnector: Send + Sync + 'static {
    /// The stream type this connector produces
    type Stream: TransportStream;

    /// Open a fresh stream to `endpoint`
    async fn open(&self, endpoint: &VehicleEndpoint) -> Result<Self::Stream>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
