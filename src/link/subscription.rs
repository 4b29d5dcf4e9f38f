//! Telemetry stream subscriptions feeding a [`ChannelCache`]

use std::sync::Arc;
use std::time::Duration;

use swarmlink_shared::{
    codec::{FrameReader, FrameWriter},
    envelope::Payload,
    Channel, Envelope, TelemetryRecord,
};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{cache::ChannelCache, VehicleEndpoint};
use crate::config::LinkConfig;
use crate::error::SubscriptionError;
use crate::transport::LinkConnector;

/// Delay before restart attempt `attempt` (0-based): 1 s doubling up to `max`
pub(crate) fn calculate_backoff(attempt: u32, max: Duration) -> Duration {
    let secs = 2u64.saturating_pow(attempt.min(20));
    Duration::from_secs(secs).min(max)
}

/// Open one stream for `channel` and apply its records until it ends
///
/// Returns `Ok(())` when the vehicle closes the stream cleanly.
pub(crate) async fn subscribe_once<C: LinkConnector>(
    endpoint: &VehicleEndpoint,
    connector: &C,
    cache: &ChannelCache,
    channel: Channel,
    open_timeout: Duration,
) -> Result<(), SubscriptionError> {
    let open_failed = |reason: String| SubscriptionError::Open { channel, reason };

    let stream = timeout(open_timeout, connector.open(endpoint))
        .await
        .map_err(|_| open_failed(format!("timed out after {:?}", open_timeout)))?
        .map_err(|e| open_failed(e.to_string()))?;

    let (reader, writer) = tokio::io::split(stream);
    let mut writer = FrameWriter::new(writer);
    writer
        .send(&Envelope::open(channel))
        .await
        .map_err(|e| open_failed(e.to_string()))?;

    let mut reader = FrameReader::new(reader);
    loop {
        match reader.recv().await {
            Ok(Some(Envelope {
                payload:
                    Some(Payload::Telemetry(TelemetryRecord {
                        record: Some(record),
                    })),
            })) => {
                if record.channel() != channel {
                    debug!(vehicle = %endpoint, ?channel, "Dropping record for {:?}", record.channel());
                    continue;
                }
                cache.apply(record);
            }
            Ok(Some(other)) => debug!(vehicle = %endpoint, ?channel, "Ignoring frame: {:?}", other),
            Ok(None) => return Ok(()),
            Err(e) => {
                return Err(SubscriptionError::Stream {
                    channel,
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Keep `channel` flowing into `cache` until cancelled
///
/// Without `resubscribe` a broken stream is logged and the cache stays at its
/// last value. With it, the stream is reopened after an exponential backoff.
pub(crate) async fn run<C: LinkConnector>(
    endpoint: VehicleEndpoint,
    connector: Arc<C>,
    cache: Arc<ChannelCache>,
    channel: Channel,
    config: LinkConfig,
    cancel: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        let seq_before = cache.read(channel).map(|c| c.seq).unwrap_or(0);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = subscribe_once(&endpoint, connector.as_ref(), &cache, channel, config.connect_timeout()) => result,
        };

        let error = result.err().unwrap_or(SubscriptionError::Ended { channel });
        warn!(vehicle = %endpoint, ?channel, "{}", error);

        if !config.resubscribe {
            return;
        }

        // A stream that delivered data was healthy; start the backoff over
        if cache.read(channel).map(|c| c.seq).unwrap_or(0) > seq_before {
            attempt = 0;
        }
        let delay = calculate_backoff(attempt, config.max_backoff());
        attempt = attempt.saturating_add(1);
        info!(vehicle = %endpoint, ?channel, "Resubscribing in {:?}", delay);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = sleep(delay) => {}
        }
    }
}

/// Whether `endpoint` streams a position within `wait`
///
/// Feeds a throwaway cache from a single position subscription. With
/// `require_fix` the position must also be a valid fix.
pub(crate) async fn probe<C: LinkConnector>(
    endpoint: &VehicleEndpoint,
    connector: &C,
    wait: Duration,
    require_fix: bool,
) -> bool {
    let cache = ChannelCache::new();
    let mut position = cache.watch_position();
    let answers = move |p: &super::Cached<super::VehiclePosition>| {
        p.received() && (!require_fix || p.value.is_valid())
    };

    let probing = async {
        tokio::select! {
            seen = position.wait_for(answers) => seen.is_ok(),
            ended = subscribe_once(endpoint, connector, &cache, Channel::Position, wait) => {
                if let Err(e) = ended {
                    debug!(vehicle = %endpoint, "Probe stream: {}", e);
                }
                answers(&cache.position())
            }
        }
    };

    timeout(wait, probing).await.unwrap_or(false)
}
