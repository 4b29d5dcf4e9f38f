//! Per-vehicle link: command channel plus telemetry subscriptions

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use swarmlink_shared::{
    codec::{FrameReader, FrameWriter},
    envelope::Payload,
    Channel, Envelope,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{subscription, ActionOutcome, ChannelCache, Command, VehicleEndpoint, VehicleLink};
use crate::config::LinkConfig;
use crate::error::{DispatchError, LinkError};
use crate::transport::LinkConnector;

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

/// A command waiting for its turn on the command channel
struct QueuedCommand {
    command: Command,
    reply: oneshot::Sender<ActionOutcome>,
}

/// A command written to the vehicle, awaiting its outcome
struct PendingCommand {
    name: &'static str,
    reply: oneshot::Sender<ActionOutcome>,
}

/// Link to one vehicle
///
/// Owns the command channel task and one task per telemetry subscription.
/// Dropping the adapter cancels all of them.
pub struct VehicleAdapter<C: LinkConnector> {
    endpoint: VehicleEndpoint,
    link_id: u64,
    connector: Arc<C>,
    config: LinkConfig,
    cache: Arc<ChannelCache>,
    commands: mpsc::UnboundedSender<QueuedCommand>,
    progress_open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl<C: LinkConnector> VehicleAdapter<C> {
    /// Open the command channel and start the telemetry subscriptions
    ///
    /// Fails only if the command channel cannot be opened within the connect
    /// timeout. Subscriptions that fail to open are logged.
    pub async fn connect(
        endpoint: VehicleEndpoint,
        connector: Arc<C>,
        config: LinkConfig,
    ) -> Result<Self, LinkError> {
        let connect_failed = |reason: String| LinkError::Connect {
            endpoint: endpoint.clone(),
            reason,
        };

        let stream = timeout(config.connect_timeout(), connector.open(&endpoint))
            .await
            .map_err(|_| LinkError::Timeout(endpoint.clone()))?
            .map_err(|e| connect_failed(e.to_string()))?;

        let (reader, writer) = tokio::io::split(stream);
        let mut writer = FrameWriter::new(writer);
        writer
            .send(&Envelope::open(Channel::Command))
            .await
            .map_err(|e| connect_failed(e.to_string()))?;

        let cancel = CancellationToken::new();
        let (commands, queue) = mpsc::unbounded_channel();

        tokio::spawn(command_loop(
            endpoint.clone(),
            FrameReader::new(reader),
            writer,
            queue,
            cancel.clone(),
        ));

        let adapter = Self {
            endpoint,
            link_id: NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed),
            connector,
            config,
            cache: Arc::new(ChannelCache::new()),
            commands,
            progress_open: Arc::new(AtomicBool::new(false)),
            cancel,
        };

        for channel in Channel::TELEMETRY {
            adapter.spawn_subscription(channel);
        }

        info!(
            vehicle = %adapter.endpoint,
            transport = adapter.connector.name(),
            "Vehicle link established"
        );
        Ok(adapter)
    }

    fn spawn_subscription(&self, channel: Channel) -> tokio::task::JoinHandle<()> {
        tokio::spawn(subscription::run(
            self.endpoint.clone(),
            self.connector.clone(),
            self.cache.clone(),
            channel,
            self.config.clone(),
            self.cancel.child_token(),
        ))
    }

    /// Start the mission-progress subscription unless it is already open
    fn open_progress(&self) {
        if self.progress_open.swap(true, Ordering::SeqCst) {
            debug!(vehicle = %self.endpoint, "Mission progress already subscribed");
            return;
        }

        let handle = self.spawn_subscription(Channel::MissionProgress);
        let open = self.progress_open.clone();
        tokio::spawn(async move {
            let _ = handle.await;
            open.store(false, Ordering::SeqCst);
        });
    }
}

impl<C: LinkConnector> VehicleLink for VehicleAdapter<C> {
    fn endpoint(&self) -> &VehicleEndpoint {
        &self.endpoint
    }

    fn link_id(&self) -> u64 {
        self.link_id
    }

    fn execute(&self, command: Command) -> Result<oneshot::Receiver<ActionOutcome>, DispatchError> {
        if self.commands.is_closed() {
            return Err(DispatchError::ChannelClosed {
                endpoint: self.endpoint.clone(),
            });
        }

        let (reply, outcome) = oneshot::channel();

        if let Command::SubscribeMissionProgress = command {
            self.open_progress();
            let _ = reply.send(ActionOutcome::success());
            return Ok(outcome);
        }

        self.commands
            .send(QueuedCommand { command, reply })
            .map_err(|_| DispatchError::ChannelClosed {
                endpoint: self.endpoint.clone(),
            })?;
        Ok(outcome)
    }

    fn cache(&self) -> &ChannelCache {
        &self.cache
    }
}

impl<C: LinkConnector> Drop for VehicleAdapter<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Write queued commands in order and route outcomes back by request id
async fn command_loop<R, W>(
    endpoint: VehicleEndpoint,
    mut reader: FrameReader<R>,
    mut writer: FrameWriter<W>,
    mut queue: mpsc::UnboundedReceiver<QueuedCommand>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pending: HashMap<u64, PendingCommand> = HashMap::new();
    let mut next_request_id = 0u64;

    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break "link closed".to_string(),
            frame = reader.recv() => match frame {
                Ok(Some(Envelope { payload: Some(Payload::Outcome(outcome)) })) => {
                    match pending.remove(&outcome.request_id) {
                        Some(cmd) => {
                            debug!(vehicle = %endpoint, request_id = outcome.request_id, "{} outcome received", cmd.name);
                            let _ = cmd.reply.send(outcome.into());
                        }
                        None => debug!(vehicle = %endpoint, "Outcome for unknown request {}", outcome.request_id),
                    }
                }
                Ok(Some(other)) => debug!(vehicle = %endpoint, "Ignoring frame on command channel: {:?}", other),
                Ok(None) => break "command channel closed by vehicle".to_string(),
                Err(e) => break format!("command channel error: {}", e),
            },
            queued = queue.recv() => {
                let Some(QueuedCommand { command, reply }) = queued else {
                    break "adapter dropped".to_string();
                };

                next_request_id += 1;
                let Some(request) = command.to_request(next_request_id) else {
                    let _ = reply.send(ActionOutcome::failure(format!("{} is not a vehicle command", command.name())));
                    continue;
                };

                if let Err(e) = writer.send(&Envelope::command(request)).await {
                    let reason = format!("command channel write failed: {}", e);
                    let _ = reply.send(ActionOutcome::failure(reason.clone()));
                    break reason;
                }

                debug!(vehicle = %endpoint, request_id = next_request_id, "Sent {}", command.name());
                pending.insert(next_request_id, PendingCommand { name: command.name(), reply });
            }
        }
    };

    warn!(vehicle = %endpoint, "Command channel down: {}", reason);

    // Anything still queued or in flight will never get an answer
    queue.close();
    while let Ok(queued) = queue.try_recv() {
        let _ = queued.reply.send(ActionOutcome::failure(reason.clone()));
    }
    for (_, cmd) in pending.drain() {
        let _ = cmd.reply.send(ActionOutcome::failure(reason.clone()));
    }
}
