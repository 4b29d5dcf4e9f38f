//! SwarmLink Shared Protocol Types
//!
//! This crate provides the wire messages and frame codec spoken between the
//! ground bridge and each vehicle's RPC service.

pub mod codec;
pub mod proto;

pub use proto::*;

/// Default values shared by the bridge and the simulator
pub mod defaults {
    /// HTTP listen address for the bridge
    pub const BRIDGE_LISTEN: &str = "0.0.0.0:8081";

    /// Vehicle RPC endpoint used when none is configured
    pub const VEHICLE_ENDPOINT: &str = "127.0.0.1:50000";

    /// Timeout for opening a command or telemetry stream
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;

    /// How long a discovery probe waits for a position record
    pub const PROBE_TIMEOUT_MS: u64 = 2000;

    /// Leader-follower tick period
    pub const FOLLOW_INTERVAL_MS: u64 = 1000;

    /// Entries kept in the operation log ring
    pub const LOG_CAPACITY: usize = 100;

    /// Upper bound for subscription restart backoff
    pub const MAX_BACKOFF_MS: u64 = 30_000;

    /// HTTP connections idle longer than this are closed
    pub const HTTP_IDLE_TIMEOUT_MS: u64 = 30_000;

    /// Rate at which the simulator streams telemetry
    pub const SIM_TELEMETRY_INTERVAL_MS: u64 = 200;
}

impl Envelope {
    /// First frame on every stream, naming the channel it carries
    pub fn open(channel: Channel) -> Self {
        Self {
            payload: Some(envelope::Payload::Open(ChannelOpen {
                channel: channel.into(),
            })),
        }
    }

    pub fn command(request: CommandRequest) -> Self {
        Self {
            payload: Some(envelope::Payload::Command(request)),
        }
    }

    pub fn outcome(outcome: CommandOutcome) -> Self {
        Self {
            payload: Some(envelope::Payload::Outcome(outcome)),
        }
    }

    pub fn telemetry(record: telemetry_record::Record) -> Self {
        Self {
            payload: Some(envelope::Payload::Telemetry(TelemetryRecord {
                record: Some(record),
            })),
        }
    }
}

impl CommandOutcome {
    /// Outcome for a command the vehicle accepted and completed
    pub fn success(request_id: u64) -> Self {
        Self {
            request_id,
            result: ActionResult::ResultSuccess.into(),
            result_str: "Success".into(),
        }
    }

    /// Outcome for a command the vehicle could not carry out
    pub fn failure(request_id: u64, result: ActionResult, message: impl Into<String>) -> Self {
        Self {
            request_id,
            result: result.into(),
            result_str: message.into(),
        }
    }
}

impl telemetry_record::Record {
    /// Channel this record belongs to
    pub fn channel(&self) -> Channel {
        match self {
            Self::Position(_) => Channel::Position,
            Self::Health(_) => Channel::Health,
            Self::FlightMode(_) => Channel::FlightMode,
            Self::StatusText(_) => Channel::StatusText,
            Self::Battery(_) => Channel::Battery,
            Self::MissionProgress(_) => Channel::MissionProgress,
        }
    }
}

impl Channel {
    /// Channels every adapter subscribes to on connect
    pub const TELEMETRY: [Channel; 5] = [
        Channel::Position,
        Channel::Health,
        Channel::FlightMode,
        Channel::StatusText,
        Channel::Battery,
    ];
}
