//! Vehicle links
//!
//! A [`VehicleAdapter`] owns everything the bridge keeps per vehicle: the
//! command channel, the telemetry subscriptions and the [`ChannelCache`] they
//! feed. Callers above this module only see the [`VehicleLink`] trait.

pub mod adapter;
pub mod cache;
pub mod command;
pub mod endpoint;
pub mod subscription;
pub mod telemetry;

pub use adapter::VehicleAdapter;
pub use cache::{Cached, ChannelCache, TelemetryValue};
pub use command::{ActionOutcome, ActionResult, Command, MissionItem, MissionPlan};
pub use endpoint::VehicleEndpoint;
pub use telemetry::VehiclePosition;

use tokio::sync::oneshot;

use crate::error::DispatchError;

/// What the facade needs from a connected vehicle
pub trait VehicleLink: Send + Sync {
    fn endpoint(&self) -> &VehicleEndpoint;

    /// Distinct for every connection; a vehicle that is dropped and
    /// rediscovered comes back with a new id
    fn link_id(&self) -> u64;

    /// Enqueue `command` without waiting for the vehicle
    ///
    /// The receiver yields the outcome once the vehicle answers. Commands are
    /// written to the vehicle in the order they were enqueued.
    fn execute(&self, command: Command) -> Result<oneshot::Receiver<ActionOutcome>, DispatchError>;

    /// Latest telemetry; never blocks
    fn cache(&self) -> &ChannelCache;
}
