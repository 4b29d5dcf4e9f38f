//! Latest-value cache for one vehicle's telemetry channels
//!
//! Each channel is a `watch` cell. The subscription task for a channel is its
//! only writer; readers borrow the current value without awaiting.

use serde::Serialize;
use swarmlink_shared::{telemetry_record::Record, Channel};
use tokio::sync::watch;

use super::telemetry::{Battery, FlightMode, Health, MissionProgress, StatusText, VehiclePosition};

/// A cached value and the number of records applied so far
///
/// `seq == 0` means nothing has been received on the channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Cached<T> {
    pub value: T,
    pub seq: u64,
}

impl<T> Cached<T> {
    pub fn received(&self) -> bool {
        self.seq > 0
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Cached<U> {
        Cached {
            value: f(self.value),
            seq: self.seq,
        }
    }
}

/// Any channel's value, for callers that pick the channel at runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Position(VehiclePosition),
    Health(Health),
    FlightMode { flight_mode: FlightMode },
    StatusText(StatusText),
    Battery(Battery),
    MissionProgress(MissionProgress),
}

pub struct ChannelCache {
    position: watch::Sender<Cached<VehiclePosition>>,
    health: watch::Sender<Cached<Health>>,
    flight_mode: watch::Sender<Cached<FlightMode>>,
    status_text: watch::Sender<Cached<StatusText>>,
    battery: watch::Sender<Cached<Battery>>,
    mission_progress: watch::Sender<Cached<MissionProgress>>,
}

fn cell<T: Default>() -> watch::Sender<Cached<T>> {
    watch::channel(Cached::default()).0
}

fn overwrite<T>(cell: &watch::Sender<Cached<T>>, value: T) {
    cell.send_modify(|cached| {
        cached.value = value;
        cached.seq += 1;
    });
}

impl ChannelCache {
    pub fn new() -> Self {
        Self {
            position: cell(),
            health: cell(),
            flight_mode: cell(),
            status_text: cell(),
            battery: cell(),
            mission_progress: cell(),
        }
    }

    /// Overwrite the entry for the record's channel and bump its sequence
    pub(crate) fn apply(&self, record: Record) {
        match record {
            Record::Position(p) => overwrite(&self.position, p.into()),
            Record::Health(h) => overwrite(&self.health, h.into()),
            Record::FlightMode(m) => overwrite(&self.flight_mode, m.into()),
            Record::StatusText(s) => overwrite(&self.status_text, s.into()),
            Record::Battery(b) => overwrite(&self.battery, b.into()),
            Record::MissionProgress(p) => overwrite(&self.mission_progress, p.into()),
        }
    }

    pub fn position(&self) -> Cached<VehiclePosition> {
        self.position.borrow().clone()
    }

    /// Receiver notified on every position update
    pub fn watch_position(&self) -> watch::Receiver<Cached<VehiclePosition>> {
        self.position.subscribe()
    }

    /// Current value of any telemetry channel; `None` for non-telemetry channels
    pub fn read(&self, channel: Channel) -> Option<Cached<TelemetryValue>> {
        let value = match channel {
            Channel::Position => self.position().map(TelemetryValue::Position),
            Channel::Health => self.health.borrow().clone().map(TelemetryValue::Health),
            Channel::FlightMode => self
                .flight_mode
                .borrow()
                .clone()
                .map(|flight_mode| TelemetryValue::FlightMode { flight_mode }),
            Channel::StatusText => self.status_text.borrow().clone().map(TelemetryValue::StatusText),
            Channel::Battery => self.battery.borrow().clone().map(TelemetryValue::Battery),
            Channel::MissionProgress => self
                .mission_progress
                .borrow()
                .clone()
                .map(TelemetryValue::MissionProgress),
            Channel::Command | Channel::Unknown => return None,
        };
        Some(value)
    }
}

impl Default for ChannelCache {
    fn default() -> Self {
        Self::new()
    }
}
