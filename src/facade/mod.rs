//! Request/response boundary over the vehicle links
//!
//! Commands are acknowledged once they are handed to the resolved adapters;
//! outcomes arrive later on background tasks and only reach the log. Reads
//! come straight from the channel caches and never touch the network.

pub mod mission;
pub mod params;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use swarmlink_shared::Channel;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::{DispatchError, FacadeError, ValidationError};
use crate::link::{
    ActionOutcome, Command, MissionPlan, TelemetryValue, VehicleEndpoint, VehicleLink,
    VehiclePosition,
};
use crate::registry::{Fleet, Target};
use mission::MissionGate;

/// Cached telemetry for a read request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reading {
    One(TelemetryValue),
    /// `vehicle=all`: one entry per active vehicle, `None` where nothing is available
    PerVehicle(BTreeMap<VehicleEndpoint, Option<TelemetryValue>>),
}

pub struct CommandFacade {
    fleet: Arc<dyn Fleet>,
    missions: MissionGate,
    default_target: Target,
}

impl CommandFacade {
    pub fn new(fleet: Arc<dyn Fleet>, default_target: Target) -> Self {
        Self {
            fleet,
            missions: MissionGate::default(),
            default_target,
        }
    }

    pub fn default_target(&self) -> &Target {
        &self.default_target
    }

    pub fn fleet(&self) -> &Arc<dyn Fleet> {
        &self.fleet
    }

    pub fn missions(&self) -> &MissionGate {
        &self.missions
    }

    async fn links(&self, target: &Target) -> Result<Vec<Arc<dyn VehicleLink>>, FacadeError> {
        let links = self.fleet.resolve(target).await;
        if links.is_empty() {
            return Err(FacadeError::NoVehicle(target.clone()));
        }
        Ok(links)
    }

    /// Forward `command` to every vehicle `target` resolves to
    ///
    /// Returns the number of vehicles it was handed to.
    pub async fn dispatch(&self, target: &Target, command: Command) -> Result<usize, FacadeError> {
        let links = self.links(target).await?;
        let mut forwarded = 0;

        for link in &links {
            if let Some(outcome) = forward(link.as_ref(), command.clone()) {
                watch(link.endpoint().clone(), command.name(), outcome);
                forwarded += 1;
            }
        }

        info!(vehicles = %target, "{} forwarded to {} vehicle(s)", command.name(), forwarded);
        Ok(forwarded)
    }

    /// Upload `plan` as a single command to each resolved vehicle
    pub async fn upload_mission(&self, target: &Target, plan: MissionPlan) -> Result<usize, FacadeError> {
        if plan.is_empty() {
            return Err(ValidationError::EmptyMission.into());
        }
        let links = self.links(target).await?;
        let items = plan.mission_items.len();
        let command = Command::MissionUpload(plan);
        let mut forwarded = 0;

        for link in &links {
            let endpoint = link.endpoint().clone();
            let generation = self.missions.begin(&endpoint, link.link_id());

            let Some(outcome) = forward(link.as_ref(), command.clone()) else {
                self.missions.finish(&endpoint, generation, false);
                continue;
            };
            forwarded += 1;

            let missions = self.missions.clone();
            tokio::spawn(async move {
                let uploaded = report(&endpoint, "mission_upload", outcome).await;
                if !missions.finish(&endpoint, generation, uploaded) {
                    info!(vehicle = %endpoint, "Ignoring outcome of superseded mission upload");
                }
            });
        }

        info!(vehicles = %target, "Mission with {} item(s) forwarded to {} vehicle(s)", items, forwarded);
        Ok(forwarded)
    }

    /// Start the uploaded mission and subscribe to its progress
    ///
    /// Only vehicles whose upload succeeded are started; if there are none,
    /// nothing is dispatched.
    pub async fn start_mission(&self, target: &Target) -> Result<usize, FacadeError> {
        let ready: Vec<_> = self
            .links(target)
            .await?
            .into_iter()
            .filter(|link| self.missions.is_uploaded(link.endpoint(), link.link_id()))
            .collect();

        if ready.is_empty() {
            return Err(FacadeError::MissionNotUploaded(target.clone()));
        }

        for link in &ready {
            for command in [Command::MissionStart, Command::SubscribeMissionProgress] {
                if let Some(outcome) = forward(link.as_ref(), command.clone()) {
                    watch(link.endpoint().clone(), command.name(), outcome);
                }
            }
        }

        info!(vehicles = %target, "Mission started on {} vehicle(s)", ready.len());
        Ok(ready.len())
    }

    pub async fn pause_mission(&self, target: &Target) -> Result<usize, FacadeError> {
        self.dispatch(target, Command::MissionPause).await
    }

    /// Cached position of `endpoint` if it is a valid fix
    pub async fn position(&self, endpoint: &VehicleEndpoint) -> Option<VehiclePosition> {
        let links = self.fleet.resolve(&Target::One(endpoint.clone())).await;
        links.first().and_then(|link| match available(link.as_ref(), Channel::Position) {
            Some(TelemetryValue::Position(p)) => Some(p),
            _ => None,
        })
    }

    /// Latest cached value of `channel`
    pub async fn read(&self, target: &Target, channel: Channel) -> Result<Reading, FacadeError> {
        let links = self.links(target).await?;

        match target {
            Target::One(_) => links
                .first()
                .and_then(|link| available(link.as_ref(), channel))
                .map(Reading::One)
                .ok_or(FacadeError::NotAvailable(label(channel))),
            Target::All => Ok(Reading::PerVehicle(
                links
                    .iter()
                    .map(|link| (link.endpoint().clone(), available(link.as_ref(), channel)))
                    .collect(),
            )),
        }
    }
}

fn label(channel: Channel) -> &'static str {
    match channel {
        Channel::Position => "GPS data",
        Channel::Health => "Health data",
        Channel::FlightMode => "Flight mode",
        Channel::StatusText => "Status text",
        Channel::Battery => "Battery data",
        Channel::MissionProgress => "Mission progress",
        Channel::Command | Channel::Unknown => "Telemetry",
    }
}

/// Cached value if one has arrived; positions must also be a valid fix
fn available(link: &dyn VehicleLink, channel: Channel) -> Option<TelemetryValue> {
    let cached = link.cache().read(channel)?;
    if !cached.received() {
        return None;
    }
    match cached.value {
        TelemetryValue::Position(p) if !p.is_valid() => None,
        value => Some(value),
    }
}

fn forward(link: &dyn VehicleLink, command: Command) -> Option<oneshot::Receiver<ActionOutcome>> {
    match link.execute(command) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            warn!(vehicle = %link.endpoint(), "{}", e);
            None
        }
    }
}

/// Log the outcome once it arrives; true on success
async fn report(
    endpoint: &VehicleEndpoint,
    command: &'static str,
    outcome: oneshot::Receiver<ActionOutcome>,
) -> bool {
    match outcome.await {
        Ok(outcome) if outcome.is_success() => {
            info!(vehicle = %endpoint, "{} succeeded", command);
            true
        }
        Ok(outcome) => {
            let error = DispatchError::Failed {
                endpoint: endpoint.clone(),
                command,
                reason: outcome.reason,
            };
            warn!(vehicle = %endpoint, "{}", error);
            false
        }
        Err(_) => {
            let error = DispatchError::OutcomeLost {
                endpoint: endpoint.clone(),
                command,
            };
            warn!(vehicle = %endpoint, "{}", error);
            false
        }
    }
}

fn watch(endpoint: VehicleEndpoint, command: &'static str, outcome: oneshot::Receiver<ActionOutcome>) {
    tokio::spawn(async move {
        report(&endpoint, command, outcome).await;
    });
}
