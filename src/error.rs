//! Error taxonomy for the bridge

use swarmlink_shared::Channel;
use thiserror::Error;

use crate::link::VehicleEndpoint;
use crate::registry::Target;

/// Malformed or missing request input; nothing is dispatched
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid parameters: missing {0}")]
    Missing(String),

    #[error("Invalid parameters: {field} must be a finite number, got {value:?}")]
    NotANumber { field: String, value: String },

    #[error("Invalid parameters: {field} out of range ({value})")]
    OutOfRange { field: String, value: String },

    #[error("Invalid parameters: {0} must be a non-zero number")]
    Falsy(String),

    #[error("Mission plan has no items")]
    EmptyMission,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Invalid vehicle endpoint: {0:?}")]
    InvalidEndpoint(String),

    #[error("Invalid follow relation: {0}")]
    InvalidRelation(String),
}

/// A command that could not be handed to, or was not honored by, a vehicle
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Command channel to {endpoint} is closed")]
    ChannelClosed { endpoint: VehicleEndpoint },

    #[error("{command} failed on {endpoint}: {reason}")]
    Failed {
        endpoint: VehicleEndpoint,
        command: &'static str,
        reason: String,
    },

    #[error("Outcome of {command} on {endpoint} was lost")]
    OutcomeLost {
        endpoint: VehicleEndpoint,
        command: &'static str,
    },
}

/// A telemetry stream that failed to open or stopped delivering
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubscriptionError {
    #[error("Failed to open {channel:?} stream: {reason}")]
    Open { channel: Channel, reason: String },

    #[error("{channel:?} stream failed: {reason}")]
    Stream { channel: Channel, reason: String },

    #[error("{channel:?} stream ended by vehicle")]
    Ended { channel: Channel },
}

/// Failure to bring up a vehicle's command channel
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("Timed out opening command channel to {0}")]
    Timeout(VehicleEndpoint),

    #[error("Failed to open command channel to {endpoint}: {reason}")]
    Connect {
        endpoint: VehicleEndpoint,
        reason: String,
    },
}

/// Errors surfaced to request/response callers
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FacadeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Vehicle not available: {0}")]
    NoVehicle(Target),

    #[error("No mission uploaded for {0}")]
    MissionNotUploaded(Target),

    #[error("{0} not available")]
    NotAvailable(&'static str),

    #[error("{0}")]
    Coordinator(String),
}

impl FacadeError {
    /// HTTP status the API answers with
    pub fn status_code(&self) -> u16 {
        match self {
            FacadeError::Validation(_) | FacadeError::Coordinator(_) => 400,
            FacadeError::NoVehicle(_) | FacadeError::NotAvailable(_) => 404,
            FacadeError::MissionNotUploaded(_) => 409,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FacadeError::from(ValidationError::EmptyMission).status_code(), 400);
        assert_eq!(FacadeError::NoVehicle(Target::All).status_code(), 404);
        assert_eq!(FacadeError::MissionNotUploaded(Target::All).status_code(), 409);
        assert_eq!(FacadeError::NotAvailable("GPS data").to_string(), "GPS data not available");
    }
}
