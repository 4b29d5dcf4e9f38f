//! Request parameter validation
//!
//! Numbers parse strictly: the whole value must be a finite number. Anything
//! that fails here never reaches a vehicle.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use swarmlink_shared::OrbitYawBehavior;

use crate::coordinator::FollowRelation;
use crate::error::ValidationError;
use crate::link::{Command, MissionPlan, VehicleEndpoint};
use crate::registry::Target;

pub type Query = HashMap<String, String>;

fn number(query: &Query, field: &str) -> Result<f64, ValidationError> {
    let raw = query
        .get(field)
        .ok_or_else(|| ValidationError::Missing(field.to_string()))?;

    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::NotANumber {
            field: field.to_string(),
            value: raw.clone(),
        })
}

fn number_f32(query: &Query, field: &str) -> Result<f32, ValidationError> {
    let value = number(query, field)? as f32;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// `vehicle=<host:port>|all`, falling back to `default` when absent
pub fn target(query: &Query, default: &Target) -> Result<Target, ValidationError> {
    match query.get("vehicle") {
        Some(raw) => raw.parse(),
        None => Ok(default.clone()),
    }
}

pub fn goto(query: &Query) -> Result<Command, ValidationError> {
    Ok(Command::GotoLocation {
        latitude_deg: number(query, "latitude")?,
        longitude_deg: number(query, "longitude")?,
        absolute_altitude_m: number_f32(query, "altitude")?,
        yaw_deg: number_f32(query, "yaw")?,
    })
}

pub fn orbit(query: &Query) -> Result<Command, ValidationError> {
    let radius_m = number_f32(query, "radius")?;
    let velocity_ms = number_f32(query, "velocity")?;

    let raw = query
        .get("yaw_behavior")
        .ok_or_else(|| ValidationError::Missing("yaw_behavior".into()))?;
    let yaw_behavior = raw
        .parse::<i32>()
        .map_err(|_| ValidationError::NotANumber {
            field: "yaw_behavior".into(),
            value: raw.clone(),
        })
        .and_then(|v| {
            OrbitYawBehavior::try_from(v).map_err(|_| ValidationError::OutOfRange {
                field: "yaw_behavior".into(),
                value: raw.clone(),
            })
        })?;

    Ok(Command::DoOrbit {
        radius_m,
        velocity_ms,
        yaw_behavior,
        latitude_deg: number(query, "latitude")?,
        longitude_deg: number(query, "longitude")?,
        absolute_altitude_m: number(query, "altitude")?,
    })
}

fn json(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

/// `{latitude_deg, longitude_deg, absolute_altitude_m}`; each must be a non-zero number
pub fn follow_target(body: &[u8]) -> Result<Command, ValidationError> {
    let body = json(body)?;

    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite() && *v != 0.0)
            .ok_or_else(|| ValidationError::Falsy(name.to_string()))
    };

    Ok(Command::FollowMeSetTarget {
        latitude_deg: field("latitude_deg")?,
        longitude_deg: field("longitude_deg")?,
        absolute_altitude_m: field("absolute_altitude_m")? as f32,
    })
}

#[derive(Deserialize)]
struct UploadBody {
    mission_plan: MissionPlan,
}

/// `{mission_plan: {mission_items: [...]}}` with at least one item
pub fn mission_plan(body: &[u8]) -> Result<MissionPlan, ValidationError> {
    let upload: UploadBody =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;

    let plan = upload.mission_plan;
    if plan.is_empty() {
        return Err(ValidationError::EmptyMission);
    }
    let bad_item = plan
        .mission_items
        .iter()
        .position(|item| !item.latitude_deg.is_finite() || !item.longitude_deg.is_finite());
    if let Some(index) = bad_item {
        return Err(ValidationError::MalformedBody(format!(
            "mission item {} has invalid coordinates",
            index
        )));
    }
    Ok(plan)
}

#[derive(Deserialize)]
struct FollowBody {
    leader: VehicleEndpoint,
    followers: Vec<VehicleEndpoint>,
    interval_ms: Option<u64>,
}

/// `{leader, followers: [...], interval_ms?}`
pub fn follow_request(
    body: &[u8],
    default_interval: Duration,
) -> Result<(FollowRelation, Duration), ValidationError> {
    let request: FollowBody =
        serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;

    let interval = match request.interval_ms {
        Some(0) => {
            return Err(ValidationError::OutOfRange {
                field: "interval_ms".into(),
                value: "0".into(),
            })
        }
        Some(ms) => Duration::from_millis(ms),
        None => default_interval,
    };

    let relation = FollowRelation::new(request.leader, request.followers)?;
    Ok((relation, interval))
}
