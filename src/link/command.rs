//! One-shot vehicle commands and their outcomes

use serde::Deserialize;
use swarmlink_shared::{
    self as wire, command_request::Params, CommandRequest, CommandType, OrbitYawBehavior,
};

/// Every command the bridge can send; each variant carries its own parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Arm,
    Disarm,
    Takeoff,
    Land,
    Hold,
    ReturnToLaunch,
    GotoLocation {
        latitude_deg: f64,
        longitude_deg: f64,
        absolute_altitude_m: f32,
        yaw_deg: f32,
    },
    DoOrbit {
        radius_m: f32,
        velocity_ms: f32,
        yaw_behavior: OrbitYawBehavior,
        latitude_deg: f64,
        longitude_deg: f64,
        absolute_altitude_m: f64,
    },
    FollowMeStart,
    FollowMeStop,
    FollowMeSetTarget {
        latitude_deg: f64,
        longitude_deg: f64,
        absolute_altitude_m: f32,
    },
    MissionUpload(MissionPlan),
    MissionStart,
    MissionPause,
    /// Opens the mission-progress stream; never reaches the command channel
    SubscribeMissionProgress,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Arm => "arm",
            Command::Disarm => "disarm",
            Command::Takeoff => "takeoff",
            Command::Land => "land",
            Command::Hold => "hold",
            Command::ReturnToLaunch => "return_to_launch",
            Command::GotoLocation { .. } => "goto_location",
            Command::DoOrbit { .. } => "do_orbit",
            Command::FollowMeStart => "follow_me_start",
            Command::FollowMeStop => "follow_me_stop",
            Command::FollowMeSetTarget { .. } => "follow_me_set_target",
            Command::MissionUpload(_) => "mission_upload",
            Command::MissionStart => "mission_start",
            Command::MissionPause => "mission_pause",
            Command::SubscribeMissionProgress => "subscribe_mission_progress",
        }
    }

    /// Wire request for this command, `None` for locally handled commands
    pub fn to_request(&self, request_id: u64) -> Option<CommandRequest> {
        let (cmd_type, params) = match self {
            Command::Arm => (CommandType::CmdArm, None),
            Command::Disarm => (CommandType::CmdDisarm, None),
            Command::Takeoff => (CommandType::CmdTakeoff, None),
            Command::Land => (CommandType::CmdLand, None),
            Command::Hold => (CommandType::CmdHold, None),
            Command::ReturnToLaunch => (CommandType::CmdReturnToLaunch, None),
            Command::GotoLocation {
                latitude_deg,
                longitude_deg,
                absolute_altitude_m,
                yaw_deg,
            } => (
                CommandType::CmdGotoLocation,
                Some(Params::Goto(wire::GotoLocation {
                    latitude_deg: *latitude_deg,
                    longitude_deg: *longitude_deg,
                    absolute_altitude_m: *absolute_altitude_m,
                    yaw_deg: *yaw_deg,
                })),
            ),
            Command::DoOrbit {
                radius_m,
                velocity_ms,
                yaw_behavior,
                latitude_deg,
                longitude_deg,
                absolute_altitude_m,
            } => (
                CommandType::CmdDoOrbit,
                Some(Params::Orbit(wire::DoOrbit {
                    radius_m: *radius_m,
                    velocity_ms: *velocity_ms,
                    yaw_behavior: (*yaw_behavior).into(),
                    latitude_deg: *latitude_deg,
                    longitude_deg: *longitude_deg,
                    absolute_altitude_m: *absolute_altitude_m,
                })),
            ),
            Command::FollowMeStart => (CommandType::CmdFollowMeStart, None),
            Command::FollowMeStop => (CommandType::CmdFollowMeStop, None),
            Command::FollowMeSetTarget {
                latitude_deg,
                longitude_deg,
                absolute_altitude_m,
            } => (
                CommandType::CmdFollowMeSetTarget,
                Some(Params::FollowTarget(wire::TargetLocation {
                    latitude_deg: *latitude_deg,
                    longitude_deg: *longitude_deg,
                    absolute_altitude_m: *absolute_altitude_m,
                    ..Default::default()
                })),
            ),
            Command::MissionUpload(plan) => (
                CommandType::CmdMissionUpload,
                Some(Params::Mission(plan.to_wire())),
            ),
            Command::MissionStart => (CommandType::CmdMissionStart, None),
            Command::MissionPause => (CommandType::CmdMissionPause, None),
            Command::SubscribeMissionProgress => return None,
        };

        Some(CommandRequest {
            request_id,
            cmd_type: cmd_type.into(),
            params,
        })
    }
}

/// One waypoint; everything but the coordinates may be omitted
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MissionItem {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub relative_altitude_m: f32,
    #[serde(default)]
    pub speed_m_s: f32,
    #[serde(default)]
    pub is_fly_through: bool,
    #[serde(default)]
    pub gimbal_pitch_deg: f32,
    #[serde(default)]
    pub gimbal_yaw_deg: f32,
    #[serde(default)]
    pub loiter_time_s: f32,
    #[serde(default)]
    pub acceptance_radius_m: f32,
    #[serde(default)]
    pub yaw_deg: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MissionPlan {
    #[serde(default)]
    pub mission_items: Vec<MissionItem>,
}

impl MissionPlan {
    pub fn is_empty(&self) -> bool {
        self.mission_items.is_empty()
    }

    fn to_wire(&self) -> wire::MissionPlan {
        wire::MissionPlan {
            mission_items: self
                .mission_items
                .iter()
                .map(|item| wire::MissionItem {
                    latitude_deg: item.latitude_deg,
                    longitude_deg: item.longitude_deg,
                    relative_altitude_m: item.relative_altitude_m,
                    speed_m_s: item.speed_m_s,
                    is_fly_through: item.is_fly_through,
                    gimbal_pitch_deg: item.gimbal_pitch_deg,
                    gimbal_yaw_deg: item.gimbal_yaw_deg,
                    loiter_time_s: item.loiter_time_s,
                    acceptance_radius_m: item.acceptance_radius_m,
                    yaw_deg: item.yaw_deg,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Failure,
}

/// What a vehicle reported for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub result: ActionResult,
    pub reason: String,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self {
            result: ActionResult::Success,
            reason: "Success".into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            result: ActionResult::Failure,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ActionResult::Success
    }
}

impl From<wire::CommandOutcome> for ActionOutcome {
    fn from(outcome: wire::CommandOutcome) -> Self {
        let success = wire::ActionResult::try_from(outcome.result)
            .map(|r| r == wire::ActionResult::ResultSuccess)
            .unwrap_or(false);

        Self {
            result: if success {
                ActionResult::Success
            } else {
                ActionResult::Failure
            },
            reason: outcome.result_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_argument_request() {
        let req = Command::Takeoff.to_request(3).unwrap();
        assert_eq!(req.request_id, 3);
        assert_eq!(req.cmd_type, CommandType::CmdTakeoff as i32);
        assert!(req.params.is_none());
    }

    #[test]
    fn test_orbit_request_carries_params() {
        let cmd = Command::DoOrbit {
            radius_m: 20.0,
            velocity_ms: 3.0,
            yaw_behavior: OrbitYawBehavior::HoldInitialHeading,
            latitude_deg: 47.39,
            longitude_deg: 8.54,
            absolute_altitude_m: 510.0,
        };
        match cmd.to_request(1).and_then(|r| r.params) {
            Some(Params::Orbit(orbit)) => {
                assert_eq!(orbit.radius_m, 20.0);
                assert_eq!(orbit.yaw_behavior, OrbitYawBehavior::HoldInitialHeading as i32);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn test_progress_subscription_stays_local() {
        assert!(Command::SubscribeMissionProgress.to_request(1).is_none());
    }

    #[test]
    fn test_mission_item_defaults() {
        let plan: MissionPlan = serde_json::from_str(
            r#"{"mission_items":[{"latitude_deg":47.39,"longitude_deg":8.54,"relative_altitude_m":15}]}"#,
        )
        .unwrap();
        assert_eq!(plan.mission_items.len(), 1);
        assert_eq!(plan.mission_items[0].relative_altitude_m, 15.0);
        assert_eq!(plan.mission_items[0].speed_m_s, 0.0);

        let wire = plan.to_wire();
        assert_eq!(wire.mission_items[0].latitude_deg, 47.39);
    }

    #[test]
    fn test_outcome_from_wire() {
        let ok = ActionOutcome::from(wire::CommandOutcome::success(1));
        assert!(ok.is_success());

        let denied = ActionOutcome::from(wire::CommandOutcome::failure(
            2,
            wire::ActionResult::ResultCommandDenied,
            "Not armed",
        ));
        assert_eq!(denied, ActionOutcome::failure("Not armed"));
    }
}
