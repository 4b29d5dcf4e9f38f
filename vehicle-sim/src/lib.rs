//! Simulated vehicle RPC service
//!
//! A [`SimVehicle`] answers the command channel and streams telemetry on the
//! five telemetry channels plus mission progress. State changes follow a few
//! simple rules so the bridge can be exercised end to end without an autopilot.

mod session;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use swarmlink_shared::{
    command_request::Params, defaults, ActionResult, Channel, CommandOutcome, CommandRequest,
    CommandType, FlightMode, MissionItem, Position,
};
use tokio::io::{AsyncRead, AsyncWrite};

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Launch position; also where return-to-launch goes
    pub home: Position,
    /// Report a (0, 0) position until a goto or follow target moves the vehicle
    pub without_fix: bool,
    /// Period between telemetry records on each stream
    pub telemetry_interval: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            home: Position {
                latitude_deg: 47.397742,
                longitude_deg: 8.545594,
                absolute_altitude_m: 488.0,
                relative_altitude_m: 0.0,
            },
            without_fix: false,
            telemetry_interval: Duration::from_millis(defaults::SIM_TELEMETRY_INTERVAL_MS),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SimState {
    pub position: Position,
    pub armed: bool,
    pub flight_mode: FlightMode,
    pub following: bool,
    pub mission: Vec<MissionItem>,
    pub mission_current: i32,
    pub battery_percent: f32,
    pub status_text: String,
    pub received: Vec<CommandType>,
    pub closed_channels: HashSet<Channel>,
}

/// One simulated vehicle; cheap to clone, clones share state
#[derive(Clone)]
pub struct SimVehicle {
    config: SimConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimVehicle {
    pub fn new(config: SimConfig) -> Self {
        let position = if config.without_fix {
            Position {
                latitude_deg: 0.0,
                longitude_deg: 0.0,
                ..config.home.clone()
            }
        } else {
            config.home.clone()
        };

        Self {
            state: Arc::new(Mutex::new(SimState {
                position,
                armed: false,
                flight_mode: FlightMode::Ready,
                following: false,
                mission: Vec::new(),
                mission_current: 0,
                battery_percent: 100.0,
                status_text: "Ready to fly".into(),
                received: Vec::new(),
                closed_channels: HashSet::new(),
            })),
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Serve one stream until the peer disconnects
    pub async fn serve<S>(&self, stream: S) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        session::serve(self, stream).await
    }

    /// Commands received so far, in arrival order
    pub fn received(&self) -> Vec<CommandType> {
        self.lock().received.clone()
    }

    pub fn position(&self) -> Position {
        self.lock().position.clone()
    }

    pub fn flight_mode(&self) -> FlightMode {
        self.lock().flight_mode
    }

    /// End every current and future stream for `channel`
    pub fn close_channel(&self, channel: Channel) {
        self.lock().closed_channels.insert(channel);
    }

    pub(crate) fn is_closed(&self, channel: Channel) -> bool {
        self.lock().closed_channels.contains(&channel)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply a command to the simulated state and produce its outcome
    pub fn handle_command(&self, request: &CommandRequest) -> CommandOutcome {
        let id = request.request_id;
        let cmd_type = CommandType::try_from(request.cmd_type).unwrap_or(CommandType::CmdUnknown);
        let home = self.config.home.clone();

        let mut state = self.lock();
        state.received.push(cmd_type);

        match (cmd_type, &request.params) {
            (CommandType::CmdArm, _) => {
                state.armed = true;
                CommandOutcome::success(id)
            }
            (CommandType::CmdDisarm, _) => {
                state.armed = false;
                CommandOutcome::success(id)
            }
            (CommandType::CmdTakeoff, _) => {
                if !state.armed {
                    return CommandOutcome::failure(id, ActionResult::ResultCommandDenied, "Not armed");
                }
                state.flight_mode = FlightMode::Takeoff;
                state.position.relative_altitude_m = 10.0;
                state.position.absolute_altitude_m = home.absolute_altitude_m + 10.0;
                CommandOutcome::success(id)
            }
            (CommandType::CmdLand, _) => {
                state.flight_mode = FlightMode::Land;
                state.position.relative_altitude_m = 0.0;
                state.position.absolute_altitude_m = home.absolute_altitude_m;
                CommandOutcome::success(id)
            }
            (CommandType::CmdHold, _) | (CommandType::CmdMissionPause, _) => {
                state.flight_mode = FlightMode::Hold;
                CommandOutcome::success(id)
            }
            (CommandType::CmdReturnToLaunch, _) => {
                state.flight_mode = FlightMode::ReturnToLaunch;
                state.position = home;
                CommandOutcome::success(id)
            }
            (CommandType::CmdGotoLocation, Some(Params::Goto(goto))) => {
                state.flight_mode = FlightMode::Hold;
                state.position.latitude_deg = goto.latitude_deg;
                state.position.longitude_deg = goto.longitude_deg;
                state.position.absolute_altitude_m = goto.absolute_altitude_m;
                CommandOutcome::success(id)
            }
            (CommandType::CmdDoOrbit, Some(Params::Orbit(_))) => {
                state.flight_mode = FlightMode::Hold;
                CommandOutcome::success(id)
            }
            (CommandType::CmdFollowMeStart, _) => {
                state.following = true;
                state.flight_mode = FlightMode::FollowMe;
                CommandOutcome::success(id)
            }
            (CommandType::CmdFollowMeStop, _) => {
                state.following = false;
                state.flight_mode = FlightMode::Hold;
                CommandOutcome::success(id)
            }
            (CommandType::CmdFollowMeSetTarget, Some(Params::FollowTarget(target))) => {
                if state.following {
                    state.position.latitude_deg = target.latitude_deg;
                    state.position.longitude_deg = target.longitude_deg;
                    state.position.absolute_altitude_m = target.absolute_altitude_m;
                }
                CommandOutcome::success(id)
            }
            (CommandType::CmdMissionUpload, Some(Params::Mission(plan))) => {
                if plan.mission_items.is_empty() {
                    return CommandOutcome::failure(id, ActionResult::ResultFailure, "Empty mission");
                }
                state.mission = plan.mission_items.clone();
                state.mission_current = 0;
                CommandOutcome::success(id)
            }
            (CommandType::CmdMissionStart, _) => {
                if state.mission.is_empty() {
                    return CommandOutcome::failure(
                        id,
                        ActionResult::ResultCommandDenied,
                        "No mission uploaded",
                    );
                }
                state.flight_mode = FlightMode::Mission;
                CommandOutcome::success(id)
            }
            (cmd_type, _) => CommandOutcome::failure(
                id,
                ActionResult::ResultUnknown,
                format!("Unsupported or malformed command {:?}", cmd_type),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarmlink_shared::{MissionPlan, TargetLocation};

    fn request(id: u64, cmd_type: CommandType, params: Option<Params>) -> CommandRequest {
        CommandRequest {
            request_id: id,
            cmd_type: cmd_type.into(),
            params,
        }
    }

    #[test]
    fn test_takeoff_requires_arm() {
        let sim = SimVehicle::new(SimConfig::default());

        let denied = sim.handle_command(&request(1, CommandType::CmdTakeoff, None));
        assert_eq!(denied.result, ActionResult::ResultCommandDenied as i32);

        sim.handle_command(&request(2, CommandType::CmdArm, None));
        let ok = sim.handle_command(&request(3, CommandType::CmdTakeoff, None));
        assert_eq!(ok.result, ActionResult::ResultSuccess as i32);
        assert_eq!(sim.flight_mode(), FlightMode::Takeoff);
    }

    #[test]
    fn test_mission_start_needs_upload() {
        let sim = SimVehicle::new(SimConfig::default());

        let denied = sim.handle_command(&request(1, CommandType::CmdMissionStart, None));
        assert_eq!(denied.result, ActionResult::ResultCommandDenied as i32);

        let plan = MissionPlan {
            mission_items: vec![MissionItem {
                latitude_deg: 47.39,
                longitude_deg: 8.54,
                relative_altitude_m: 15.0,
                ..Default::default()
            }],
        };
        sim.handle_command(&request(2, CommandType::CmdMissionUpload, Some(Params::Mission(plan))));
        let ok = sim.handle_command(&request(3, CommandType::CmdMissionStart, None));
        assert_eq!(ok.result, ActionResult::ResultSuccess as i32);
        assert_eq!(
            sim.received(),
            vec![
                CommandType::CmdMissionStart,
                CommandType::CmdMissionUpload,
                CommandType::CmdMissionStart
            ]
        );
    }

    #[test]
    fn test_follow_target_moves_only_when_following() {
        let sim = SimVehicle::new(SimConfig::default());
        let target = TargetLocation {
            latitude_deg: 47.5,
            longitude_deg: 8.6,
            absolute_altitude_m: 500.0,
            ..Default::default()
        };

        sim.handle_command(&request(
            1,
            CommandType::CmdFollowMeSetTarget,
            Some(Params::FollowTarget(target.clone())),
        ));
        assert_eq!(sim.position().latitude_deg, SimConfig::default().home.latitude_deg);

        sim.handle_command(&request(2, CommandType::CmdFollowMeStart, None));
        sim.handle_command(&request(
            3,
            CommandType::CmdFollowMeSetTarget,
            Some(Params::FollowTarget(target)),
        ));
        assert_eq!(sim.position().latitude_deg, 47.5);
    }

    #[test]
    fn test_without_fix_reports_zero() {
        let sim = SimVehicle::new(SimConfig {
            without_fix: true,
            ..Default::default()
        });
        let pos = sim.position();
        assert_eq!(pos.latitude_deg, 0.0);
        assert_eq!(pos.longitude_deg, 0.0);
    }
}
