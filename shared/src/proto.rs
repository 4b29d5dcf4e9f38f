//! Wire messages for the vehicle RPC link
//!
//! Messages are declared with prost derives so no schema compiler is needed
//! at build time. Tags are part of the wire contract and must not be reused.

/// Logical channel requested by the first frame on a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Channel {
    Unknown = 0,
    Command = 1,
    Position = 2,
    Health = 3,
    FlightMode = 4,
    StatusText = 5,
    Battery = 6,
    MissionProgress = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CommandType {
    CmdUnknown = 0,
    CmdArm = 1,
    CmdDisarm = 2,
    CmdTakeoff = 3,
    CmdLand = 4,
    CmdGotoLocation = 5,
    CmdDoOrbit = 6,
    CmdHold = 7,
    CmdReturnToLaunch = 8,
    CmdFollowMeStart = 9,
    CmdFollowMeStop = 10,
    CmdFollowMeSetTarget = 11,
    CmdMissionUpload = 12,
    CmdMissionStart = 13,
    CmdMissionPause = 14,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ActionResult {
    ResultUnknown = 0,
    ResultSuccess = 1,
    ResultFailure = 2,
    ResultBusy = 3,
    ResultCommandDenied = 4,
    ResultTimeout = 5,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OrbitYawBehavior {
    HoldFrontToCircleCenter = 0,
    HoldInitialHeading = 1,
    Uncontrolled = 2,
    HoldFrontTangentToCircle = 3,
    RcControlled = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FlightMode {
    Unknown = 0,
    Ready = 1,
    Takeoff = 2,
    Hold = 3,
    Mission = 4,
    ReturnToLaunch = 5,
    Land = 6,
    Offboard = 7,
    FollowMe = 8,
    Manual = 9,
    Altctl = 10,
    Posctl = 11,
    Acro = 12,
    Stabilized = 13,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusTextType {
    Debug = 0,
    Info = 1,
    Notice = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
    Alert = 6,
    Emergency = 7,
}

/// Top-level frame payload
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(oneof = "envelope::Payload", tags = "1, 2, 3, 4")]
    pub payload: ::core::option::Option<envelope::Payload>,
}

pub mod envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(message, tag = "1")]
        Open(super::ChannelOpen),
        #[prost(message, tag = "2")]
        Command(super::CommandRequest),
        #[prost(message, tag = "3")]
        Outcome(super::CommandOutcome),
        #[prost(message, tag = "4")]
        Telemetry(super::TelemetryRecord),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelOpen {
    #[prost(enumeration = "Channel", tag = "1")]
    pub channel: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandRequest {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(enumeration = "CommandType", tag = "2")]
    pub cmd_type: i32,
    #[prost(oneof = "command_request::Params", tags = "10, 11, 12, 13")]
    pub params: ::core::option::Option<command_request::Params>,
}

pub mod command_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Params {
        #[prost(message, tag = "10")]
        Goto(super::GotoLocation),
        #[prost(message, tag = "11")]
        Orbit(super::DoOrbit),
        #[prost(message, tag = "12")]
        FollowTarget(super::TargetLocation),
        #[prost(message, tag = "13")]
        Mission(super::MissionPlan),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CommandOutcome {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(enumeration = "ActionResult", tag = "2")]
    pub result: i32,
    #[prost(string, tag = "3")]
    pub result_str: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GotoLocation {
    #[prost(double, tag = "1")]
    pub latitude_deg: f64,
    #[prost(double, tag = "2")]
    pub longitude_deg: f64,
    #[prost(float, tag = "3")]
    pub absolute_altitude_m: f32,
    #[prost(float, tag = "4")]
    pub yaw_deg: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DoOrbit {
    #[prost(float, tag = "1")]
    pub radius_m: f32,
    #[prost(float, tag = "2")]
    pub velocity_ms: f32,
    #[prost(enumeration = "OrbitYawBehavior", tag = "3")]
    pub yaw_behavior: i32,
    #[prost(double, tag = "4")]
    pub latitude_deg: f64,
    #[prost(double, tag = "5")]
    pub longitude_deg: f64,
    #[prost(double, tag = "6")]
    pub absolute_altitude_m: f64,
}

/// Follow-me target; velocities are carried for protocol parity and sent as zero
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TargetLocation {
    #[prost(double, tag = "1")]
    pub latitude_deg: f64,
    #[prost(double, tag = "2")]
    pub longitude_deg: f64,
    #[prost(float, tag = "3")]
    pub absolute_altitude_m: f32,
    #[prost(float, tag = "4")]
    pub velocity_x_m_s: f32,
    #[prost(float, tag = "5")]
    pub velocity_y_m_s: f32,
    #[prost(float, tag = "6")]
    pub velocity_z_m_s: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MissionItem {
    #[prost(double, tag = "1")]
    pub latitude_deg: f64,
    #[prost(double, tag = "2")]
    pub longitude_deg: f64,
    #[prost(float, tag = "3")]
    pub relative_altitude_m: f32,
    #[prost(float, tag = "4")]
    pub speed_m_s: f32,
    #[prost(bool, tag = "5")]
    pub is_fly_through: bool,
    #[prost(float, tag = "6")]
    pub gimbal_pitch_deg: f32,
    #[prost(float, tag = "7")]
    pub gimbal_yaw_deg: f32,
    #[prost(float, tag = "8")]
    pub loiter_time_s: f32,
    #[prost(float, tag = "9")]
    pub acceptance_radius_m: f32,
    #[prost(float, tag = "10")]
    pub yaw_deg: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MissionPlan {
    #[prost(message, repeated, tag = "1")]
    pub mission_items: ::prost::alloc::vec::Vec<MissionItem>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Position {
    #[prost(double, tag = "1")]
    pub latitude_deg: f64,
    #[prost(double, tag = "2")]
    pub longitude_deg: f64,
    #[prost(float, tag = "3")]
    pub absolute_altitude_m: f32,
    #[prost(float, tag = "4")]
    pub relative_altitude_m: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Health {
    #[prost(bool, tag = "1")]
    pub is_gyrometer_calibration_ok: bool,
    #[prost(bool, tag = "2")]
    pub is_accelerometer_calibration_ok: bool,
    #[prost(bool, tag = "3")]
    pub is_magnetometer_calibration_ok: bool,
    #[prost(bool, tag = "4")]
    pub is_local_position_ok: bool,
    #[prost(bool, tag = "5")]
    pub is_global_position_ok: bool,
    #[prost(bool, tag = "6")]
    pub is_home_position_ok: bool,
    #[prost(bool, tag = "7")]
    pub is_armable: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FlightModeUpdate {
    #[prost(enumeration = "FlightMode", tag = "1")]
    pub flight_mode: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StatusText {
    #[prost(enumeration = "StatusTextType", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub text: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Battery {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(float, tag = "2")]
    pub voltage_v: f32,
    #[prost(float, tag = "3")]
    pub remaining_percent: f32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MissionProgress {
    #[prost(int32, tag = "1")]
    pub current: i32,
    #[prost(int32, tag = "2")]
    pub total: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TelemetryRecord {
    #[prost(oneof = "telemetry_record::Record", tags = "1, 2, 3, 4, 5, 6")]
    pub record: ::core::option::Option<telemetry_record::Record>,
}

pub mod telemetry_record {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Record {
        #[prost(message, tag = "1")]
        Position(super::Position),
        #[prost(message, tag = "2")]
        Health(super::Health),
        #[prost(message, tag = "3")]
        FlightMode(super::FlightModeUpdate),
        #[prost(message, tag = "4")]
        StatusText(super::StatusText),
        #[prost(message, tag = "5")]
        Battery(super::Battery),
        #[prost(message, tag = "6")]
        MissionProgress(super::MissionProgress),
    }
}
