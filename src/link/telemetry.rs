//! Telemetry values as the bridge exposes them
//!
//! Converted from the wire records on arrival so readers never deal with raw
//! enum discriminants.

use serde::Serialize;
use swarmlink_shared as wire;

/// Global position of a vehicle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub absolute_altitude_m: f32,
    pub relative_altitude_m: f32,
}

impl VehiclePosition {
    /// A (0, 0) or non-finite reading means no fix yet
    pub fn is_valid(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.latitude_deg != 0.0
            && self.longitude_deg != 0.0
    }
}

impl From<wire::Position> for VehiclePosition {
    fn from(p: wire::Position) -> Self {
        Self {
            latitude_deg: p.latitude_deg,
            longitude_deg: p.longitude_deg,
            absolute_altitude_m: p.absolute_altitude_m,
            relative_altitude_m: p.relative_altitude_m,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Health {
    pub is_gyrometer_calibration_ok: bool,
    pub is_accelerometer_calibration_ok: bool,
    pub is_magnetometer_calibration_ok: bool,
    pub is_local_position_ok: bool,
    pub is_global_position_ok: bool,
    pub is_home_position_ok: bool,
    pub is_armable: bool,
}

impl From<wire::Health> for Health {
    fn from(h: wire::Health) -> Self {
        Self {
            is_gyrometer_calibration_ok: h.is_gyrometer_calibration_ok,
            is_accelerometer_calibration_ok: h.is_accelerometer_calibration_ok,
            is_magnetometer_calibration_ok: h.is_magnetometer_calibration_ok,
            is_local_position_ok: h.is_local_position_ok,
            is_global_position_ok: h.is_global_position_ok,
            is_home_position_ok: h.is_home_position_ok,
            is_armable: h.is_armable,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum FlightMode {
    #[default]
    Unknown,
    Ready,
    Takeoff,
    Hold,
    Mission,
    ReturnToLaunch,
    Land,
    Offboard,
    FollowMe,
    Manual,
    Altctl,
    Posctl,
    Acro,
    Stabilized,
}

impl From<wire::FlightModeUpdate> for FlightMode {
    fn from(update: wire::FlightModeUpdate) -> Self {
        use wire::FlightMode as M;

        match M::try_from(update.flight_mode).unwrap_or(M::Unknown) {
            M::Unknown => Self::Unknown,
            M::Ready => Self::Ready,
            M::Takeoff => Self::Takeoff,
            M::Hold => Self::Hold,
            M::Mission => Self::Mission,
            M::ReturnToLaunch => Self::ReturnToLaunch,
            M::Land => Self::Land,
            M::Offboard => Self::Offboard,
            M::FollowMe => Self::FollowMe,
            M::Manual => Self::Manual,
            M::Altctl => Self::Altctl,
            M::Posctl => Self::Posctl,
            M::Acro => Self::Acro,
            M::Stabilized => Self::Stabilized,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum StatusSeverity {
    Debug,
    #[default]
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusText {
    pub severity: StatusSeverity,
    pub text: String,
}

impl From<wire::StatusText> for StatusText {
    fn from(s: wire::StatusText) -> Self {
        use wire::StatusTextType as T;

        let severity = match T::try_from(s.r#type).unwrap_or(T::Info) {
            T::Debug => StatusSeverity::Debug,
            T::Info => StatusSeverity::Info,
            T::Notice => StatusSeverity::Notice,
            T::Warning => StatusSeverity::Warning,
            T::Error => StatusSeverity::Error,
            T::Critical => StatusSeverity::Critical,
            T::Alert => StatusSeverity::Alert,
            T::Emergency => StatusSeverity::Emergency,
        };

        Self {
            severity,
            text: s.text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Battery {
    pub id: u32,
    pub voltage_v: f32,
    pub remaining_percent: f32,
}

impl From<wire::Battery> for Battery {
    fn from(b: wire::Battery) -> Self {
        Self {
            id: b.id,
            voltage_v: b.voltage_v,
            remaining_percent: b.remaining_percent,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MissionProgress {
    pub current: i32,
    pub total: i32,
}

impl From<wire::MissionProgress> for MissionProgress {
    fn from(p: wire::MissionProgress) -> Self {
        Self {
            current: p.current,
            total: p.total,
        }
    }
}
