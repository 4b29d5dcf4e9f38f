//! Per-stream session handling
//!
//! The first frame names the channel. A command session answers requests in
//! arrival order; a telemetry session streams records until the peer goes away.

use anyhow::{anyhow, Result};
use swarmlink_shared::{
    codec::{FrameReader, FrameWriter},
    envelope::Payload,
    telemetry_record::Record,
    Battery, Channel, Envelope, FlightMode, FlightModeUpdate, Health, MissionProgress,
    StatusText, StatusTextType,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::interval;
use tracing::{debug, info};

use crate::SimVehicle;

pub(crate) async fn serve<S>(sim: &SimVehicle, stream: S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (reader, writer) = tokio::io::split(stream);
    let mut reader = FrameReader::new(reader);
    let mut writer = FrameWriter::new(writer);

    let channel = match reader.recv().await? {
        Some(Envelope {
            payload: Some(Payload::Open(open)),
        }) => Channel::try_from(open.channel).unwrap_or(Channel::Unknown),
        Some(_) => return Err(anyhow!("expected channel open frame")),
        None => return Ok(()),
    };

    debug!(?channel, "Stream opened");

    match channel {
        Channel::Command => command_session(sim, &mut reader, &mut writer).await,
        Channel::Unknown => Err(anyhow!("unknown channel requested")),
        channel => telemetry_session(sim, channel, &mut writer).await,
    }
}

async fn command_session<R, W>(
    sim: &SimVehicle,
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = reader.recv().await? {
        match envelope.payload {
            Some(Payload::Command(request)) => {
                let outcome = sim.handle_command(&request);
                info!(
                    request_id = request.request_id,
                    result = outcome.result,
                    "Command handled: {}",
                    outcome.result_str
                );
                writer.send(&Envelope::outcome(outcome)).await?;
            }
            other => debug!("Ignoring non-command frame: {:?}", other),
        }
    }

    debug!("Command stream closed by peer");
    Ok(())
}

async fn telemetry_session<W>(
    sim: &SimVehicle,
    channel: Channel,
    writer: &mut FrameWriter<W>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = interval(sim.config().telemetry_interval);

    loop {
        ticker.tick().await;

        if sim.is_closed(channel) {
            debug!(?channel, "Ending stream on request");
            return Ok(());
        }

        let Some(record) = snapshot(sim, channel) else {
            return Err(anyhow!("channel {:?} carries no telemetry", channel));
        };

        if writer.send(&Envelope::telemetry(record)).await.is_err() {
            debug!(?channel, "Telemetry peer went away");
            return Ok(());
        }
    }
}

/// Current record for a telemetry channel
fn snapshot(sim: &SimVehicle, channel: Channel) -> Option<Record> {
    let mut state = sim.lock();

    let record = match channel {
        Channel::Position => Record::Position(state.position.clone()),
        Channel::Health => {
            let has_fix = state.position.latitude_deg != 0.0 && state.position.longitude_deg != 0.0;
            Record::Health(Health {
                is_gyrometer_calibration_ok: true,
                is_accelerometer_calibration_ok: true,
                is_magnetometer_calibration_ok: true,
                is_local_position_ok: true,
                is_global_position_ok: has_fix,
                is_home_position_ok: has_fix,
                is_armable: has_fix,
            })
        }
        Channel::FlightMode => Record::FlightMode(FlightModeUpdate {
            flight_mode: state.flight_mode.into(),
        }),
        Channel::StatusText => Record::StatusText(StatusText {
            r#type: StatusTextType::Info.into(),
            text: state.status_text.clone(),
        }),
        Channel::Battery => {
            if state.armed {
                state.battery_percent = (state.battery_percent - 0.05).max(0.0);
            }
            Record::Battery(Battery {
                id: 0,
                voltage_v: 12.6 * (0.8 + 0.2 * state.battery_percent / 100.0),
                remaining_percent: state.battery_percent,
            })
        }
        Channel::MissionProgress => {
            let total = state.mission.len() as i32;
            if state.flight_mode == FlightMode::Mission && state.mission_current < total {
                state.mission_current += 1;
            }
            Record::MissionProgress(MissionProgress {
                current: state.mission_current,
                total,
            })
        }
        Channel::Command | Channel::Unknown => return None,
    };

    Some(record)
}
