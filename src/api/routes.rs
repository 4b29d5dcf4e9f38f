use std::sync::Arc;
use std::time::Duration;

use swarmlink_shared::Channel;
use tracing::debug;

use super::http::{Request, Response};
use crate::coordinator::FollowCoordinator;
use crate::error::FacadeError;
use crate::facade::{params, CommandFacade};
use crate::link::Command;
use crate::oplog::OpLog;

/// Everything a request handler can reach
pub struct ApiState {
    pub facade: Arc<CommandFacade>,
    pub coordinator: Arc<FollowCoordinator>,
    pub oplog: OpLog,
    /// Tick interval for `/follow/start` requests that omit `interval_ms`
    pub follow_interval: Duration,
    /// How long a connection may sit between requests
    pub idle_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn name(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }

    fn allow(self) -> &'static str {
        match self {
            Method::Get => "GET, OPTIONS",
            Method::Post => "POST, OPTIONS",
        }
    }
}

#[derive(Debug, Clone)]
enum Route {
    Simple(Command),
    Goto,
    Orbit,
    Read(Channel),
    FollowMe,
    UploadMission,
    StartMission,
    PauseMission,
    Logs,
    Vehicles,
    Discover,
    FollowStart,
    FollowStop,
    FollowStatus,
}

fn route(path: &str) -> Option<(Method, Route)> {
    use Method::*;

    let route = match path {
        "/arm" => (Get, Route::Simple(Command::Arm)),
        "/disarm" => (Get, Route::Simple(Command::Disarm)),
        "/takeoff" => (Get, Route::Simple(Command::Takeoff)),
        "/land" => (Get, Route::Simple(Command::Land)),
        "/return_to_launch" => (Get, Route::Simple(Command::ReturnToLaunch)),
        "/hold" => (Get, Route::Simple(Command::Hold)),
        "/goto" => (Get, Route::Goto),
        "/do_orbit" => (Get, Route::Orbit),

        "/gps" => (Get, Route::Read(Channel::Position)),
        "/health" => (Get, Route::Read(Channel::Health)),
        "/flight_mode" => (Get, Route::Read(Channel::FlightMode)),
        "/status_text" => (Get, Route::Read(Channel::StatusText)),
        "/battery" => (Get, Route::Read(Channel::Battery)),
        "/mission_progress" => (Get, Route::Read(Channel::MissionProgress)),

        "/follow_me/start" => (Post, Route::Simple(Command::FollowMeStart)),
        "/follow_me/stop" => (Post, Route::Simple(Command::FollowMeStop)),
        "/follow_me" => (Post, Route::FollowMe),

        "/upload_mission" => (Post, Route::UploadMission),
        "/start_mission" => (Get, Route::StartMission),
        "/pause_mission" => (Get, Route::PauseMission),

        "/logs" => (Get, Route::Logs),
        "/vehicles" => (Get, Route::Vehicles),
        "/discover" => (Post, Route::Discover),
        "/follow/start" => (Post, Route::FollowStart),
        "/follow/stop" => (Post, Route::FollowStop),
        "/follow" => (Get, Route::FollowStatus),
        _ => return None,
    };
    Some(route)
}

/// Route one request to the facade or coordinator
pub async fn handle(state: &ApiState, request: &Request) -> Response {
    let path = match request.path.trim_end_matches('/') {
        "" => "/",
        path => path,
    };

    let response = match route(path) {
        None => Response::text(404, "Not found"),
        Some((method, _)) if request.method == "OPTIONS" => {
            Response::no_content().with_allow(method.allow())
        }
        Some((method, _)) if request.method != method.name() => {
            Response::text(405, "Method not allowed").with_allow(method.allow())
        }
        Some((_, route)) => match call(state, request, route).await {
            Ok(response) => response,
            Err(e) => Response::text(e.status_code(), e.to_string()),
        },
    };

    debug!(
        method = %request.method,
        path = %request.path,
        status = response.status,
        "HTTP request handled"
    );
    response
}

async fn call(state: &ApiState, request: &Request, route: Route) -> Result<Response, FacadeError> {
    let facade = &state.facade;
    let target = || params::target(&request.query, facade.default_target());

    match route {
        Route::Simple(command) => {
            facade.dispatch(&target()?, command).await?;
        }
        Route::Goto => {
            let command = params::goto(&request.query)?;
            facade.dispatch(&target()?, command).await?;
        }
        Route::Orbit => {
            let command = params::orbit(&request.query)?;
            facade.dispatch(&target()?, command).await?;
        }
        Route::Read(channel) => {
            let reading = facade.read(&target()?, channel).await?;
            return Ok(Response::json(200, &reading));
        }
        Route::FollowMe => {
            let command = params::follow_target(&request.body)?;
            facade.dispatch(&target()?, command).await?;
        }
        Route::UploadMission => {
            let plan = params::mission_plan(&request.body)?;
            facade.upload_mission(&target()?, plan).await?;
        }
        Route::StartMission => {
            facade.start_mission(&target()?).await?;
        }
        Route::PauseMission => {
            facade.pause_mission(&target()?).await?;
        }
        Route::Logs => return Ok(Response::json(200, &state.oplog.snapshot())),
        Route::Vehicles => return Ok(Response::json(200, &facade.fleet().active().await)),
        Route::Discover => {
            return Ok(Response::json(200, &facade.fleet().rediscover().await));
        }
        Route::FollowStart => {
            let (relation, interval) =
                params::follow_request(&request.body, state.follow_interval)?;
            state.coordinator.start(relation, interval).await?;
        }
        Route::FollowStop => {
            state.coordinator.stop().await;
        }
        Route::FollowStatus => {
            return Ok(Response::json(200, &state.coordinator.status().await));
        }
    }

    Ok(Response::ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::read_request;
    use crate::facade::mission::GateState;
    use crate::link::VehicleLink;
    use crate::registry::Target;
    use crate::testing::{FakeFleet, FakeLink};
    use swarmlink_shared::OrbitYawBehavior;
    use tokio::io::BufReader;

    fn state(links: &[Arc<FakeLink>]) -> ApiState {
        let default = Target::One(links[0].endpoint().clone());
        let facade = Arc::new(CommandFacade::new(FakeFleet::new(links), default));
        ApiState {
            coordinator: Arc::new(FollowCoordinator::new(facade.clone())),
            facade,
            oplog: OpLog::new(10),
            follow_interval: Duration::from_millis(1000),
            idle_timeout: Duration::from_secs(5),
        }
    }

    async fn send(state: &ApiState, method: &str, target: &str, body: &str) -> Response {
        let raw = format!(
            "{} {} HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            method,
            target,
            body.len(),
            body
        );
        let mut reader = BufReader::new(raw.as_bytes());
        let request = read_request(&mut reader).await.unwrap().unwrap();
        handle(state, &request).await
    }

    fn body(response: &Response) -> String {
        String::from_utf8(response.body.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_goto_dispatches_once_to_target() {
        let a = FakeLink::new("127.0.0.1:50000");
        let b = FakeLink::new("127.0.0.1:50001");
        let state = state(&[a.clone(), b.clone()]);

        let response = send(
            &state,
            "GET",
            "/goto?latitude=47.39&longitude=8.54&altitude=500&yaw=90&vehicle=127.0.0.1:50001",
            "",
        )
        .await;

        assert_eq!(response.status, 200);
        assert_eq!(body(&response), "OK");
        assert_eq!(a.call_count(), 0);
        assert_eq!(b.count_of(|c| matches!(c, Command::GotoLocation { .. })), 1);
    }

    #[tokio::test]
    async fn test_do_orbit_forwards_parsed_parameters() {
        let a = FakeLink::new("127.0.0.1:50000");
        let state = state(&[a.clone()]);

        let response = send(
            &state,
            "GET",
            "/do_orbit?radius=20&velocity=3&yaw_behavior=3&latitude=47.39&longitude=8.54&altitude=510",
            "",
        )
        .await;

        assert_eq!(response.status, 200);
        assert_eq!(
            a.calls(),
            vec![Command::DoOrbit {
                radius_m: 20.0,
                velocity_ms: 3.0,
                yaw_behavior: OrbitYawBehavior::HoldFrontTangentToCircle,
                latitude_deg: 47.39,
                longitude_deg: 8.54,
                absolute_altitude_m: 510.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_malformed_parameters_dispatch_nothing() {
        let a = FakeLink::new("127.0.0.1:50000");
        let b = FakeLink::new("127.0.0.1:50001");
        let state = state(&[a.clone(), b.clone()]);

        for target in [
            "/goto?latitude=abc&longitude=8.54&altitude=500&yaw=0&vehicle=all",
            "/goto?latitude=47.39&longitude=8.54&vehicle=all",
            "/do_orbit?radius=20&velocity=3&yaw_behavior=9&latitude=1&longitude=2&altitude=3&vehicle=all",
            "/arm?vehicle=not-an-endpoint",
        ] {
            let response = send(&state, "GET", target, "").await;
            assert_eq!(response.status, 400, "{}", target);
            assert!(body(&response).starts_with("Invalid"), "{}", body(&response));
        }

        assert_eq!(a.call_count() + b.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gps_not_available_until_fix() {
        let a = FakeLink::new("127.0.0.1:50000");
        let state = state(&[a.clone()]);

        let response = send(&state, "GET", "/gps", "").await;
        assert_eq!(response.status, 404);
        assert_eq!(body(&response), "GPS data not available");

        a.set_position(47.39, 8.54);
        let first = send(&state, "GET", "/gps", "").await;
        let second = send(&state, "GET", "/gps", "").await;
        assert_eq!(first.status, 200);
        assert_eq!(first.body, second.body);

        let json: serde_json::Value = serde_json::from_slice(&first.body).unwrap();
        assert_eq!(json["latitude_deg"], 47.39);
        assert_eq!(json["relative_altitude_m"], 12.0);
    }

    #[tokio::test]
    async fn test_mission_scenario() {
        let a = FakeLink::new("127.0.0.1:50000");
        let state = state(&[a.clone()]);

        let empty = send(&state, "POST", "/upload_mission", r#"{"mission_plan":{"mission_items":[]}}"#).await;
        assert_eq!(empty.status, 400);
        assert_eq!(a.call_count(), 0);

        let early = send(&state, "GET", "/start_mission", "").await;
        assert_eq!(early.status, 409);
        assert_eq!(a.call_count(), 0);

        let upload = send(
            &state,
            "POST",
            "/upload_mission",
            r#"{"mission_plan":{"mission_items":[{"latitude_deg":47.39,"longitude_deg":8.54,"relative_altitude_m":15}]}}"#,
        )
        .await;
        assert_eq!(upload.status, 200);
        assert_eq!(a.count_of(|c| matches!(c, Command::MissionUpload(_))), 1);

        tokio::time::timeout(Duration::from_secs(1), async {
            while state.facade.missions().state(a.endpoint()) != Some(GateState::Uploaded) {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap();

        let start = send(&state, "GET", "/start_mission", "").await;
        assert_eq!(start.status, 200);
        assert_eq!(a.count_of(|c| *c == Command::MissionStart), 1);
    }

    #[tokio::test]
    async fn test_follow_me_body() {
        let a = FakeLink::new("127.0.0.1:50000");
        let state = state(&[a.clone()]);

        let bad = send(&state, "POST", "/follow_me", r#"{"latitude_deg":47.39,"longitude_deg":0,"absolute_altitude_m":500}"#).await;
        assert_eq!(bad.status, 400);
        assert_eq!(a.call_count(), 0);

        let good = send(&state, "POST", "/follow_me", r#"{"latitude_deg":47.39,"longitude_deg":8.54,"absolute_altitude_m":500}"#).await;
        assert_eq!(good.status, 200);
        assert_eq!(a.count_of(|c| matches!(c, Command::FollowMeSetTarget { .. })), 1);
    }

    #[tokio::test]
    async fn test_read_all_keyed_by_endpoint() {
        let a = FakeLink::new("127.0.0.1:50000");
        let b = FakeLink::new("127.0.0.1:50001");
        b.set_position(47.39, 8.54);
        let state = state(&[a.clone(), b.clone()]);

        let response = send(&state, "GET", "/gps?vehicle=all", "").await;
        assert_eq!(response.status, 200);
        let json: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert!(json["127.0.0.1:50000"].is_null());
        assert_eq!(json["127.0.0.1:50001"]["longitude_deg"], 8.54);
    }

    #[tokio::test]
    async fn test_routing_errors() {
        let state = state(&[FakeLink::new("127.0.0.1:50000")]);

        assert_eq!(send(&state, "GET", "/nope", "").await.status, 404);
        assert_eq!(send(&state, "POST", "/arm", "").await.status, 405);
        assert_eq!(send(&state, "GET", "/follow_me", "").await.status, 405);
        assert_eq!(send(&state, "OPTIONS", "/upload_mission", "").await.status, 204);
        assert_eq!(send(&state, "GET", "/arm/", "").await.status, 200);
    }

    #[tokio::test]
    async fn test_fleet_and_logs_routes() {
        let state = state(&[FakeLink::new("127.0.0.1:50000"), FakeLink::new("127.0.0.1:50001")]);
        state.oplog.push("1 INFO arm forwarded".into());

        let vehicles = send(&state, "GET", "/vehicles", "").await;
        assert_eq!(body(&vehicles), r#"["127.0.0.1:50000","127.0.0.1:50001"]"#);

        let discovered = send(&state, "POST", "/discover", "").await;
        assert_eq!(discovered.body, vehicles.body);

        let logs = send(&state, "GET", "/logs", "").await;
        assert_eq!(body(&logs), r#"["1 INFO arm forwarded"]"#);
    }

    #[tokio::test]
    async fn test_follow_lifecycle() {
        let leader = FakeLink::new("127.0.0.1:50000");
        let follower = FakeLink::new("127.0.0.1:50001");
        leader.set_position(47.39, 8.54);
        let state = state(&[leader.clone(), follower.clone()]);

        let invalid = send(
            &state,
            "POST",
            "/follow/start",
            r#"{"leader":"127.0.0.1:50000","followers":[]}"#,
        )
        .await;
        assert_eq!(invalid.status, 400);

        let started = send(
            &state,
            "POST",
            "/follow/start",
            r#"{"leader":"127.0.0.1:50000","followers":["127.0.0.1:50001"],"interval_ms":20}"#,
        )
        .await;
        assert_eq!(started.status, 200);

        let status: serde_json::Value =
            serde_json::from_slice(&send(&state, "GET", "/follow", "").await.body).unwrap();
        assert_eq!(status["state"], "running");
        assert_eq!(status["interval_ms"], 20);
        assert_eq!(status["relation"]["leader"], "127.0.0.1:50000");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(send(&state, "POST", "/follow/stop", "").await.status, 200);
        assert!(follower.count_of(|c| matches!(c, Command::FollowMeSetTarget { .. })) >= 1);
        assert_eq!(follower.calls().last(), Some(&Command::FollowMeStop));

        let status: serde_json::Value =
            serde_json::from_slice(&send(&state, "GET", "/follow", "").await.body).unwrap();
        assert_eq!(status["state"], "idle");
    }
}
