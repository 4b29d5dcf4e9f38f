//! Leader-follower coordination
//!
//! While a run is active, every tick reads the leader's cached position and
//! sends it to each follower as a follow target. Idle → Running → Idle.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FacadeError, ValidationError};
use crate::facade::CommandFacade;
use crate::link::{Command, VehicleEndpoint};
use crate::registry::Target;

/// A leader and the vehicles that follow it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowRelation {
    leader: VehicleEndpoint,
    followers: Vec<VehicleEndpoint>,
}

impl FollowRelation {
    /// Followers are deduplicated; the set must be non-empty and exclude the leader
    pub fn new(
        leader: VehicleEndpoint,
        mut followers: Vec<VehicleEndpoint>,
    ) -> Result<Self, ValidationError> {
        followers.sort();
        followers.dedup();

        if followers.is_empty() {
            return Err(ValidationError::InvalidRelation("no followers".into()));
        }
        if followers.contains(&leader) {
            return Err(ValidationError::InvalidRelation(format!(
                "{} cannot follow itself",
                leader
            )));
        }

        Ok(Self { leader, followers })
    }

    pub fn leader(&self) -> &VehicleEndpoint {
        &self.leader
    }

    pub fn followers(&self) -> &[VehicleEndpoint] {
        &self.followers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FollowStatus {
    Idle,
    Running {
        relation: FollowRelation,
        interval_ms: u64,
    },
}

struct FollowRun {
    relation: FollowRelation,
    interval: Duration,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FollowRun {
    /// Stop ticking and wait until the tick task has exited
    async fn halt(self) -> FollowRelation {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!("Follow task ended abnormally: {}", e);
        }
        self.relation
    }
}

/// Runs at most one leader-follower relation at a time
pub struct FollowCoordinator {
    facade: Arc<CommandFacade>,
    run: Mutex<Option<FollowRun>>,
}

impl FollowCoordinator {
    pub fn new(facade: Arc<CommandFacade>) -> Self {
        Self {
            facade,
            run: Mutex::new(None),
        }
    }

    /// Start relaying the leader's position, replacing any active run
    ///
    /// The first tick happens immediately.
    pub async fn start(&self, relation: FollowRelation, interval: Duration) -> Result<(), FacadeError> {
        if interval.is_zero() {
            return Err(FacadeError::Coordinator("follow interval must be positive".into()));
        }

        let mut run = self.run.lock().await;
        if let Some(previous) = run.take() {
            let previous = previous.halt().await;
            info!(leader = %previous.leader, "Replacing active follow run");
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(follow_loop(
            self.facade.clone(),
            relation.clone(),
            interval,
            cancel.clone(),
        ));

        info!(
            leader = %relation.leader,
            followers = relation.followers.len(),
            "Follow run started every {:?}",
            interval
        );
        *run = Some(FollowRun {
            relation,
            interval,
            cancel,
            handle,
        });
        Ok(())
    }

    /// Stop the active run and tell each follower to stop following
    ///
    /// No tick runs after this returns. Returns false if nothing was running.
    pub async fn stop(&self) -> bool {
        let Some(active) = self.run.lock().await.take() else {
            return false;
        };

        let relation = active.halt().await;
        for follower in &relation.followers {
            let target = Target::One(follower.clone());
            if let Err(e) = self.facade.dispatch(&target, Command::FollowMeStop).await {
                warn!(vehicle = %follower, "Follow stop not sent: {}", e);
            }
        }

        info!(leader = %relation.leader, "Follow run stopped");
        true
    }

    pub async fn status(&self) -> FollowStatus {
        match self.run.lock().await.as_ref() {
            Some(run) => FollowStatus::Running {
                relation: run.relation.clone(),
                interval_ms: run.interval.as_millis() as u64,
            },
            None => FollowStatus::Idle,
        }
    }
}

async fn follow_loop(
    facade: Arc<CommandFacade>,
    relation: FollowRelation,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => tick(&facade, &relation).await,
        }
    }
}

/// Relay the leader's position once; a no-op without a valid fix
async fn tick(facade: &CommandFacade, relation: &FollowRelation) {
    let Some(position) = facade.position(&relation.leader).await else {
        debug!(leader = %relation.leader, "Leader has no fix, skipping tick");
        return;
    };

    for follower in &relation.followers {
        let target = Target::One(follower.clone());

        if let Err(e) = facade.dispatch(&target, Command::FollowMeStart).await {
            debug!(vehicle = %follower, "Follower skipped: {}", e);
            continue;
        }

        let follow = Command::FollowMeSetTarget {
            latitude_deg: position.latitude_deg,
            longitude_deg: position.longitude_deg,
            absolute_altitude_m: position.absolute_altitude_m,
        };
        if let Err(e) = facade.dispatch(&target, follow).await {
            debug!(vehicle = %follower, "Follow target not sent: {}", e);
        }
    }
}
