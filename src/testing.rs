//! Recording fakes for the link and fleet seams

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swarmlink_shared::{telemetry_record::Record, Position};
use tokio::sync::oneshot;

use crate::error::DispatchError;
use crate::link::{ActionOutcome, ChannelCache, Command, VehicleEndpoint, VehicleLink};
use crate::registry::{Fleet, Target};

/// A link that records every command and answers immediately
pub struct FakeLink {
    endpoint: VehicleEndpoint,
    cache: ChannelCache,
    calls: Mutex<Vec<Command>>,
    failure: Mutex<Option<String>>,
    closed: Mutex<bool>,
    link_id: AtomicU64,
}

impl FakeLink {
    pub fn new(endpoint: &str) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.parse().expect("test endpoint"),
            cache: ChannelCache::new(),
            calls: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            closed: Mutex::new(false),
            link_id: AtomicU64::new(1),
        })
    }

    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn count_of(&self, pred: impl Fn(&Command) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Answer every later command with a failure
    pub fn fail_with(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Refuse every later command as if the command channel dropped
    pub fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    /// Behave like a fresh connection to the same endpoint
    pub fn reconnect(&self) {
        self.link_id.fetch_add(1, Ordering::SeqCst);
    }

    pub fn set_position(&self, latitude_deg: f64, longitude_deg: f64) {
        self.cache.apply(Record::Position(Position {
            latitude_deg,
            longitude_deg,
            absolute_altitude_m: 500.0,
            relative_altitude_m: 12.0,
        }));
    }

    pub fn apply(&self, record: Record) {
        self.cache.apply(record);
    }
}

impl VehicleLink for FakeLink {
    fn endpoint(&self) -> &VehicleEndpoint {
        &self.endpoint
    }

    fn link_id(&self) -> u64 {
        self.link_id.load(Ordering::SeqCst)
    }

    fn execute(&self, command: Command) -> Result<oneshot::Receiver<ActionOutcome>, DispatchError> {
        if *self.closed.lock().unwrap() {
            return Err(DispatchError::ChannelClosed {
                endpoint: self.endpoint.clone(),
            });
        }

        self.calls.lock().unwrap().push(command);

        let (tx, rx) = oneshot::channel();
        let outcome = match self.failure.lock().unwrap().clone() {
            Some(reason) => ActionOutcome::failure(reason),
            None => ActionOutcome::success(),
        };
        let _ = tx.send(outcome);
        Ok(rx)
    }

    fn cache(&self) -> &ChannelCache {
        &self.cache
    }
}

/// A fixed set of links
pub struct FakeFleet {
    links: Vec<Arc<FakeLink>>,
}

impl FakeFleet {
    pub fn new(links: &[Arc<FakeLink>]) -> Arc<Self> {
        let mut links = links.to_vec();
        links.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        Arc::new(Self { links })
    }
}

#[async_trait]
impl Fleet for FakeFleet {
    async fn resolve(&self, target: &Target) -> Vec<Arc<dyn VehicleLink>> {
        self.links
            .iter()
            .filter(|link| match target {
                Target::One(endpoint) => &link.endpoint == endpoint,
                Target::All => true,
            })
            .map(|link| link.clone() as Arc<dyn VehicleLink>)
            .collect()
    }

    async fn active(&self) -> Vec<VehicleEndpoint> {
        self.links.iter().map(|l| l.endpoint.clone()).collect()
    }

    async fn rediscover(&self) -> Vec<VehicleEndpoint> {
        self.active().await
    }
}
