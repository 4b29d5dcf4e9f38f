//! Vehicle registry: discovery and target resolution

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, LinkConfig};
use crate::error::ValidationError;
use crate::link::{subscription, VehicleAdapter, VehicleEndpoint, VehicleLink};
use crate::transport::LinkConnector;

/// Which vehicles a request addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    One(VehicleEndpoint),
    All,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::One(endpoint) => write!(f, "{}", endpoint),
            Target::All => f.write_str("all"),
        }
    }
}

impl FromStr for Target {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(Target::All)
        } else {
            s.parse().map(Target::One)
        }
    }
}

/// Resolves targets to live vehicle links
#[async_trait]
pub trait Fleet: Send + Sync {
    /// Links addressed by `target`, ordered by endpoint; empty if none is active
    async fn resolve(&self, target: &Target) -> Vec<Arc<dyn VehicleLink>>;

    /// Endpoints currently answering
    async fn active(&self) -> Vec<VehicleEndpoint>;

    /// Probe the configured candidates again and return the active set
    async fn rediscover(&self) -> Vec<VehicleEndpoint>;
}

/// Tracks which candidate endpoints answer and owns their adapters
pub struct VehicleRegistry<C: LinkConnector> {
    connector: Arc<C>,
    candidates: Vec<VehicleEndpoint>,
    link: LinkConfig,
    discovery: DiscoveryConfig,
    /// Active adapters keyed by endpoint
    adapters: RwLock<BTreeMap<VehicleEndpoint, Arc<VehicleAdapter<C>>>>,
    /// Held for a whole discovery pass so overlapping passes never both
    /// connect the same endpoint
    pass: Mutex<()>,
}

impl<C: LinkConnector> VehicleRegistry<C> {
    pub fn new(
        connector: Arc<C>,
        candidates: Vec<VehicleEndpoint>,
        link: LinkConfig,
        discovery: DiscoveryConfig,
    ) -> Self {
        Self {
            connector,
            candidates,
            link,
            discovery,
            adapters: RwLock::new(BTreeMap::new()),
            pass: Mutex::new(()),
        }
    }

    /// Probe `candidates` concurrently and make the answering set active
    ///
    /// Adapters are built for newly answering endpoints, kept for endpoints
    /// that still answer and dropped for endpoints that stopped answering.
    pub async fn discover(&self, candidates: &[VehicleEndpoint]) -> Vec<VehicleEndpoint> {
        let _pass = self.pass.lock().await;
        let wait = self.discovery.probe_timeout();
        let require_fix = self.discovery.require_fix;

        let probes = candidates.iter().map(|endpoint| async move {
            let answered =
                subscription::probe(endpoint, self.connector.as_ref(), wait, require_fix).await;
            (endpoint, answered)
        });

        let mut answering = Vec::new();
        for (endpoint, answered) in join_all(probes).await {
            if answered {
                answering.push(endpoint.clone());
            } else {
                debug!(vehicle = %endpoint, "DiscoveryMiss: no position within {:?}", wait);
            }
        }

        let known: Vec<VehicleEndpoint> = self.adapters.read().await.keys().cloned().collect();
        let mut fresh = Vec::new();
        for endpoint in answering.iter().filter(|ep| !known.contains(ep)) {
            match VehicleAdapter::connect(endpoint.clone(), self.connector.clone(), self.link.clone())
                .await
            {
                Ok(adapter) => fresh.push((endpoint.clone(), Arc::new(adapter))),
                Err(e) => warn!(vehicle = %endpoint, "{}", e),
            }
        }

        let mut adapters = self.adapters.write().await;
        adapters.retain(|endpoint, _| {
            let keep = answering.contains(endpoint);
            if !keep {
                info!(vehicle = %endpoint, "Vehicle stopped answering");
            }
            keep
        });
        for (endpoint, adapter) in fresh {
            if let Entry::Vacant(slot) = adapters.entry(endpoint) {
                info!(vehicle = %slot.key(), "Vehicle discovered");
                slot.insert(adapter);
            }
        }

        adapters.keys().cloned().collect()
    }

    /// Re-run discovery every `interval` until cancelled
    pub async fn discovery_loop(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        // The startup pass already ran
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let active = self.rediscover().await;
                    debug!("Discovery pass: {} active", active.len());
                }
            }
        }
    }
}

#[async_trait]
impl<C: LinkConnector> Fleet for VehicleRegistry<C> {
    async fn resolve(&self, target: &Target) -> Vec<Arc<dyn VehicleLink>> {
        let adapters = self.adapters.read().await;
        match target {
            Target::One(endpoint) => adapters
                .get(endpoint)
                .map(|adapter| adapter.clone() as Arc<dyn VehicleLink>)
                .into_iter()
                .collect(),
            Target::All => adapters
                .values()
                .map(|adapter| adapter.clone() as Arc<dyn VehicleLink>)
                .collect(),
        }
    }

    async fn active(&self) -> Vec<VehicleEndpoint> {
        self.adapters.read().await.keys().cloned().collect()
    }

    async fn rediscover(&self) -> Vec<VehicleEndpoint> {
        self.discover(&self.candidates).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryConnector;
    use vehicle_sim::{SimConfig, SimVehicle};

    fn sim(without_fix: bool) -> SimVehicle {
        SimVehicle::new(SimConfig {
            without_fix,
            telemetry_interval: Duration::from_millis(10),
            ..Default::default()
        })
    }

    fn endpoints(list: &[&str]) -> Vec<VehicleEndpoint> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn registry(connector: MemoryConnector, candidates: &[&str], require_fix: bool) -> VehicleRegistry<MemoryConnector> {
        VehicleRegistry::new(
            Arc::new(connector),
            endpoints(candidates),
            LinkConfig::default(),
            DiscoveryConfig {
                probe_timeout_ms: 300,
                require_fix,
                interval_ms: 0,
            },
        )
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("all".parse::<Target>(), Ok(Target::All));
        assert_eq!(
            "127.0.0.1:50001".parse::<Target>(),
            Ok(Target::One("127.0.0.1:50001".parse().unwrap()))
        );
        assert!("drone".parse::<Target>().is_err());
        assert_eq!(Target::All.to_string(), "all");
    }

    #[tokio::test]
    async fn test_discover_returns_answering_subset() {
        let connector = MemoryConnector::new()
            .with_vehicle("10.0.0.2:50000", sim(false))
            .with_vehicle("10.0.0.1:50000", sim(false));
        let registry = registry(
            connector,
            &["10.0.0.1:50000", "10.0.0.2:50000", "10.0.0.3:50000"],
            true,
        );

        let active = registry.rediscover().await;
        assert_eq!(active, endpoints(&["10.0.0.1:50000", "10.0.0.2:50000"]));
        assert_eq!(registry.active().await, active);
    }

    #[tokio::test]
    async fn test_require_fix_excludes_vehicle_without_fix() {
        let connector = MemoryConnector::new()
            .with_vehicle("10.0.0.1:50000", sim(false))
            .with_vehicle("10.0.0.2:50000", sim(true));
        let candidates = ["10.0.0.1:50000", "10.0.0.2:50000"];

        let strict = registry(connector, &candidates, true);
        assert_eq!(strict.rediscover().await, endpoints(&["10.0.0.1:50000"]));

        let connector = MemoryConnector::new()
            .with_vehicle("10.0.0.1:50000", sim(false))
            .with_vehicle("10.0.0.2:50000", sim(true));
        let lenient = registry(connector, &candidates, false);
        assert_eq!(lenient.rediscover().await.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve() {
        let connector = MemoryConnector::new()
            .with_vehicle("10.0.0.1:50000", sim(false))
            .with_vehicle("10.0.0.2:50000", sim(false));
        let registry = registry(connector, &["10.0.0.2:50000", "10.0.0.1:50000"], true);
        registry.rediscover().await;

        let all = registry.resolve(&Target::All).await;
        let order: Vec<String> = all.iter().map(|l| l.endpoint().to_string()).collect();
        assert_eq!(order, vec!["10.0.0.1:50000", "10.0.0.2:50000"]);

        let one = registry.resolve(&"10.0.0.2:50000".parse().unwrap()).await;
        assert_eq!(one.len(), 1);

        let missing = registry.resolve(&"10.0.0.9:50000".parse().unwrap()).await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_rediscover_keeps_existing_adapter() {
        let connector = MemoryConnector::new().with_vehicle("10.0.0.1:50000", sim(false));
        let registry = registry(connector, &["10.0.0.1:50000"], true);
        registry.rediscover().await;
        let before = registry.resolve(&Target::All).await;

        registry.rediscover().await;
        let after = registry.resolve(&Target::All).await;
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[tokio::test]
    async fn test_overlapping_passes_connect_once() {
        let config = DiscoveryConfig {
            probe_timeout_ms: 1000,
            require_fix: true,
            interval_ms: 0,
        };
        let slow = || {
            Arc::new(
                MemoryConnector::new()
                    .with_vehicle("10.0.0.1:50000", sim(false))
                    .with_open_delay(Duration::from_millis(20)),
            )
        };

        let connector = slow();
        let sequential = VehicleRegistry::new(
            connector.clone(),
            endpoints(&["10.0.0.1:50000"]),
            LinkConfig::default(),
            config.clone(),
        );
        sequential.rediscover().await;
        sequential.rediscover().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let expected = connector.opened();

        let connector = slow();
        let overlapping = VehicleRegistry::new(
            connector.clone(),
            endpoints(&["10.0.0.1:50000"]),
            LinkConfig::default(),
            config,
        );
        let (first, second) = tokio::join!(overlapping.rediscover(), overlapping.rediscover());
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(first, endpoints(&["10.0.0.1:50000"]));
        assert_eq!(second, first);
        assert_eq!(connector.opened(), expected);
        assert_eq!(overlapping.resolve(&Target::All).await.len(), 1);
    }
}
