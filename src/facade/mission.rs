//! Per-endpoint mission upload state

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::link::VehicleEndpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Upload in flight; the number identifies it
    Uploading(u64),
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct GateEntry {
    /// `VehicleLink::link_id` of the connection the upload went to
    link_id: u64,
    state: GateState,
}

#[derive(Debug, Default)]
struct GateInner {
    generation: u64,
    entries: HashMap<VehicleEndpoint, GateEntry>,
}

/// Tracks which endpoints hold a successfully uploaded mission
///
/// Kept apart from anything the vehicle reports, so an upload to one vehicle
/// never authorizes a start on another. Each entry belongs to one connection:
/// once the registry drops or replaces the endpoint's link, the entry no
/// longer counts.
#[derive(Debug, Clone, Default)]
pub struct MissionGate {
    inner: Arc<Mutex<GateInner>>,
}

impl MissionGate {
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark a new upload over link `link_id` and return its generation
    pub fn begin(&self, endpoint: &VehicleEndpoint, link_id: u64) -> u64 {
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        inner.entries.insert(
            endpoint.clone(),
            GateEntry {
                link_id,
                state: GateState::Uploading(generation),
            },
        );
        generation
    }

    /// Record the outcome of upload `generation`
    ///
    /// Returns false if a newer upload superseded it and the outcome was ignored.
    pub fn finish(&self, endpoint: &VehicleEndpoint, generation: u64, uploaded: bool) -> bool {
        let mut inner = self.lock();
        match inner.entries.get_mut(endpoint) {
            Some(GateEntry { state, .. }) if *state == GateState::Uploading(generation) => {
                *state = if uploaded {
                    GateState::Uploaded
                } else {
                    GateState::Failed
                };
                true
            }
            _ => false,
        }
    }

    pub fn state(&self, endpoint: &VehicleEndpoint) -> Option<GateState> {
        self.lock().entries.get(endpoint).map(|entry| entry.state)
    }

    /// Whether link `link_id` holds an uploaded mission
    ///
    /// An entry left by an earlier link to the same endpoint is discarded.
    pub fn is_uploaded(&self, endpoint: &VehicleEndpoint, link_id: u64) -> bool {
        let mut inner = self.lock();
        match inner.entries.get(endpoint) {
            Some(entry) if entry.link_id != link_id => {
                inner.entries.remove(endpoint);
                false
            }
            Some(entry) => entry.state == GateState::Uploaded,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ep(s: &str) -> VehicleEndpoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_upload_lifecycle() {
        let gate = MissionGate::default();
        let a = ep("10.0.0.1:50000");
        assert_eq!(gate.state(&a), None);

        let generation = gate.begin(&a, 1);
        assert!(!gate.is_uploaded(&a, 1));
        assert!(gate.finish(&a, generation, true));
        assert!(gate.is_uploaded(&a, 1));
    }

    #[test]
    fn test_upload_belongs_to_its_link() {
        let gate = MissionGate::default();
        let a = ep("10.0.0.1:50000");

        let generation = gate.begin(&a, 1);
        gate.finish(&a, generation, true);

        // Same endpoint, new connection after rediscovery
        assert!(!gate.is_uploaded(&a, 2));
        assert_eq!(gate.state(&a), None);
        assert!(!gate.is_uploaded(&a, 1));
    }

    #[test]
    fn test_stale_outcome_ignored() {
        let gate = MissionGate::default();
        let a = ep("10.0.0.1:50000");

        let first = gate.begin(&a, 1);
        let second = gate.begin(&a, 1);
        assert!(!gate.finish(&a, first, true), "stale success must not apply");
        assert_eq!(gate.state(&a), Some(GateState::Uploading(second)));

        assert!(gate.finish(&a, second, false));
        assert_eq!(gate.state(&a), Some(GateState::Failed));
    }

    #[test]
    fn test_endpoints_are_independent() {
        let gate = MissionGate::default();
        let a = ep("10.0.0.1:50000");
        let b = ep("10.0.0.2:50000");

        let generation = gate.begin(&a, 1);
        gate.finish(&a, generation, true);
        assert!(gate.is_uploaded(&a, 1));
        assert!(!gate.is_uploaded(&b, 1));
    }
}
