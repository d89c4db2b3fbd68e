//! Fleet Registry
//!
//! In-memory record of every managed extension instance, keyed by instance id.
//!
//! All mutations take the write half of a single `RwLock`, so each operation
//! is atomic with respect to readers. Reads clone records out and never hand
//! out references into the map.
//!
//! Records only ever hold `Online` or `Stale`. A removed instance has no
//! record; its id is remembered in `departed` so [`FleetRegistry::stats`] can
//! report it as offline until it registers again. That memory is bounded; the
//! oldest departures are forgotten first.
//!
//! Instance ids are opaque keys. They are stored and matched exactly as the
//! agent sends them.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::models::{FleetStats, InstanceStatus, ManagedInstance, RegisterInstanceRequest};
use super::clock::{Clock, SystemClock};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("instanceId must not be empty")]
    EmptyInstanceId,
}

impl From<RegistryError> for crate::AppError {
    fn from(err: RegistryError) -> Self {
        crate::AppError::ValidationError(err.to_string())
    }
}

// ============================================================================
// STATE
// ============================================================================

pub const DEFAULT_OFFLINE_CAPACITY: usize = 10_000;

/// Removed ids, oldest first, capped at `capacity`
struct DepartedIds {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl DepartedIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            ids: HashSet::new(),
        }
    }

    fn insert(&mut self, instance_id: String) {
        if self.capacity == 0 || self.ids.contains(&instance_id) {
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.ids.insert(instance_id.clone());
        self.order.push_back(instance_id);
    }

    fn remove(&mut self, instance_id: &str) {
        if self.ids.remove(instance_id) {
            self.order.retain(|id| id != instance_id);
        }
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

struct RegistryState {
    /// Id order gives `get_all` a stable iteration order
    instances: BTreeMap<String, ManagedInstance>,
    departed: DepartedIds,
}

pub struct FleetRegistry {
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                instances: BTreeMap::new(),
                departed: DepartedIds::new(DEFAULT_OFFLINE_CAPACITY),
            }),
            clock,
        }
    }

    /// Cap how many removed ids are remembered for the offline count.
    /// Zero disables the offline count entirely.
    pub fn with_offline_capacity(mut self, capacity: usize) -> Self {
        self.state.get_mut().departed = DepartedIds::new(capacity);
        self
    }

    /// Current time as seen by this registry
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Create or refresh an instance record.
    ///
    /// Re-registration updates the descriptive fields, forces `Online`, and
    /// keeps the original `registered_at`.
    pub fn register(&self, req: RegisterInstanceRequest) -> Result<ManagedInstance, RegistryError> {
        if req.instance_id.trim().is_empty() {
            return Err(RegistryError::EmptyInstanceId);
        }
        let instance_id = req.instance_id.as_str();

        let now = self.clock.now();
        let mut state = self.state.write();
        state.departed.remove(instance_id);

        let record = match state.instances.get_mut(instance_id) {
            Some(existing) => {
                existing.hostname = req.hostname;
                existing.browser = req.browser;
                existing.version = req.version;
                existing.last_seen = now;
                existing.status = InstanceStatus::Online;
                tracing::debug!("Instance re-registered: {} ({})", existing.hostname, instance_id);
                existing.clone()
            }
            None => {
                let record = ManagedInstance {
                    instance_id: req.instance_id.clone(),
                    hostname: req.hostname,
                    browser: req.browser,
                    version: req.version,
                    status: InstanceStatus::Online,
                    last_seen: now,
                    registered_at: now,
                };
                state.instances.insert(record.instance_id.clone(), record.clone());
                tracing::info!("Instance registered: {} ({})", record.hostname, instance_id);
                record
            }
        };

        Ok(record)
    }

    /// Refresh `last_seen` and restore `Online`. Unknown ids are ignored.
    pub fn heartbeat(&self, instance_id: &str) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write();

        match state.instances.get_mut(instance_id) {
            Some(record) => {
                if record.status == InstanceStatus::Stale {
                    tracing::info!("Instance {} back online", instance_id);
                }
                record.last_seen = now;
                record.status = InstanceStatus::Online;
                true
            }
            None => {
                tracing::debug!("Heartbeat from unknown instance {} ignored", instance_id);
                false
            }
        }
    }

    /// Mark an instance stale without touching `last_seen`. Unknown ids are ignored.
    pub fn mark_stale(&self, instance_id: &str) -> bool {
        let mut state = self.state.write();
        match state.instances.get_mut(instance_id) {
            Some(record) => {
                record.status = InstanceStatus::Stale;
                true
            }
            None => false,
        }
    }

    /// Mark stale only if the instance is still online and has been silent for
    /// longer than `threshold`. The check and the update happen under one lock.
    pub fn mark_stale_if_idle(&self, instance_id: &str, threshold: Duration) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write();

        match state.instances.get_mut(instance_id) {
            Some(record) if record.is_online() && idle_longer_than(record.last_seen, now, threshold) => {
                record.status = InstanceStatus::Stale;
                true
            }
            _ => false,
        }
    }

    /// Delete a record. Unknown ids are ignored.
    pub fn remove(&self, instance_id: &str) -> bool {
        let mut state = self.state.write();
        match state.instances.remove(instance_id) {
            Some(record) => {
                state.departed.insert(record.instance_id);
                tracing::info!("Instance removed: {}", instance_id);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn get_instance(&self, instance_id: &str) -> Option<ManagedInstance> {
        self.state.read().instances.get(instance_id).cloned()
    }

    /// All records, ordered by instance id
    pub fn get_all(&self) -> Vec<ManagedInstance> {
        self.state.read().instances.values().cloned().collect()
    }

    pub fn get_online_count(&self) -> usize {
        self.state.read().instances.values().filter(|r| r.is_online()).count()
    }

    pub fn get_total_count(&self) -> usize {
        self.state.read().instances.len()
    }

    /// Online/stale/offline counts from one consistent view
    pub fn stats(&self) -> FleetStats {
        let state = self.state.read();
        let online = state.instances.values().filter(|r| r.is_online()).count();
        let total = state.instances.len();

        FleetStats {
            total,
            online,
            stale: total - online,
            offline: state.departed.len(),
        }
    }
}

fn idle_longer_than(last_seen: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    // to_std fails when last_seen is in the future; treat that as fresh
    (now - last_seen)
        .to_std()
        .map(|idle| idle > threshold)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::clock::ManualClock;

    fn req(id: &str, hostname: &str) -> RegisterInstanceRequest {
        RegisterInstanceRequest {
            instance_id: id.to_string(),
            hostname: hostname.to_string(),
            browser: "chrome".to_string(),
            version: "1.4.0".to_string(),
        }
    }

    fn registry_at(start: i64) -> (FleetRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(start, 0).unwrap()));
        (FleetRegistry::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_register_creates_online_record() {
        let (registry, clock) = registry_at(1_000);
        let record = registry.register(req("ext-1", "laptop-a")).unwrap();

        assert_eq!(record.status, InstanceStatus::Online);
        assert_eq!(record.last_seen, clock.now());
        assert_eq!(record.registered_at, clock.now());
        assert_eq!(registry.get_instance("ext-1"), Some(record));
        assert_eq!(registry.get_total_count(), 1);
    }

    #[test]
    fn test_register_rejects_empty_id() {
        let (registry, _) = registry_at(1_000);
        assert_eq!(registry.register(req("", "h")), Err(RegistryError::EmptyInstanceId));
        assert_eq!(registry.register(req("   ", "h")), Err(RegistryError::EmptyInstanceId));
        assert_eq!(registry.get_total_count(), 0);
    }

    #[test]
    fn test_reregister_preserves_registered_at() {
        let (registry, clock) = registry_at(1_000);
        let first = registry.register(req("ext-1", "laptop-a")).unwrap();

        clock.advance(chrono::Duration::seconds(120));
        registry.mark_stale("ext-1");

        let mut update = req("ext-1", "laptop-b");
        update.version = "1.5.0".to_string();
        let second = registry.register(update).unwrap();

        assert_eq!(second.hostname, "laptop-b");
        assert_eq!(second.version, "1.5.0");
        assert_eq!(second.status, InstanceStatus::Online);
        assert_eq!(second.registered_at, first.registered_at);
        assert_eq!(second.last_seen, clock.now());
        assert_eq!(registry.get_total_count(), 1);
    }

    #[test]
    fn test_heartbeat_unknown_is_noop() {
        let (registry, _) = registry_at(1_000);
        registry.register(req("ext-1", "a")).unwrap();

        assert!(!registry.heartbeat("ghost"));
        assert_eq!(registry.get_instance("ghost"), None);
        assert_eq!(registry.get_total_count(), 1);
    }

    #[test]
    fn test_stale_then_heartbeat_restores_online() {
        let (registry, clock) = registry_at(1_000);
        registry.register(req("ext-1", "a")).unwrap();
        let registered = clock.now();

        clock.advance(chrono::Duration::seconds(30));
        assert!(registry.mark_stale("ext-1"));
        let stale = registry.get_instance("ext-1").unwrap();
        assert_eq!(stale.status, InstanceStatus::Stale);
        assert_eq!(stale.last_seen, registered);

        assert!(registry.heartbeat("ext-1"));
        let back = registry.get_instance("ext-1").unwrap();
        assert_eq!(back.status, InstanceStatus::Online);
        assert_eq!(back.last_seen, clock.now());
    }

    #[test]
    fn test_mark_stale_unknown_is_noop() {
        let (registry, _) = registry_at(1_000);
        assert!(!registry.mark_stale("ghost"));
        assert_eq!(registry.get_total_count(), 0);
    }

    #[test]
    fn test_mark_stale_if_idle() {
        let (registry, clock) = registry_at(1_000);
        registry.register(req("ext-1", "a")).unwrap();
        let threshold = Duration::from_secs(60);

        clock.advance(chrono::Duration::seconds(60));
        assert!(!registry.mark_stale_if_idle("ext-1", threshold));

        clock.advance(chrono::Duration::seconds(1));
        assert!(registry.mark_stale_if_idle("ext-1", threshold));
        // already stale
        assert!(!registry.mark_stale_if_idle("ext-1", threshold));
        assert!(!registry.mark_stale_if_idle("ghost", threshold));
    }

    #[test]
    fn test_remove() {
        let (registry, _) = registry_at(1_000);
        registry.register(req("ext-1", "a")).unwrap();
        registry.register(req("ext-2", "b")).unwrap();

        assert!(registry.remove("ext-1"));
        assert_eq!(registry.get_instance("ext-1"), None);
        assert_eq!(registry.get_total_count(), 1);

        assert!(!registry.remove("ext-1"));
        assert_eq!(registry.get_total_count(), 1);
    }

    #[test]
    fn test_get_all_ordered_by_id() {
        let (registry, _) = registry_at(1_000);
        for id in ["ext-c", "ext-a", "ext-b"] {
            registry.register(req(id, id)).unwrap();
        }
        let ids: Vec<_> = registry.get_all().into_iter().map(|r| r.instance_id).collect();
        assert_eq!(ids, vec!["ext-a", "ext-b", "ext-c"]);
    }

    #[test]
    fn test_counts_and_stats() {
        let (registry, _) = registry_at(1_000);
        for id in ["a", "b", "c", "d"] {
            registry.register(req(id, id)).unwrap();
        }
        registry.mark_stale("b");
        registry.remove("d");

        assert_eq!(registry.get_online_count(), 2);
        assert_eq!(registry.get_total_count(), 3);
        assert_eq!(
            registry.stats(),
            FleetStats { total: 3, online: 2, stale: 1, offline: 1 }
        );

        // coming back clears the offline mark
        registry.register(req("d", "d")).unwrap();
        assert_eq!(registry.stats().offline, 0);
        assert_eq!(registry.stats().online, 3);
    }

    #[test]
    fn test_instance_id_kept_verbatim() {
        let (registry, _) = registry_at(1_000);
        registry.register(req("ext-1", "a")).unwrap();
        let padded = registry.register(req("ext-1 ", "b")).unwrap();

        assert_eq!(padded.instance_id, "ext-1 ");
        assert_eq!(registry.get_total_count(), 2);
        assert_eq!(registry.get_instance("ext-1").unwrap().hostname, "a");

        registry.register(req(" ext-2 ", "c")).unwrap();
        assert!(registry.heartbeat(" ext-2 "));
        assert!(registry.mark_stale(" ext-2 "));
        assert!(!registry.heartbeat("ext-2"));
        assert!(registry.remove(" ext-2 "));
        assert_eq!(registry.get_instance(" ext-2 "), None);
    }

    #[test]
    fn test_offline_memory_is_bounded() {
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(1_000, 0).unwrap()));
        let registry = FleetRegistry::with_clock(clock).with_offline_capacity(3);

        for i in 0..5 {
            let id = format!("ext-{}", i);
            registry.register(req(&id, "h")).unwrap();
            registry.remove(&id);
        }
        assert_eq!(registry.stats().offline, 3);

        // ext-0 and ext-1 were forgotten; re-registering ext-3 frees a slot
        registry.register(req("ext-3", "h")).unwrap();
        assert_eq!(registry.stats().offline, 2);

        registry.register(req("ext-5", "h")).unwrap();
        registry.remove("ext-5");
        registry.register(req("ext-6", "h")).unwrap();
        registry.remove("ext-6");
        assert_eq!(registry.stats().offline, 3);

        // ext-2 was the oldest left, so it went first
        registry.register(req("ext-2", "h")).unwrap();
        assert_eq!(registry.stats().offline, 3);
    }

    #[test]
    fn test_zero_offline_capacity() {
        let registry = FleetRegistry::new().with_offline_capacity(0);
        registry.register(req("ext-1", "h")).unwrap();
        assert!(registry.remove("ext-1"));
        assert_eq!(registry.stats().offline, 0);
    }

    #[test]
    fn test_records_never_hold_other_states() {
        let (registry, clock) = registry_at(1_000);
        let ops = ["reg", "hb", "stale", "rm", "reg", "stale", "hb", "stale"];

        for (i, op) in ops.iter().cycle().take(64).enumerate() {
            let id = format!("ext-{}", i % 5);
            clock.advance(chrono::Duration::seconds(7));
            match *op {
                "reg" => {
                    registry.register(req(&id, "h")).unwrap();
                }
                "hb" => {
                    registry.heartbeat(&id);
                }
                "stale" => {
                    registry.mark_stale(&id);
                }
                _ => {
                    registry.remove(&id);
                }
            }

            for record in registry.get_all() {
                assert!(matches!(record.status, InstanceStatus::Online | InstanceStatus::Stale));
                assert!(record.registered_at <= record.last_seen);
            }
            let stats = registry.stats();
            assert_eq!(stats.online + stats.stale, stats.total);
        }
    }

    #[test]
    fn test_concurrent_registration_and_heartbeats() {
        let registry = Arc::new(FleetRegistry::new());
        let threads = 8;
        let per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let id = format!("ext-{}-{}", t, i);
                        registry.register(req(&id, "host")).unwrap();
                        assert!(registry.heartbeat(&id));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let all = registry.get_all();
        assert_eq!(all.len(), threads * per_thread);
        let unique: HashSet<_> = all.iter().map(|r| r.instance_id.clone()).collect();
        assert_eq!(unique.len(), threads * per_thread);
        assert_eq!(registry.get_online_count(), threads * per_thread);
    }
}
