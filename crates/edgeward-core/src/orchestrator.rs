//! Offloading orchestration
//!
//! Binds devices to their nearest edge node, asks the fuzzy engine where a
//! task should run, applies the override policies and routes the task:
//!
//! ```text
//! Task
//!   │
//!   ├── 1. No bound node / bound node down ──► CLOUD
//!   │
//!   ├── 2. Fuzzy engine (cpu, net, delay, util, tier)
//!   │
//!   ├── 3. Overrides: battery ► bandwidth ► security
//!   │
//!   ├── 4. Energy check (off-node only)
//!   │
//!   └── 5. Route: bound node │ least-loaded peer (handshake) │ cloud
//! ```
//!
//! Failures never escape as panics. They surface as counters, task status,
//! or an error that hands the task back to the caller.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::backend::{ComputeBackend, EdgeNodeView, TaskReport};
use crate::checkpoint::{CheckpointStore, NoCheckpoints};
use crate::device::{Device, NodeLocation};
use crate::discovery::{
    CLOUD_COMPUTE_SERVICE, EDGE_COMPUTE_SERVICE, InMemoryServiceRegistry, ServiceRecord,
    ServiceRegistry,
};
use crate::energy::{EnergyModel, LinearEnergyModel};
use crate::error::{CoreError, Result};
use crate::fuzzy::FuzzyDecisionEngine;
use crate::link::{DistanceLinkModel, LinkModel};
use crate::migration::{AlwaysAccept, MigrationProtocol};
use crate::node::{CloudNodeSpec, EdgeNodeSpec};
use crate::stats::{StatisticsAggregator, SystemStatistics};
use crate::types::{ExecutionLocation, NodeId, SecurityLevel, Task, TaskStatus};

/// Below this battery level a device stops executing on its own edge node
pub const LOW_BATTERY_THRESHOLD: f64 = 0.2;

/// Minimum device-to-node bandwidth for a peer migration (kbps)
pub const MIN_MIGRATION_BANDWIDTH_KBPS: f64 = 1000.0;

/// Where a task was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub node: NodeId,
    pub location: ExecutionLocation,
}

/// Result of taking an edge node down
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailoverReport {
    /// Queued tasks moved elsewhere from a checkpoint
    pub recovered: usize,
    /// Queued tasks lost with the node
    pub failed: usize,
}

/// The offloading orchestrator
pub struct OffloadingOrchestrator<B: ComputeBackend> {
    backend: B,
    engine: FuzzyDecisionEngine,
    link: Box<dyn LinkModel>,
    energy: Box<dyn EnergyModel>,
    migration: Box<dyn MigrationProtocol>,
    checkpoints: Box<dyn CheckpointStore>,
    registry: Box<dyn ServiceRegistry>,
    bindings: HashMap<String, NodeId>,
    stats: StatisticsAggregator,
}

impl<B: ComputeBackend> OffloadingOrchestrator<B> {
    /// Create an orchestrator with the default collaborators
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            engine: FuzzyDecisionEngine::new(),
            link: Box::new(DistanceLinkModel::default()),
            energy: Box::new(LinearEnergyModel::default()),
            migration: Box::new(AlwaysAccept),
            checkpoints: Box::new(NoCheckpoints),
            registry: Box::new(InMemoryServiceRegistry::new()),
            bindings: HashMap::new(),
            stats: StatisticsAggregator::new(),
        }
    }

    pub fn with_link_model(mut self, link: impl LinkModel + 'static) -> Self {
        self.link = Box::new(link);
        self
    }

    pub fn with_energy_model(mut self, energy: impl EnergyModel + 'static) -> Self {
        self.energy = Box::new(energy);
        self
    }

    pub fn with_migration_protocol(mut self, migration: impl MigrationProtocol + 'static) -> Self {
        self.migration = Box::new(migration);
        self
    }

    pub fn with_checkpoint_store(mut self, checkpoints: impl CheckpointStore + 'static) -> Self {
        self.checkpoints = Box::new(checkpoints);
        self
    }

    pub fn with_service_registry(mut self, registry: impl ServiceRegistry + 'static) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn counters(&self) -> &StatisticsAggregator {
        &self.stats
    }

    /// Create an edge node and publish it
    pub fn add_edge_node(&mut self, spec: &EdgeNodeSpec) -> NodeId {
        let id = self.backend.create_edge_node(spec);
        self.registry.register(ServiceRecord {
            service_type: EDGE_COMPUTE_SERVICE.to_string(),
            node: id,
            location: Some(spec.location),
            capacity_mips: spec.capacity_mips,
            resource_type: Some(spec.resource_type),
            ram_mb: Some(spec.ram_mb),
            storage_mb: Some(spec.storage_mb),
            bandwidth_kbps: None,
        });
        id
    }

    /// Create the cloud node and publish it
    pub fn add_cloud_node(&mut self, spec: &CloudNodeSpec) -> NodeId {
        let id = self.backend.create_cloud_node(spec);
        self.registry.register(ServiceRecord {
            service_type: CLOUD_COMPUTE_SERVICE.to_string(),
            node: id,
            location: None,
            capacity_mips: spec.capacity_mips,
            resource_type: None,
            ram_mb: None,
            storage_mb: None,
            bandwidth_kbps: Some(spec.bandwidth_kbps),
        });
        id
    }

    /// Bind a device to its nearest edge node.
    ///
    /// Calling it again after the device moved re-binds it; a change of node
    /// counts as a handover. Returns `None` when there are no edge nodes.
    pub fn register_device(&mut self, device: &Device) -> Option<NodeId> {
        let nodes: Vec<NodeLocation> = self
            .backend
            .edge_nodes()
            .iter()
            .map(|v| NodeLocation { id: v.id, location: v.location })
            .collect();

        let Some(nearest) = device.find_nearest_edge_node(&nodes) else {
            self.bindings.remove(&device.id);
            return None;
        };

        if let Some(previous) = self.bindings.insert(device.id.clone(), nearest) {
            if previous != nearest {
                debug!("📶 {} handover {} -> {}", device.id, previous, nearest);
                self.stats.record_handover();
            }
        }
        Some(nearest)
    }

    pub fn bound_node(&self, device_id: &str) -> Option<NodeId> {
        self.bindings.get(device_id).copied()
    }

    /// Bound node of a device, only if it is up
    fn healthy_bound_node(&self, device: &Device) -> Option<EdgeNodeView> {
        self.bound_node(&device.id)
            .and_then(|id| self.backend.edge_node(id))
            .filter(|view| view.healthy)
    }

    /// Decide where a task should run
    pub fn make_offloading_decision(&self, task: &Task, device: &Device) -> ExecutionLocation {
        let Some(node) = self.healthy_bound_node(device) else {
            debug!("{}: no usable edge node, going to cloud", task.id);
            return ExecutionLocation::Cloud;
        };

        let fuzzy = self.engine.decide(
            task.cpu_demand,
            task.network_demand,
            task.delay_sensitivity,
            node.cpu_utilization,
            node.resource_type,
        );
        let mut decision = fuzzy;

        if device.battery_level < LOW_BATTERY_THRESHOLD && decision == ExecutionLocation::LocalEdge {
            decision = ExecutionLocation::OtherEdge;
        }

        let bandwidth = self.link.bandwidth_kbps(&device.location, &node.location);
        if bandwidth < MIN_MIGRATION_BANDWIDTH_KBPS && decision == ExecutionLocation::OtherEdge {
            decision = ExecutionLocation::Cloud;
        }

        if task.security_level == SecurityLevel::High && decision != ExecutionLocation::LocalEdge {
            decision = ExecutionLocation::Cloud;
        }

        debug!(
            "{}: fuzzy {} -> {} (util {:.1}%, battery {:.2}, bw {:.0}kbps)",
            task.id, fuzzy, decision, node.cpu_utilization, device.battery_level, bandwidth
        );
        decision
    }

    /// Route a task according to a decision.
    ///
    /// Tasks are routed in the tick that created them, so `creation_time`
    /// is the current time. On energy exhaustion the task is returned inside the error and
    /// nothing is queued.
    pub fn process_task(
        &mut self,
        task: Task,
        device: &Device,
        decision: ExecutionLocation,
    ) -> Result<Placement> {
        let bound = self.healthy_bound_node(device).map(|v| v.id);

        // Edge placements need a live bound node
        let decision = match (decision, bound) {
            (ExecutionLocation::Cloud, _) | (_, None) => ExecutionLocation::Cloud,
            (other, Some(_)) => other,
        };
        self.stats.record_decision(decision);

        if decision != ExecutionLocation::LocalEdge && !self.energy.can_transmit(device, &task) {
            warn!("🔋 {} cannot afford to transmit {}, dropping", device.id, task.id);
            self.stats.record_dropped();
            return Err(CoreError::EnergyExhausted { task: Box::new(task) });
        }

        let now = task.creation_time;
        match (decision, bound) {
            (ExecutionLocation::LocalEdge, Some(node)) => {
                self.enqueue(task, node, ExecutionLocation::LocalEdge, now)
            }
            (ExecutionLocation::OtherEdge, Some(from)) => self.migrate(task, from, now),
            _ => self.route_to_cloud(task, now),
        }
    }

    /// Hand a task to the least-loaded peer, or the cloud if that fails
    fn migrate(&mut self, task: Task, from: NodeId, now: f64) -> Result<Placement> {
        let Some(target) = self.least_loaded_peer(from) else {
            debug!("{}: no peer edge node available, going to cloud", task.id);
            return self.route_to_cloud(task, now);
        };

        if self.migration.handshake(&task, from, target) {
            self.stats.record_migration(true);
            self.enqueue(task, target, ExecutionLocation::OtherEdge, now)
        } else {
            warn!("🔁 migration of {} {} -> {} refused, falling back to cloud", task.id, from, target);
            self.stats.record_migration(false);
            self.route_to_cloud(task, now)
        }
    }

    /// Healthy edge node with the lowest utilization, first on ties
    fn least_loaded_peer(&self, exclude: NodeId) -> Option<NodeId> {
        self.backend
            .edge_nodes()
            .into_iter()
            .filter(|v| v.id != exclude && v.healthy)
            .min_by(|a, b| a.cpu_utilization.total_cmp(&b.cpu_utilization))
            .map(|v| v.id)
    }

    fn route_to_cloud(&mut self, task: Task, now: f64) -> Result<Placement> {
        match self.backend.cloud_node() {
            Some(cloud) => self.enqueue(task, cloud, ExecutionLocation::Cloud, now),
            None => Err(CoreError::NoCloudNode { task: Box::new(task) }),
        }
    }

    fn enqueue(
        &mut self,
        mut task: Task,
        node: NodeId,
        location: ExecutionLocation,
        now: f64,
    ) -> Result<Placement> {
        task.execution_location = Some(location);
        if location != ExecutionLocation::Cloud {
            self.checkpoints.save(&task, node, now);
        }
        self.backend.submit_task(task, node)?;
        Ok(Placement { node, location })
    }

    /// Let every node process one task and account for the outcomes
    pub fn process_tick(&mut self, now: f64) -> Vec<TaskReport> {
        let reports = self.backend.process_tick(now);
        for report in &reports {
            if report.status == TaskStatus::Failed {
                warn!("🔒 security incident: {} failed integrity check on {}", report.task_id, report.node);
                self.stats.record_security_incident();
                self.stats.record_failed();
            }
            if report.status.is_terminal() {
                self.checkpoints.discard(&report.task_id);
            }
        }
        reports
    }

    /// Take an edge node down.
    ///
    /// Queued tasks with a checkpoint move to the least-loaded healthy peer
    /// (or the cloud); the rest are marked FAILED on the dead node.
    pub fn fail_edge_node(&mut self, id: NodeId, now: f64) -> Result<FailoverReport> {
        let drained = self.backend.fail_edge_node(id)?;
        self.registry.deregister(id);
        warn!("💥 {} failed with {} queued tasks", id, drained.len());

        let mut report = FailoverReport::default();
        for task in drained {
            if self.checkpoints.take(&task.id).is_some() {
                let placement = match self.least_loaded_peer(id) {
                    Some(peer) => self.enqueue(task, peer, ExecutionLocation::OtherEdge, now),
                    None => self.route_to_cloud(task, now),
                };
                match placement {
                    Ok(p) => {
                        debug!("♻️  recovered task onto {} ({})", p.node, p.location);
                        self.stats.record_recovered();
                        report.recovered += 1;
                    }
                    Err(e) => {
                        warn!("⚠️  could not recover task from {}: {}", id, e);
                        self.stats.record_failed();
                        report.failed += 1;
                        if let Some(task) = e.into_task() {
                            self.backend.retire_task(id, task)?;
                        }
                    }
                }
            } else {
                self.stats.record_failed();
                report.failed += 1;
                self.backend.retire_task(id, task)?;
            }
        }

        info!("{} failover: {} recovered, {} lost", id, report.recovered, report.failed);
        Ok(report)
    }

    /// Bring an edge node back and republish it
    pub fn recover_edge_node(&mut self, id: NodeId) -> Result<()> {
        self.backend.restore_edge_node(id)?;
        if let Some(view) = self.backend.edge_node(id) {
            self.registry.register(ServiceRecord {
                service_type: EDGE_COMPUTE_SERVICE.to_string(),
                node: id,
                location: Some(view.location),
                capacity_mips: view.capacity_mips,
                resource_type: Some(view.resource_type),
                ram_mb: Some(view.ram_mb),
                storage_mb: Some(view.storage_mb),
                bandwidth_kbps: None,
            });
        }
        info!("✅ {} recovered", id);
        Ok(())
    }

    /// Snapshot of system-wide statistics
    pub fn system_statistics(&self) -> SystemStatistics {
        let utilizations: Vec<f64> = self
            .backend
            .edge_nodes()
            .iter()
            .map(|v| v.cpu_utilization)
            .collect();
        let cloud = self.backend.cloud_utilization().unwrap_or(0.0);
        self.stats
            .snapshot(self.backend.collect_results(), &utilizations, cloud)
    }

    /// Services of a type, from the registry
    pub fn find_services(&self, service_type: &str) -> Vec<ServiceRecord> {
        self.registry.find(service_type)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::NativeBackend;
    use crate::checkpoint::{Checkpoint, InMemoryCheckpointStore};
    use crate::energy::UnlimitedEnergy;
    use crate::link::FixedLinkModel;
    use crate::migration::LossyMigration;
    use crate::types::{Point, ResourceType};

    fn edge_spec(x: f64, resource_type: ResourceType) -> EdgeNodeSpec {
        EdgeNodeSpec {
            location: Point::new(x, 0.0),
            capacity_mips: 2000.0,
            ram_mb: 4096,
            storage_mb: 65536,
            resource_type,
        }
    }

    fn cloud_spec() -> CloudNodeSpec {
        CloudNodeSpec { capacity_mips: 20_000.0, bandwidth_kbps: 100_000.0, wan_latency_ms: 10.0 }
    }

    /// Three edge nodes at x = 0, 100, 200 and a cloud node
    fn orchestrator() -> OffloadingOrchestrator<NativeBackend> {
        let mut orch = OffloadingOrchestrator::new(NativeBackend::new());
        orch.add_edge_node(&edge_spec(0.0, ResourceType::Low));
        orch.add_edge_node(&edge_spec(100.0, ResourceType::Low));
        orch.add_edge_node(&edge_spec(200.0, ResourceType::High));
        orch.add_cloud_node(&cloud_spec());
        orch
    }

    fn small_task(id: &str) -> Task {
        Task::new(id, "dev", 2000.0, 1000.0, 0.2, SecurityLevel::Low, 0.0)
    }

    /// Raise a node's utilization by running heavy tasks on it
    fn load_node(orch: &mut OffloadingOrchestrator<NativeBackend>, node: NodeId, runs: usize) {
        for i in 0..runs {
            let task = Task::new(format!("load-{}-{}", node, i), "bg", 15000.0, 10.0, 0.5, SecurityLevel::Low, 0.0);
            orch.backend_mut().submit_task(task, node).unwrap();
            orch.backend_mut().process_tick(0.0);
        }
    }

    #[test]
    fn test_register_device_binds_nearest() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::new(90.0, 10.0), 0.0);
        assert_eq!(orch.register_device(&device), Some(NodeId(1)));
        assert_eq!(orch.bound_node("dev"), Some(NodeId(1)));
    }

    #[test]
    fn test_register_device_tie_goes_to_first_node() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::new(50.0, 0.0), 0.0);
        assert_eq!(orch.register_device(&device), Some(NodeId(0)));
    }

    #[test]
    fn test_register_device_without_edges() {
        let mut orch = OffloadingOrchestrator::new(NativeBackend::new());
        orch.add_cloud_node(&cloud_spec());
        let device = Device::new("dev", 0, Point::default(), 0.0);
        assert!(orch.register_device(&device).is_none());

        let task = small_task("dev-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::Cloud);
    }

    #[test]
    fn test_handover_is_counted() {
        let mut orch = orchestrator();
        let mut device = Device::new("dev", 0, Point::new(0.0, 0.0), 0.0);
        orch.register_device(&device);
        orch.register_device(&device);
        assert_eq!(orch.system_statistics().handovers, 0);

        device.location = Point::new(190.0, 0.0);
        assert_eq!(orch.register_device(&device), Some(NodeId(2)));
        assert_eq!(orch.system_statistics().handovers, 1);
    }

    #[test]
    fn test_unregistered_device_goes_to_cloud() {
        let orch = orchestrator();
        let device = Device::new("stranger", 0, Point::default(), 0.0);
        let task = small_task("stranger-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::Cloud);
    }

    #[test]
    fn test_unhealthy_bound_node_goes_to_cloud() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);
        orch.fail_edge_node(NodeId(0), 0.0).unwrap();

        let task = small_task("dev-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::Cloud);
    }

    #[test]
    fn test_fuzzy_decision_is_used() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        let task = small_task("dev-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::LocalEdge);
    }

    #[test]
    fn test_low_battery_override() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0).with_battery(0.1);
        orch.register_device(&device);

        let task = small_task("dev-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::OtherEdge);
    }

    #[test]
    fn test_low_bandwidth_override() {
        let mut orch = orchestrator().with_link_model(FixedLinkModel(500.0));
        let device = Device::new("dev", 0, Point::default(), 0.0).with_battery(0.1);
        orch.register_device(&device);

        let task = small_task("dev-0");
        assert_eq!(orch.make_offloading_decision(&task, &device), ExecutionLocation::Cloud);
    }

    #[test]
    fn test_high_security_override() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        // Local decisions are kept
        let local = Task::new("dev-0", "dev", 2000.0, 1000.0, 0.2, SecurityLevel::High, 0.0);
        assert_eq!(orch.make_offloading_decision(&local, &device), ExecutionLocation::LocalEdge);

        // Peer decisions are forced to the cloud
        let low_battery = device.clone().with_battery(0.1);
        assert_eq!(orch.make_offloading_decision(&local, &low_battery), ExecutionLocation::Cloud);
    }

    #[test]
    fn test_process_task_local() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        let placement = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::LocalEdge)
            .unwrap();
        assert_eq!(placement, Placement { node: NodeId(0), location: ExecutionLocation::LocalEdge });
        assert_eq!(orch.backend().edge_node(NodeId(0)).unwrap().queue_len, 1);

        let reports = orch.process_tick(1000.0);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, TaskStatus::Completed);
        assert_eq!(reports[0].execution_location, Some(ExecutionLocation::LocalEdge));
    }

    #[test]
    fn test_process_task_other_edge_picks_least_loaded() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        load_node(&mut orch, NodeId(1), 3);
        let placement = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::OtherEdge)
            .unwrap();
        assert_eq!(placement.node, NodeId(2));
        assert_eq!(placement.location, ExecutionLocation::OtherEdge);
        assert_eq!(orch.counters().successful_migrations(), 1);
    }

    #[test]
    fn test_process_task_other_edge_tie_goes_to_first_peer() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::new(200.0, 0.0), 0.0);
        orch.register_device(&device);

        let placement = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::OtherEdge)
            .unwrap();
        assert_eq!(placement.node, NodeId(0));
    }

    #[test]
    fn test_peer_selection_skips_unhealthy_nodes() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);
        orch.fail_edge_node(NodeId(1), 0.0).unwrap();

        let placement = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::OtherEdge)
            .unwrap();
        assert_eq!(placement.node, NodeId(2));
    }

    #[test]
    fn test_failed_handshake_falls_back_to_cloud() {
        let mut orch = orchestrator().with_migration_protocol(LossyMigration::new(1.0, 0));
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        let placement = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::OtherEdge)
            .unwrap();
        assert_eq!(placement.location, ExecutionLocation::Cloud);
        assert_eq!(orch.counters().failed_migrations(), 1);
        assert_eq!(orch.counters().successful_migrations(), 0);
    }

    #[test]
    fn test_energy_exhaustion_returns_task() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0).with_battery(0.0);
        orch.register_device(&device);

        let err = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::Cloud)
            .unwrap_err();
        assert!(matches!(err, CoreError::EnergyExhausted { .. }));
        assert_eq!(err.into_task().unwrap().status, TaskStatus::Created);
        assert_eq!(orch.counters().dropped_tasks(), 1);
        assert!(orch.backend().collect_results().is_empty());

        // Local execution needs no transmission
        assert!(orch
            .process_task(small_task("dev-1"), &device, ExecutionLocation::LocalEdge)
            .is_ok());
    }

    #[test]
    fn test_energy_exhaustion_on_peer_route() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0).with_battery(0.0);
        orch.register_device(&device);

        let err = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::OtherEdge)
            .unwrap_err();
        assert!(matches!(err, CoreError::EnergyExhausted { .. }));
        assert_eq!(orch.counters().dropped_tasks(), 1);
        assert_eq!(orch.counters().successful_migrations(), 0);
        assert_eq!(orch.counters().failed_migrations(), 0);
        assert!(orch.backend().edge_nodes().iter().all(|v| v.queue_len == 0));
        assert_eq!(orch.system_statistics().decisions_other_edge, 1);
    }

    /// In-memory store that also keeps every save for inspection
    struct RecordingStore {
        inner: InMemoryCheckpointStore,
        saved: Rc<RefCell<Vec<Checkpoint>>>,
    }

    impl CheckpointStore for RecordingStore {
        fn save(&mut self, task: &Task, node: NodeId, now: f64) {
            self.saved.borrow_mut().push(Checkpoint { task_id: task.id.clone(), node, saved_at: now });
            self.inner.save(task, node, now);
        }

        fn take(&mut self, task_id: &str) -> Option<Checkpoint> {
            self.inner.take(task_id)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_checkpoints_are_stamped_with_current_time() {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let mut orch = orchestrator().with_checkpoint_store(RecordingStore {
            inner: InMemoryCheckpointStore::new(),
            saved: Rc::clone(&saved),
        });
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        let task = Task::new("dev-0", "dev", 2000.0, 1000.0, 0.2, SecurityLevel::Low, 2000.0);
        orch.process_task(task, &device, ExecutionLocation::LocalEdge).unwrap();
        orch.fail_edge_node(NodeId(0), 7000.0).unwrap();

        let saved = saved.borrow();
        assert_eq!(saved.len(), 2);
        assert_eq!((saved[0].node, saved[0].saved_at), (NodeId(0), 2000.0));
        assert_eq!((saved[1].node, saved[1].saved_at), (NodeId(1), 7000.0));
    }

    #[test]
    fn test_missing_cloud_node_returns_task() {
        let mut orch = OffloadingOrchestrator::new(NativeBackend::new()).with_energy_model(UnlimitedEnergy);
        let device = Device::new("dev", 0, Point::default(), 0.0);
        let err = orch
            .process_task(small_task("dev-0"), &device, ExecutionLocation::Cloud)
            .unwrap_err();
        assert!(matches!(err, CoreError::NoCloudNode { .. }));
    }

    #[test]
    fn test_node_failure_without_checkpoints() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);
        for i in 0..2 {
            orch.process_task(small_task(&format!("dev-{}", i)), &device, ExecutionLocation::LocalEdge)
                .unwrap();
        }

        let report = orch.fail_edge_node(NodeId(0), 0.0).unwrap();
        assert_eq!(report, FailoverReport { recovered: 0, failed: 2 });

        let failures = orch.backend().collect_failures();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|t| t.status == TaskStatus::Failed));
        assert_eq!(orch.system_statistics().failed_tasks, 2);
        assert_eq!(orch.find_services(EDGE_COMPUTE_SERVICE).len(), 2);
    }

    #[test]
    fn test_node_failure_with_checkpoints_recovers() {
        let mut orch = orchestrator().with_checkpoint_store(InMemoryCheckpointStore::new());
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);
        orch.process_task(small_task("dev-0"), &device, ExecutionLocation::LocalEdge)
            .unwrap();

        let report = orch.fail_edge_node(NodeId(0), 0.0).unwrap();
        assert_eq!(report, FailoverReport { recovered: 1, failed: 0 });
        assert_eq!(orch.backend().edge_node(NodeId(1)).unwrap().queue_len, 1);

        let reports = orch.process_tick(0.0);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].node, NodeId(1));
        assert_eq!(reports[0].execution_location, Some(ExecutionLocation::OtherEdge));
        assert_eq!(orch.system_statistics().recovered_tasks, 1);
    }

    #[test]
    fn test_recover_edge_node() {
        let mut orch = orchestrator();
        orch.fail_edge_node(NodeId(2), 0.0).unwrap();
        assert!(!orch.backend().edge_node(NodeId(2)).unwrap().healthy);

        orch.recover_edge_node(NodeId(2)).unwrap();
        assert!(orch.backend().edge_node(NodeId(2)).unwrap().healthy);
        let edges = orch.find_services(EDGE_COMPUTE_SERVICE);
        assert_eq!(edges.len(), 3);
        let restored = edges.iter().find(|r| r.node == NodeId(2)).unwrap();
        assert_eq!(restored.ram_mb, Some(4096));
        assert_eq!(restored.resource_type, Some(ResourceType::High));
        assert!(orch.recover_edge_node(NodeId(77)).is_err());
    }

    #[test]
    fn test_integrity_failure_is_a_security_incident() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        let mut task = small_task("dev-0");
        crate::security::tamper(&mut task);
        orch.process_task(task, &device, ExecutionLocation::LocalEdge).unwrap();
        orch.process_tick(0.0);

        let stats = orch.system_statistics();
        assert_eq!(stats.security_incidents, 1);
        assert_eq!(stats.completed_tasks(), 0);
        assert_eq!(stats.local_edge_service_time_ms, 0.0);
    }

    #[test]
    fn test_system_statistics() {
        let mut orch = orchestrator();
        let device = Device::new("dev", 0, Point::default(), 0.0);
        orch.register_device(&device);

        orch.process_task(small_task("dev-0"), &device, ExecutionLocation::LocalEdge).unwrap();
        orch.process_task(small_task("dev-1"), &device, ExecutionLocation::Cloud).unwrap();
        orch.process_tick(0.0);

        let stats = orch.system_statistics();
        // 2000 MI on a 2000 MIPS edge
        assert_eq!(stats.local_edge_service_time_ms, 1000.0);
        // 2000 MI on a 20000 MIPS cloud + 2 x 10ms
        assert_eq!(stats.cloud_service_time_ms, 120.0);
        // one of three edge nodes at 2000 / 15000 * 50
        let expected_edge = (2000.0 / 15000.0 * 50.0) / 3.0;
        assert!((stats.avg_edge_utilization_pct - expected_edge).abs() < 1e-9);
        assert_eq!(stats.decisions_local_edge, 1);
        assert_eq!(stats.decisions_cloud, 1);
    }

    #[test]
    fn test_find_services() {
        let orch = orchestrator();
        let edges = orch.find_services(EDGE_COMPUTE_SERVICE);
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2].resource_type, Some(ResourceType::High));
        assert_eq!(edges[2].ram_mb, Some(4096));
        assert_eq!(edges[2].storage_mb, Some(65536));
        assert_eq!(edges[2].bandwidth_kbps, None);

        let clouds = orch.find_services(CLOUD_COMPUTE_SERVICE);
        assert_eq!(clouds.len(), 1);
        assert_eq!(clouds[0].bandwidth_kbps, Some(100_000.0));
        assert_eq!(clouds[0].ram_mb, None);
    }
}
