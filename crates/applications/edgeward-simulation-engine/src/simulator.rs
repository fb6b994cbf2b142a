//! Discrete tick loop
//!
//! Each tick, in order: due events are applied, random node outages are
//! injected, devices move, every device gets one Bernoulli trial to
//! generate a task (which is decided and routed immediately), and finally
//! every node processes at most one queued task. A statistics record is
//! taken at the end of the tick.
//!
//! All randomness flows from one seeded `StdRng`, so a config and seed
//! always reproduce the same run.

use edgeward_core::security::tamper;
use edgeward_core::{
    ComputeBackend, Device, InMemoryCheckpointStore, LossyMigration, NativeBackend, NoCheckpoints,
    NodeId, OffloadingOrchestrator, Point, SystemStatistics, TickStatistics,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::events::{EventQueue, SimEvent};

/// Keeps the migration protocol's stream independent of the main RNG
const MIGRATION_SEED_SALT: u64 = 0x6d69_6772_6174_6521;

/// Result of a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub seed: u64,
    pub ticks: u64,
    pub tasks_generated: u64,
    pub tasks_dropped: u64,
    pub tasks_tampered: u64,
    pub node_failures: u64,
    pub statistics: SystemStatistics,
    pub history: Vec<TickStatistics>,
}

/// Tick-driven simulator
pub struct Simulator {
    config: SimulationConfig,
    rng: StdRng,
    orchestrator: OffloadingOrchestrator<NativeBackend>,
    devices: Vec<Device>,
    edge_ids: Vec<NodeId>,
    events: EventQueue,
    history: Vec<TickStatistics>,

    // Metrics
    tasks_generated: u64,
    tasks_dropped: u64,
    tasks_tampered: u64,
    node_failures: u64,
}

impl Simulator {
    /// Build the topology and device population from a validated config
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let orchestrator = OffloadingOrchestrator::new(NativeBackend::new())
            .with_link_model(config.link)
            .with_energy_model(config.energy)
            .with_migration_protocol(LossyMigration::new(
                config.faults.migration_failure_rate,
                config.seed ^ MIGRATION_SEED_SALT,
            ));
        let mut orchestrator = if config.faults.checkpointing {
            orchestrator.with_checkpoint_store(InMemoryCheckpointStore::new())
        } else {
            orchestrator.with_checkpoint_store(NoCheckpoints)
        };

        let edge_ids: Vec<NodeId> = config
            .edge
            .node_specs(&config.area)
            .iter()
            .map(|spec| orchestrator.add_edge_node(spec))
            .collect();
        orchestrator.add_cloud_node(&config.cloud.node_spec());

        let profiles = config.app_profiles.len() as u32;
        let devices: Vec<Device> = (0..config.devices.count)
            .map(|i| {
                let location = Point::new(
                    rng.gen_range(0.0..config.area.width),
                    rng.gen_range(0.0..config.area.height),
                );
                let battery = rng.gen_range(config.devices.battery_min..=config.devices.battery_max);
                Device::new(
                    format!("dev-{}", i),
                    i as u32 % profiles,
                    location,
                    config.devices.mobility_speed,
                )
                .with_battery(battery)
            })
            .collect();
        for device in &devices {
            orchestrator.register_device(device);
        }

        let mut events = EventQueue::new();
        for failure in &config.faults.scheduled_failures {
            let node = edge_ids[failure.node_index];
            events.schedule(failure.tick, SimEvent::NodeFailure { node });
            events.schedule(
                failure.tick + failure.duration_ticks,
                SimEvent::NodeRecovery { node },
            );
        }

        info!(
            "🚀 simulator ready: {} edge nodes, {} devices, {} ticks (seed {})",
            edge_ids.len(),
            devices.len(),
            config.horizon_ticks,
            config.seed
        );

        Ok(Self {
            config,
            rng,
            orchestrator,
            devices,
            edge_ids,
            events,
            history: Vec::new(),
            tasks_generated: 0,
            tasks_dropped: 0,
            tasks_tampered: 0,
            node_failures: 0,
        })
    }

    pub fn orchestrator(&self) -> &OffloadingOrchestrator<NativeBackend> {
        &self.orchestrator
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Run every tick up to the horizon
    pub fn run(mut self) -> SimulationResult {
        for tick in 0..self.config.horizon_ticks {
            self.step(tick);
        }
        self.collect_results()
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self, tick: u64) {
        let now = tick as f64 * self.config.tick_duration_ms;

        for event in self.events.pop_due(tick) {
            self.apply_event(event, tick);
        }
        self.inject_failures(tick);

        let interval = self.config.devices.mobility_interval_ticks;
        if tick > 0 && interval > 0 && tick % interval == 0 {
            self.move_devices();
        }

        self.generate_tasks(now);

        let reports = self.orchestrator.process_tick(now);
        debug!("tick {}: {} tasks processed", tick, reports.len());

        let snapshot = self.orchestrator.system_statistics();
        self.history.push(TickStatistics::from_snapshot(tick, &snapshot));
    }

    fn apply_event(&mut self, event: SimEvent, tick: u64) {
        match event {
            SimEvent::NodeFailure { node } => self.fail_node(node, tick),
            SimEvent::NodeRecovery { node } => {
                if self.is_healthy(node) {
                    return;
                }
                if let Err(e) = self.orchestrator.recover_edge_node(node) {
                    warn!("⚠️  recovery of {} failed: {}", node, e);
                }
            }
        }
    }

    fn is_healthy(&self, node: NodeId) -> bool {
        self.orchestrator
            .backend()
            .edge_node(node)
            .is_some_and(|view| view.healthy)
    }

    /// Take a node down; outages of an already-down node are ignored
    fn fail_node(&mut self, node: NodeId, tick: u64) {
        if !self.is_healthy(node) {
            return;
        }
        let now = tick as f64 * self.config.tick_duration_ms;
        match self.orchestrator.fail_edge_node(node, now) {
            Ok(report) => {
                self.node_failures += 1;
                debug!(
                    "tick {}: {} down ({} recovered, {} lost)",
                    tick, node, report.recovered, report.failed
                );
            }
            Err(e) => warn!("⚠️  failing {} failed: {}", node, e),
        }
    }

    fn inject_failures(&mut self, tick: u64) {
        let rate = self.config.faults.node_failure_rate;
        if rate <= 0.0 {
            return;
        }
        for i in 0..self.edge_ids.len() {
            let node = self.edge_ids[i];
            if self.is_healthy(node) && self.rng.gen_bool(rate) {
                self.fail_node(node, tick);
                let recover_at = tick + self.config.faults.recovery_delay_ticks.max(1);
                self.events.schedule(recover_at, SimEvent::NodeRecovery { node });
            }
        }
    }

    fn move_devices(&mut self) {
        for device in &mut self.devices {
            device.update_location(&self.config.area, &mut self.rng);
            self.orchestrator.register_device(device);
        }
    }

    fn generate_tasks(&mut self, now: f64) {
        for device in &mut self.devices {
            if !self.rng.gen_bool(self.config.devices.task_probability) {
                continue;
            }

            let app_type = device.device_type as usize;
            let mut task =
                device.generate_task_from(&self.config.app_profiles, app_type, now, &mut self.rng);
            self.tasks_generated += 1;

            if self.rng.gen_bool(self.config.faults.tamper_rate) {
                tamper(&mut task);
                self.tasks_tampered += 1;
            }

            let decision = self.orchestrator.make_offloading_decision(&task, device);
            if let Err(e) = self.orchestrator.process_task(task, device, decision) {
                warn!("⚠️  dropping task from {}: {}", device.id, e);
                self.tasks_dropped += 1;
            }
        }
    }

    fn collect_results(self) -> SimulationResult {
        let statistics = self.orchestrator.system_statistics();
        info!(
            "🏁 finished: {} generated, {} completed, {} dropped",
            self.tasks_generated,
            statistics.completed_tasks(),
            self.tasks_dropped
        );

        SimulationResult {
            seed: self.config.seed,
            ticks: self.config.horizon_ticks,
            tasks_generated: self.tasks_generated,
            tasks_dropped: self.tasks_dropped,
            tasks_tampered: self.tasks_tampered,
            node_failures: self.node_failures,
            statistics,
            history: self.history,
        }
    }
}
