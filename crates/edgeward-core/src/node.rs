//! Resource nodes: edge servers and the cloud
//!
//! Both hold an unbounded FIFO queue, a completed list and a smoothed CPU
//! utilization estimate. Each call to `process_next_task` pops one task and
//! runs it to completion in zero simulated wall time.
//!
//! Execution time is linear in demand: `cpu_demand / capacity_mips * 1000` ms,
//! plus a WAN round trip for the cloud.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{NodeId, Point, ResourceType, Task, TaskStatus};

/// Demand (MI) at which a single task contributes the full utilization step
pub const UTILIZATION_REFERENCE_DEMAND: f64 = 15000.0;

/// Exponential smoothing parameters for the utilization estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationModel {
    pub decay: f64,
    pub scale: f64,
}

impl UtilizationModel {
    pub const EDGE: UtilizationModel = UtilizationModel { decay: 0.7, scale: 50.0 };
    pub const CLOUD: UtilizationModel = UtilizationModel { decay: 0.8, scale: 20.0 };

    /// Next utilization after running a task of `cpu_demand`
    pub fn next(&self, current: f64, cpu_demand: f64) -> f64 {
        let step = (cpu_demand / UTILIZATION_REFERENCE_DEMAND * self.scale).min(self.scale);
        (current * self.decay + step).clamp(0.0, 100.0)
    }
}

/// Behaviour shared by edge and cloud nodes
pub trait ResourceNode {
    fn id(&self) -> NodeId;

    /// Append to the tail of the queue. Never rejects.
    fn queue_task(&mut self, task: Task);

    /// Pop and execute the head of the queue, if any
    fn process_next_task(&mut self, current_time: f64) -> Option<&Task>;

    fn cpu_utilization(&self) -> f64;

    fn capacity_mips(&self) -> f64;

    fn queue_len(&self) -> usize;

    fn completed_tasks(&self) -> &[Task];

    fn failed_tasks(&self) -> &[Task];

    /// Mean of `completion_time - creation_time` over completed tasks, 0 if none
    fn average_service_time(&self) -> f64 {
        let completed = self.completed_tasks();
        if completed.is_empty() {
            return 0.0;
        }
        let total: f64 = completed.iter().filter_map(Task::service_time).sum();
        total / completed.len() as f64
    }
}

/// Queue, history and utilization common to both node kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeCore {
    capacity_mips: f64,
    queue: VecDeque<Task>,
    completed: Vec<Task>,
    failed: Vec<Task>,
    cpu_utilization: f64,
}

impl NodeCore {
    fn new(capacity_mips: f64) -> Self {
        Self {
            capacity_mips,
            queue: VecDeque::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            cpu_utilization: 0.0,
        }
    }

    fn enqueue(&mut self, node: NodeId, mut task: Task) {
        // A task moved off a failed node arrives already queued
        if task.status != TaskStatus::Queued {
            if let Err(e) = task.advance(TaskStatus::Queued) {
                warn!("⚠️  {} queued out of order: {}", node, e);
            }
        }
        self.queue.push_back(task);
    }

    fn execute(
        &mut self,
        node: NodeId,
        current_time: f64,
        transfer_ms: f64,
        model: UtilizationModel,
    ) -> Option<&Task> {
        let mut task = self.queue.pop_front()?;

        // A task queued in a terminal state is parked, not dropped
        if let Err(e) = task.advance(TaskStatus::Running) {
            warn!("⚠️  {} cannot start task: {}", node, e);
            self.failed.push(task);
            return self.failed.last();
        }
        task.start_time = Some(current_time);

        if !task.is_intact() {
            warn!("🔒 {} integrity check failed for task {}", node, task.id);
            self.retire_failed(node, task);
            return self.failed.last();
        }

        let execution_ms = task.cpu_demand / self.capacity_mips * 1000.0 + transfer_ms;
        self.cpu_utilization = model.next(self.cpu_utilization, task.cpu_demand);

        task.completion_time = Some(current_time + execution_ms);
        if let Err(e) = task.advance(TaskStatus::Completed) {
            warn!("⚠️  {} cannot complete task: {}", node, e);
        }
        debug!(
            "{} completed {} in {:.1}ms (util {:.1}%)",
            node, task.id, execution_ms, self.cpu_utilization
        );

        self.completed.push(task);
        self.completed.last()
    }

    fn retire_failed(&mut self, node: NodeId, mut task: Task) {
        if let Err(e) = task.advance(TaskStatus::Failed) {
            warn!("⚠️  {} cannot fail task: {}", node, e);
        }
        self.failed.push(task);
    }
}

/// Construction parameters for an edge node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNodeSpec {
    pub location: Point,
    pub capacity_mips: f64,
    pub ram_mb: u64,
    pub storage_mb: u64,
    pub resource_type: ResourceType,
}

/// An edge server near the devices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeNode {
    id: NodeId,
    pub location: Point,
    pub resource_type: ResourceType,
    pub ram_mb: u64,
    pub storage_mb: u64,
    healthy: bool,
    core: NodeCore,
}

impl EdgeNode {
    pub fn new(id: NodeId, spec: &EdgeNodeSpec) -> Self {
        Self {
            id,
            location: spec.location,
            resource_type: spec.resource_type,
            ram_mb: spec.ram_mb,
            storage_mb: spec.storage_mb,
            healthy: true,
            core: NodeCore::new(spec.capacity_mips),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Mark the node down and hand back everything still queued
    pub fn mark_unhealthy(&mut self) -> Vec<Task> {
        self.healthy = false;
        self.core.queue.drain(..).collect()
    }

    pub fn mark_healthy(&mut self) {
        self.healthy = true;
    }

    /// Keep a task that was lost with this node
    pub fn record_failure(&mut self, task: Task) {
        self.core.retire_failed(self.id, task);
    }
}

impl ResourceNode for EdgeNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn queue_task(&mut self, task: Task) {
        self.core.enqueue(self.id, task);
    }

    fn process_next_task(&mut self, current_time: f64) -> Option<&Task> {
        if !self.healthy {
            return None;
        }
        self.core.execute(self.id, current_time, 0.0, UtilizationModel::EDGE)
    }

    fn cpu_utilization(&self) -> f64 {
        self.core.cpu_utilization
    }

    fn capacity_mips(&self) -> f64 {
        self.core.capacity_mips
    }

    fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    fn completed_tasks(&self) -> &[Task] {
        &self.core.completed
    }

    fn failed_tasks(&self) -> &[Task] {
        &self.core.failed
    }
}

/// Construction parameters for the cloud node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudNodeSpec {
    pub capacity_mips: f64,
    pub bandwidth_kbps: f64,
    pub wan_latency_ms: f64,
}

/// The remote data centre
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudNode {
    id: NodeId,
    pub wan_latency_ms: f64,
    core: NodeCore,
}

impl CloudNode {
    pub fn new(id: NodeId, spec: &CloudNodeSpec) -> Self {
        Self {
            id,
            wan_latency_ms: spec.wan_latency_ms,
            core: NodeCore::new(spec.capacity_mips),
        }
    }
}

impl ResourceNode for CloudNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn queue_task(&mut self, task: Task) {
        self.core.enqueue(self.id, task);
    }

    fn process_next_task(&mut self, current_time: f64) -> Option<&Task> {
        let round_trip = 2.0 * self.wan_latency_ms;
        self.core.execute(self.id, current_time, round_trip, UtilizationModel::CLOUD)
    }

    fn cpu_utilization(&self) -> f64 {
        self.core.cpu_utilization
    }

    fn capacity_mips(&self) -> f64 {
        self.core.capacity_mips
    }

    fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    fn completed_tasks(&self) -> &[Task] {
        &self.core.completed
    }

    fn failed_tasks(&self) -> &[Task] {
        &self.core.failed
    }
}
