//! Compute backend interface
//!
//! The orchestrator works through this interface ONLY - never through a
//! concrete node collection. `NativeBackend` is the in-process
//! implementation built on [`EdgeNode`] and [`CloudNode`].

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::node::{CloudNode, CloudNodeSpec, EdgeNode, EdgeNodeSpec, ResourceNode};
use crate::types::{ExecutionLocation, NodeId, Point, ResourceType, Task, TaskId, TaskStatus};

/// Read-only snapshot of an edge node, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeNodeView {
    pub id: NodeId,
    pub location: Point,
    pub capacity_mips: f64,
    pub ram_mb: u64,
    pub storage_mb: u64,
    pub cpu_utilization: f64,
    pub resource_type: ResourceType,
    pub healthy: bool,
    pub queue_len: usize,
}

/// Outcome of one task processed during a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_id: TaskId,
    pub node: NodeId,
    pub status: TaskStatus,
    pub execution_location: Option<ExecutionLocation>,
    pub service_time_ms: Option<f64>,
}

impl TaskReport {
    fn from_task(node: NodeId, task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            node,
            status: task.status,
            execution_location: task.execution_location,
            service_time_ms: task.service_time(),
        }
    }
}

/// Where nodes live and tasks execute
pub trait ComputeBackend {
    /// Lifecycle
    fn create_edge_node(&mut self, spec: &EdgeNodeSpec) -> NodeId;
    fn create_cloud_node(&mut self, spec: &CloudNodeSpec) -> NodeId;

    /// Queue a task on a node
    fn submit_task(&mut self, task: Task, target: NodeId) -> Result<()>;

    /// Every node processes at most one queued task, in node order
    fn process_tick(&mut self, now: f64) -> Vec<TaskReport>;

    /// Completed tasks across all nodes
    fn collect_results(&self) -> Vec<&Task>;

    /// Tasks that ended FAILED, across all nodes
    fn collect_failures(&self) -> Vec<&Task>;

    /// Topology
    fn edge_nodes(&self) -> Vec<EdgeNodeView>;
    fn edge_node(&self, id: NodeId) -> Option<EdgeNodeView>;
    fn cloud_node(&self) -> Option<NodeId>;
    fn cloud_utilization(&self) -> Option<f64>;

    /// Health: marking a node down hands back its queue
    fn fail_edge_node(&mut self, id: NodeId) -> Result<Vec<Task>>;
    fn restore_edge_node(&mut self, id: NodeId) -> Result<()>;

    /// Park a task that was lost with a failed node
    fn retire_task(&mut self, id: NodeId, task: Task) -> Result<()>;
}

/// In-process backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeBackend {
    edges: Vec<EdgeNode>,
    cloud: Option<CloudNode>,
    next_id: u32,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn edge_mut(&mut self, id: NodeId) -> Result<&mut EdgeNode> {
        self.edges
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or(CoreError::UnknownNode(id))
    }

    pub fn edges(&self) -> &[EdgeNode] {
        &self.edges
    }

    pub fn cloud(&self) -> Option<&CloudNode> {
        self.cloud.as_ref()
    }

    fn view(edge: &EdgeNode) -> EdgeNodeView {
        EdgeNodeView {
            id: edge.id(),
            location: edge.location,
            capacity_mips: edge.capacity_mips(),
            ram_mb: edge.ram_mb,
            storage_mb: edge.storage_mb,
            cpu_utilization: edge.cpu_utilization(),
            resource_type: edge.resource_type,
            healthy: edge.is_healthy(),
            queue_len: edge.queue_len(),
        }
    }
}

impl ComputeBackend for NativeBackend {
    fn create_edge_node(&mut self, spec: &EdgeNodeSpec) -> NodeId {
        let id = self.allocate_id();
        self.edges.push(EdgeNode::new(id, spec));
        id
    }

    /// A second call replaces the existing cloud node
    fn create_cloud_node(&mut self, spec: &CloudNodeSpec) -> NodeId {
        let id = self.allocate_id();
        self.cloud = Some(CloudNode::new(id, spec));
        id
    }

    fn submit_task(&mut self, task: Task, target: NodeId) -> Result<()> {
        if let Some(cloud) = self.cloud.as_mut().filter(|c| c.id() == target) {
            cloud.queue_task(task);
            return Ok(());
        }
        self.edge_mut(target)?.queue_task(task);
        Ok(())
    }

    fn process_tick(&mut self, now: f64) -> Vec<TaskReport> {
        let mut reports = Vec::new();
        for edge in &mut self.edges {
            let id = edge.id();
            if let Some(task) = edge.process_next_task(now) {
                reports.push(TaskReport::from_task(id, task));
            }
        }
        if let Some(cloud) = self.cloud.as_mut() {
            let id = cloud.id();
            if let Some(task) = cloud.process_next_task(now) {
                reports.push(TaskReport::from_task(id, task));
            }
        }
        reports
    }

    fn collect_results(&self) -> Vec<&Task> {
        let edge_tasks = self.edges.iter().flat_map(|e| e.completed_tasks());
        let cloud_tasks = self.cloud.iter().flat_map(|c| c.completed_tasks());
        edge_tasks.chain(cloud_tasks).collect()
    }

    fn collect_failures(&self) -> Vec<&Task> {
        let edge_tasks = self.edges.iter().flat_map(|e| e.failed_tasks());
        let cloud_tasks = self.cloud.iter().flat_map(|c| c.failed_tasks());
        edge_tasks.chain(cloud_tasks).collect()
    }

    fn edge_nodes(&self) -> Vec<EdgeNodeView> {
        self.edges.iter().map(Self::view).collect()
    }

    fn edge_node(&self, id: NodeId) -> Option<EdgeNodeView> {
        self.edges.iter().find(|e| e.id() == id).map(Self::view)
    }

    fn cloud_node(&self) -> Option<NodeId> {
        self.cloud.as_ref().map(|c| c.id())
    }

    fn cloud_utilization(&self) -> Option<f64> {
        self.cloud.as_ref().map(|c| c.cpu_utilization())
    }

    fn fail_edge_node(&mut self, id: NodeId) -> Result<Vec<Task>> {
        Ok(self.edge_mut(id)?.mark_unhealthy())
    }

    fn restore_edge_node(&mut self, id: NodeId) -> Result<()> {
        self.edge_mut(id)?.mark_healthy();
        Ok(())
    }

    fn retire_task(&mut self, id: NodeId, task: Task) -> Result<()> {
        self.edge_mut(id)?.record_failure(task);
        Ok(())
    }
}
