//! Core types shared across the edgeward core

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::security;

/// Unique identifier for a resource node (edge or cloud)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Task identifier, `deviceId-sequenceNumber`
pub type TaskId = String;

/// A position in the simulation plane (metres)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Rectangular simulation area anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub width: f64,
    pub height: f64,
}

impl Area {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Clamp a point into the rectangle
    pub fn clamp(&self, point: Point) -> Point {
        Point {
            x: point.x.clamp(0.0, self.width),
            y: point.y.clamp(0.0, self.height),
        }
    }

    pub fn contains(&self, point: &Point) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }
}

impl Default for Area {
    fn default() -> Self {
        Self::new(1000.0, 1000.0)
    }
}

/// Capability tier of an edge node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    /// Tier 1
    Low,
    /// Tier 2
    High,
}

impl ResourceType {
    /// Numeric tag (1 = low, 2 = high)
    pub fn tag(self) -> u8 {
        match self {
            ResourceType::Low => 1,
            ResourceType::High => 2,
        }
    }
}

impl TryFrom<u8> for ResourceType {
    type Error = CoreError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(ResourceType::Low),
            2 => Ok(ResourceType::High),
            other => Err(CoreError::InvalidResourceType(other)),
        }
    }
}

/// Where a task executes. Also the output label of the fuzzy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionLocation {
    LocalEdge,
    OtherEdge,
    Cloud,
}

impl ExecutionLocation {
    pub const ALL: [ExecutionLocation; 3] = [
        ExecutionLocation::LocalEdge,
        ExecutionLocation::OtherEdge,
        ExecutionLocation::Cloud,
    ];
}

impl std::fmt::Display for ExecutionLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionLocation::LocalEdge => write!(f, "LOCAL_EDGE"),
            ExecutionLocation::OtherEdge => write!(f, "OTHER_EDGE"),
            ExecutionLocation::Cloud => write!(f, "CLOUD"),
        }
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Created,
    Queued,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Lifecycle only moves forward; FAILED is reachable from QUEUED or RUNNING
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Created, Queued)
                | (Queued, Running)
                | (Queued, Failed)
                | (Running, Completed)
                | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Security classification carried by a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// The unit of work generated by a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub source_device: String,
    pub cpu_demand: f64,          // Million instructions
    pub network_demand: f64,      // Kilobytes
    pub delay_sensitivity: f64,   // 0 (tolerant) .. 1 (critical)
    pub security_level: SecurityLevel,

    pub creation_time: f64,
    pub start_time: Option<f64>,
    pub completion_time: Option<f64>,

    pub status: TaskStatus,
    pub execution_location: Option<ExecutionLocation>,

    // Hex digest over the identity and demand fields, set at creation
    seal: String,
}

impl Task {
    pub fn new(
        id: impl Into<TaskId>,
        source_device: impl Into<String>,
        cpu_demand: f64,
        network_demand: f64,
        delay_sensitivity: f64,
        security_level: SecurityLevel,
        creation_time: f64,
    ) -> Self {
        let mut task = Task {
            id: id.into(),
            source_device: source_device.into(),
            cpu_demand,
            network_demand,
            delay_sensitivity,
            security_level,
            creation_time,
            start_time: None,
            completion_time: None,
            status: TaskStatus::Created,
            execution_location: None,
            seal: String::new(),
        };
        task.seal = security::digest(&task);
        task
    }

    /// Move the task forward in its lifecycle
    pub fn advance(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// True when the demand fields still match the creation seal
    pub fn is_intact(&self) -> bool {
        self.seal == security::digest(self)
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Elapsed time from creation to completion (ms)
    pub fn service_time(&self) -> Option<f64> {
        self.completion_time.map(|done| done - self.creation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task::new("dev-1-0", "dev-1", 3000.0, 1500.0, 0.9, SecurityLevel::Low, 10.0)
    }

    #[test]
    fn test_task_creation() {
        let task = sample_task();
        assert_eq!(task.status, TaskStatus::Created);
        assert!(task.execution_location.is_none());
        assert!(task.start_time.is_none());
        assert!(task.service_time().is_none());
        assert!(task.is_intact());
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        let mut task = sample_task();
        task.advance(TaskStatus::Queued).unwrap();
        task.advance(TaskStatus::Running).unwrap();

        let err = task.advance(TaskStatus::Queued).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(task.status, TaskStatus::Running);

        task.advance(TaskStatus::Completed).unwrap();
        assert!(task.advance(TaskStatus::Failed).is_err());
        assert!(task.status.is_terminal());
    }

    #[test]
    fn test_failed_reachable_from_queued() {
        let mut task = sample_task();
        assert!(task.advance(TaskStatus::Failed).is_err());
        task.advance(TaskStatus::Queued).unwrap();
        task.advance(TaskStatus::Failed).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[test]
    fn test_tampered_task_breaks_seal() {
        let mut task = sample_task();
        task.cpu_demand *= 2.0;
        assert!(!task.is_intact());
    }

    #[test]
    fn test_resource_type_tags() {
        assert_eq!(ResourceType::try_from(1).unwrap(), ResourceType::Low);
        assert_eq!(ResourceType::try_from(2).unwrap(), ResourceType::High);
        assert!(ResourceType::try_from(0).is_err());
        assert_eq!(ResourceType::High.tag(), 2);
    }

    #[test]
    fn test_area_clamp_and_distance() {
        let area = Area::new(100.0, 50.0);
        let p = area.clamp(Point::new(-5.0, 80.0));
        assert_eq!(p, Point::new(0.0, 50.0));
        assert!(area.contains(&p));

        assert_eq!(Point::new(0.0, 0.0).distance_to(&Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_execution_location_serialization() {
        let json = serde_json::to_string(&ExecutionLocation::OtherEdge).unwrap();
        assert_eq!(json, "\"OtherEdge\"");
        assert_eq!(ExecutionLocation::Cloud.to_string(), "CLOUD");
    }
}
