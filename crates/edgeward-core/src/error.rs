//! Error types for the edgeward core

use thiserror::Error;

use crate::types::{NodeId, Task, TaskStatus};

/// Core result type
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core.
///
/// None of these stop a simulation. Variants that carry a task hand it back
/// to the caller so it can be retried or dropped.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Backend has no node with this id
    #[error("Node {0} not found")]
    UnknownNode(NodeId),

    /// A task was routed to the cloud but no cloud node exists
    #[error("No cloud node available for task {}", task.id)]
    NoCloudNode { task: Box<Task> },

    /// Device battery cannot cover the transmission
    #[error("Insufficient energy to transmit task {}", task.id)]
    EnergyExhausted { task: Box<Task> },

    /// Resource type tag outside {1, 2}
    #[error("Invalid resource type: {0} (expected 1 or 2)")]
    InvalidResourceType(u8),

    /// Attempted to move a task backwards in its lifecycle
    #[error("Invalid transition for task {task_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl CoreError {
    /// Take back the task carried by a routing error, if any
    pub fn into_task(self) -> Option<Task> {
        match self {
            Self::NoCloudNode { task } | Self::EnergyExhausted { task } => Some(*task),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecurityLevel;

    #[test]
    fn test_error_messages() {
        let err = CoreError::UnknownNode(NodeId(7));
        assert_eq!(err.to_string(), "Node node-7 not found");

        let err = CoreError::InvalidResourceType(3);
        assert!(err.to_string().contains("expected 1 or 2"));
    }

    #[test]
    fn test_into_task_returns_carried_task() {
        let task = Task::new("d-0", "d", 100.0, 10.0, 0.5, SecurityLevel::Low, 0.0);
        let err = CoreError::EnergyExhausted { task: Box::new(task) };
        assert!(err.to_string().contains("d-0"));

        let task = err.into_task().unwrap();
        assert_eq!(task.id, "d-0");

        assert!(CoreError::UnknownNode(NodeId(1)).into_task().is_none());
    }
}
