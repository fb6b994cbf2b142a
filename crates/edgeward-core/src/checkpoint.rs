//! Task checkpoints for edge node failures
//!
//! When an edge node goes down, queued tasks with a checkpoint can be
//! resumed elsewhere. Tasks without one are lost.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Task, TaskId};

/// Snapshot metadata for a queued task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub task_id: TaskId,
    pub node: NodeId,
    pub saved_at: f64,
}

/// Storage for task checkpoints
pub trait CheckpointStore {
    fn save(&mut self, task: &Task, node: NodeId, now: f64);

    /// Remove and return the checkpoint for a task
    fn take(&mut self, task_id: &str) -> Option<Checkpoint>;

    /// Drop a checkpoint that is no longer needed
    fn discard(&mut self, task_id: &str) {
        self.take(task_id);
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checkpointing disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoints;

impl CheckpointStore for NoCheckpoints {
    fn save(&mut self, _task: &Task, _node: NodeId, _now: f64) {}

    fn take(&mut self, _task_id: &str) -> Option<Checkpoint> {
        None
    }

    fn len(&self) -> usize {
        0
    }
}

/// Checkpoints kept in memory, keyed by task id
#[derive(Debug, Clone, Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: HashMap<TaskId, Checkpoint>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn save(&mut self, task: &Task, node: NodeId, now: f64) {
        self.checkpoints.insert(
            task.id.clone(),
            Checkpoint {
                task_id: task.id.clone(),
                node,
                saved_at: now,
            },
        );
    }

    fn take(&mut self, task_id: &str) -> Option<Checkpoint> {
        self.checkpoints.remove(task_id)
    }

    fn len(&self) -> usize {
        self.checkpoints.len()
    }
}
