//! Virtual-time event queue
//!
//! Delayed state changes (node outages and recoveries) are scheduled for a
//! future tick and applied by the tick loop when that tick starts. No
//! wall-clock time or threads are involved.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use edgeward_core::NodeId;
use serde::{Deserialize, Serialize};

/// Simulation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    NodeFailure { node: NodeId },
    NodeRecovery { node: NodeId },
}

/// Timed event wrapper for priority queue ordering
#[derive(Debug, Clone)]
struct TimedEvent {
    tick: u64,
    seq: u64,
    event: SimEvent,
}

// Earliest tick first, then insertion order
impl Ord for TimedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .tick
            .cmp(&self.tick)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for TimedEvent {}

impl PartialEq for TimedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.seq == other.seq
    }
}

/// Min-heap of events keyed by tick
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<TimedEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, tick: u64, event: SimEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(TimedEvent { tick, seq, event });
    }

    /// Remove and return every event due at or before `tick`, in order
    pub fn pop_due(&mut self, tick: u64) -> Vec<SimEvent> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|e| e.tick <= tick) {
            if let Some(timed) = self.heap.pop() {
                due.push(timed.event);
            }
        }
        due
    }

    pub fn next_tick(&self) -> Option<u64> {
        self.heap.peek().map(|e| e.tick)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
