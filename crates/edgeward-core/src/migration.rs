//! Migration handshake between edge nodes
//!
//! Before a task is sent to a peer edge node the two sides agree on the
//! transfer. A refused handshake makes the orchestrator fall back to the
//! cloud.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{NodeId, Task};

/// Negotiates a task transfer between two nodes
pub trait MigrationProtocol {
    /// Returns true when `to` accepts the task
    fn handshake(&mut self, task: &Task, from: NodeId, to: NodeId) -> bool;
}

/// Every handshake succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAccept;

impl MigrationProtocol for AlwaysAccept {
    fn handshake(&mut self, _task: &Task, _from: NodeId, _to: NodeId) -> bool {
        true
    }
}

/// Handshakes fail independently with a fixed probability
#[derive(Debug, Clone)]
pub struct LossyMigration {
    failure_rate: f64,
    rng: StdRng,
}

impl LossyMigration {
    /// `failure_rate` is clamped to 0..1
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl MigrationProtocol for LossyMigration {
    fn handshake(&mut self, _task: &Task, _from: NodeId, _to: NodeId) -> bool {
        !self.rng.gen_bool(self.failure_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecurityLevel;

    fn task() -> Task {
        Task::new("d-0", "d", 100.0, 100.0, 0.5, SecurityLevel::Low, 0.0)
    }

    #[test]
    fn test_lossy_extremes() {
        let mut never = LossyMigration::new(0.0, 1);
        let mut always = LossyMigration::new(1.0, 1);
        for _ in 0..100 {
            assert!(never.handshake(&task(), NodeId(0), NodeId(1)));
            assert!(!always.handshake(&task(), NodeId(0), NodeId(1)));
        }
    }

    #[test]
    fn test_lossy_is_seeded() {
        let mut a = LossyMigration::new(0.5, 42);
        let mut b = LossyMigration::new(0.5, 42);
        let ra: Vec<bool> = (0..64).map(|_| a.handshake(&task(), NodeId(0), NodeId(1))).collect();
        let rb: Vec<bool> = (0..64).map(|_| b.handshake(&task(), NodeId(0), NodeId(1))).collect();
        assert_eq!(ra, rb);
        assert!(ra.iter().any(|ok| *ok) && ra.iter().any(|ok| !*ok));
    }

    #[test]
    fn test_failure_rate_is_clamped() {
        assert_eq!(LossyMigration::new(3.0, 0).failure_rate(), 1.0);
        assert_eq!(LossyMigration::new(-1.0, 0).failure_rate(), 0.0);
    }
}
