//! System-wide statistics
//!
//! Counters live in [`StatisticsAggregator`] and only change through its
//! methods. Service-time means are derived from the nodes' completed lists
//! when a snapshot is taken.

use serde::{Deserialize, Serialize};

use crate::types::{ExecutionLocation, Task};

/// Counters maintained by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsAggregator {
    decisions_local_edge: u64,
    decisions_other_edge: u64,
    decisions_cloud: u64,
    successful_migrations: u64,
    failed_migrations: u64,
    security_incidents: u64,
    recovered_tasks: u64,
    failed_tasks: u64,
    dropped_tasks: u64,
    handovers: u64,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&mut self, decision: ExecutionLocation) {
        match decision {
            ExecutionLocation::LocalEdge => self.decisions_local_edge += 1,
            ExecutionLocation::OtherEdge => self.decisions_other_edge += 1,
            ExecutionLocation::Cloud => self.decisions_cloud += 1,
        }
    }

    pub fn record_migration(&mut self, success: bool) {
        if success {
            self.successful_migrations += 1;
        } else {
            self.failed_migrations += 1;
        }
    }

    pub fn record_security_incident(&mut self) {
        self.security_incidents += 1;
    }

    pub fn record_recovered(&mut self) {
        self.recovered_tasks += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed_tasks += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped_tasks += 1;
    }

    pub fn record_handover(&mut self) {
        self.handovers += 1;
    }

    pub fn successful_migrations(&self) -> u64 {
        self.successful_migrations
    }

    pub fn failed_migrations(&self) -> u64 {
        self.failed_migrations
    }

    pub fn security_incidents(&self) -> u64 {
        self.security_incidents
    }

    pub fn recovered_tasks(&self) -> u64 {
        self.recovered_tasks
    }

    pub fn dropped_tasks(&self) -> u64 {
        self.dropped_tasks
    }

    /// Build a snapshot from the counters and the completed tasks
    pub fn snapshot<'a>(
        &self,
        completed: impl IntoIterator<Item = &'a Task>,
        edge_utilizations: &[f64],
        cloud_utilization: f64,
    ) -> SystemStatistics {
        let mut sums = [0.0_f64; 3];
        let mut counts = [0_u64; 3];

        for task in completed {
            let (Some(location), Some(service)) = (task.execution_location, task.service_time())
            else {
                continue;
            };
            let slot = slot(location);
            sums[slot] += service;
            counts[slot] += 1;
        }

        let mean = |i: usize| if counts[i] == 0 { 0.0 } else { sums[i] / counts[i] as f64 };

        let avg_edge_utilization_pct = if edge_utilizations.is_empty() {
            0.0
        } else {
            edge_utilizations.iter().sum::<f64>() / edge_utilizations.len() as f64
        };

        SystemStatistics {
            local_edge_service_time_ms: mean(0),
            other_edge_service_time_ms: mean(1),
            cloud_service_time_ms: mean(2),
            completed_local_edge: counts[0],
            completed_other_edge: counts[1],
            completed_cloud: counts[2],
            avg_edge_utilization_pct,
            cloud_utilization_pct: cloud_utilization,
            decisions_local_edge: self.decisions_local_edge,
            decisions_other_edge: self.decisions_other_edge,
            decisions_cloud: self.decisions_cloud,
            successful_migrations: self.successful_migrations,
            failed_migrations: self.failed_migrations,
            security_incidents: self.security_incidents,
            recovered_tasks: self.recovered_tasks,
            failed_tasks: self.failed_tasks,
            dropped_tasks: self.dropped_tasks,
            handovers: self.handovers,
        }
    }
}

fn slot(location: ExecutionLocation) -> usize {
    match location {
        ExecutionLocation::LocalEdge => 0,
        ExecutionLocation::OtherEdge => 1,
        ExecutionLocation::Cloud => 2,
    }
}

/// Snapshot of system-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStatistics {
    /// Mean service time per execution location (ms)
    pub local_edge_service_time_ms: f64,
    pub other_edge_service_time_ms: f64,
    pub cloud_service_time_ms: f64,

    pub completed_local_edge: u64,
    pub completed_other_edge: u64,
    pub completed_cloud: u64,

    pub avg_edge_utilization_pct: f64,
    pub cloud_utilization_pct: f64,

    pub decisions_local_edge: u64,
    pub decisions_other_edge: u64,
    pub decisions_cloud: u64,

    pub successful_migrations: u64,
    pub failed_migrations: u64,
    pub security_incidents: u64,
    pub recovered_tasks: u64,
    pub failed_tasks: u64,
    pub dropped_tasks: u64,
    pub handovers: u64,
}

impl SystemStatistics {
    pub fn completed_tasks(&self) -> u64 {
        self.completed_local_edge + self.completed_other_edge + self.completed_cloud
    }
}

/// Per-tick statistics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickStatistics {
    pub time_step: u64,
    pub local_edge_service_time_ms: f64,
    pub other_edge_service_time_ms: f64,
    pub cloud_service_time_ms: f64,
    pub avg_edge_utilization_pct: f64,
    pub cloud_utilization_pct: f64,
}

impl TickStatistics {
    pub fn from_snapshot(time_step: u64, stats: &SystemStatistics) -> Self {
        Self {
            time_step,
            local_edge_service_time_ms: stats.local_edge_service_time_ms,
            other_edge_service_time_ms: stats.other_edge_service_time_ms,
            cloud_service_time_ms: stats.cloud_service_time_ms,
            avg_edge_utilization_pct: stats.avg_edge_utilization_pct,
            cloud_utilization_pct: stats.cloud_utilization_pct,
        }
    }
}
