//! IoT devices: task generation and mobility
//!
//! Randomness is always injected by the caller so that a run seeded once is
//! reproducible end to end.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Area, NodeId, Point, SecurityLevel, Task, TaskId};

/// Demand profile of one application type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AppProfile {
    pub cpu_demand: f64,
    pub network_demand: f64,
    pub delay_sensitivity: f64,
    #[serde(default)]
    pub security_level: SecurityLevel,
}

impl AppProfile {
    pub const fn new(
        cpu_demand: f64,
        network_demand: f64,
        delay_sensitivity: f64,
        security_level: SecurityLevel,
    ) -> Self {
        Self { cpu_demand, network_demand, delay_sensitivity, security_level }
    }
}

/// Built-in application types, from light and latency-critical to heavy batch
pub const APP_PROFILES: [AppProfile; 4] = [
    AppProfile::new(3000.0, 1500.0, 0.9, SecurityLevel::Low),
    AppProfile::new(6000.0, 2500.0, 0.7, SecurityLevel::Low),
    AppProfile::new(10000.0, 3500.0, 0.5, SecurityLevel::Medium),
    AppProfile::new(15000.0, 5000.0, 0.1, SecurityLevel::High),
];

/// Relative jitter applied to cpu and network demand
pub const DEMAND_JITTER: f64 = 0.10;

/// Minimal view of an edge node for proximity search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeLocation {
    pub id: NodeId,
    pub location: Point,
}

/// A mobile IoT device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub device_type: u32,
    pub location: Point,
    pub mobility_speed: f64,
    pub battery_level: f64,     // 0..1
    generated: Vec<TaskId>,
    next_sequence: u64,
}

impl Device {
    pub fn new(id: impl Into<String>, device_type: u32, location: Point, mobility_speed: f64) -> Self {
        Self {
            id: id.into(),
            device_type,
            location,
            mobility_speed,
            battery_level: 1.0,
            generated: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Set battery level (clamped to 0..1)
    pub fn with_battery(mut self, level: f64) -> Self {
        self.battery_level = level.clamp(0.0, 1.0);
        self
    }

    /// Ids of every task this device has generated, oldest first
    pub fn generated_tasks(&self) -> &[TaskId] {
        &self.generated
    }

    /// Generate a task from the built-in profiles
    pub fn generate_task<R: Rng + ?Sized>(&mut self, app_type: usize, now: f64, rng: &mut R) -> Task {
        self.generate_task_from(&APP_PROFILES, app_type, now, rng)
    }

    /// Generate a task from a profile table.
    ///
    /// An out-of-range `app_type` picks a profile uniformly at random.
    /// `profiles` must not be empty.
    pub fn generate_task_from<R: Rng + ?Sized>(
        &mut self,
        profiles: &[AppProfile],
        app_type: usize,
        now: f64,
        rng: &mut R,
    ) -> Task {
        let profile = match profiles.get(app_type) {
            Some(p) => *p,
            None => profiles[rng.gen_range(0..profiles.len())],
        };

        let cpu_demand = profile.cpu_demand * rng.gen_range(1.0 - DEMAND_JITTER..=1.0 + DEMAND_JITTER);
        let network_demand =
            profile.network_demand * rng.gen_range(1.0 - DEMAND_JITTER..=1.0 + DEMAND_JITTER);

        let id = format!("{}-{}", self.id, self.next_sequence);
        self.next_sequence += 1;
        self.generated.push(id.clone());

        Task::new(
            id,
            self.id.clone(),
            cpu_demand,
            network_demand,
            profile.delay_sensitivity,
            profile.security_level,
            now,
        )
    }

    /// Nearest node by Euclidean distance; first one wins on ties
    pub fn find_nearest_edge_node(&self, nodes: &[NodeLocation]) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for node in nodes {
            let distance = self.location.distance_to(&node.location);
            match best {
                Some((_, d)) if d <= distance => {}
                _ => best = Some((node.id, distance)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// One random-walk step of at most `mobility_speed` per axis
    pub fn update_location<R: Rng + ?Sized>(&mut self, area: &Area, rng: &mut R) {
        let speed = self.mobility_speed.abs();
        let dx = rng.gen_range(-speed..=speed);
        let dy = rng.gen_range(-speed..=speed);
        self.location = area.clamp(Point::new(self.location.x + dx, self.location.y + dy));
    }
}
