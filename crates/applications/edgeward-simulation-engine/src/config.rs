//! Simulation configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes:
//!
//! ```json
//! { "seed": 7, "horizon_ticks": 500, "devices": { "count": 50 } }
//! ```

use std::path::Path;

use edgeward_core::{
    APP_PROFILES, AppProfile, Area, CloudNodeSpec, DistanceLinkModel, EdgeNodeSpec,
    LinearEnergyModel, Point, ResourceType,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Edge tier layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    pub count: usize,
    pub low_tier_mips: f64,
    pub high_tier_mips: f64,
    pub ram_mb: u64,
    pub storage_mb: u64,
    /// Every n-th node (1-based) is high tier; 0 means none
    pub high_tier_every: usize,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            count: 4,
            low_tier_mips: 4000.0,
            high_tier_mips: 8000.0,
            ram_mb: 8192,
            storage_mb: 131_072,
            high_tier_every: 2,
        }
    }
}

impl EdgeConfig {
    fn resource_type(&self, index: usize) -> ResourceType {
        if self.high_tier_every > 0 && (index + 1) % self.high_tier_every == 0 {
            ResourceType::High
        } else {
            ResourceType::Low
        }
    }

    /// Node specs laid out on a regular grid over the area
    pub fn node_specs(&self, area: &Area) -> Vec<EdgeNodeSpec> {
        if self.count == 0 {
            return Vec::new();
        }
        let cols = (self.count as f64).sqrt().ceil() as usize;
        let rows = self.count.div_ceil(cols);
        let cell_w = area.width / cols as f64;
        let cell_h = area.height / rows as f64;

        (0..self.count)
            .map(|i| {
                let (row, col) = (i / cols, i % cols);
                let resource_type = self.resource_type(i);
                EdgeNodeSpec {
                    location: Point::new((col as f64 + 0.5) * cell_w, (row as f64 + 0.5) * cell_h),
                    capacity_mips: match resource_type {
                        ResourceType::Low => self.low_tier_mips,
                        ResourceType::High => self.high_tier_mips,
                    },
                    ram_mb: self.ram_mb,
                    storage_mb: self.storage_mb,
                    resource_type,
                }
            })
            .collect()
    }
}

/// Cloud data centre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudConfig {
    pub capacity_mips: f64,
    pub bandwidth_kbps: f64,
    pub wan_latency_ms: f64,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            capacity_mips: 40_000.0,
            bandwidth_kbps: 100_000.0,
            wan_latency_ms: 50.0,
        }
    }
}

impl CloudConfig {
    pub fn node_spec(&self) -> CloudNodeSpec {
        CloudNodeSpec {
            capacity_mips: self.capacity_mips,
            bandwidth_kbps: self.bandwidth_kbps,
            wan_latency_ms: self.wan_latency_ms,
        }
    }
}

/// Device population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub count: usize,
    pub mobility_speed: f64,
    pub mobility_interval_ticks: u64,
    /// Per device, per tick
    pub task_probability: f64,
    pub battery_min: f64,
    pub battery_max: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            count: 20,
            mobility_speed: 5.0,
            mobility_interval_ticks: 1,
            task_probability: 0.3,
            battery_min: 0.1,
            battery_max: 1.0,
        }
    }
}

/// A scripted edge node outage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledFailure {
    pub tick: u64,
    /// Index into the edge node list
    pub node_index: usize,
    pub duration_ticks: u64,
}

/// Fault and attack injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultConfig {
    pub migration_failure_rate: f64,
    /// Per healthy edge node, per tick
    pub node_failure_rate: f64,
    pub recovery_delay_ticks: u64,
    pub checkpointing: bool,
    /// Probability that a generated task is modified in transit
    pub tamper_rate: f64,
    pub scheduled_failures: Vec<ScheduledFailure>,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            migration_failure_rate: 0.05,
            node_failure_rate: 0.001,
            recovery_delay_ticks: 50,
            checkpointing: true,
            tamper_rate: 0.01,
            scheduled_failures: Vec::new(),
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub horizon_ticks: u64,
    pub tick_duration_ms: f64,
    pub area: Area,
    pub edge: EdgeConfig,
    pub cloud: CloudConfig,
    pub devices: DeviceConfig,
    pub app_profiles: Vec<AppProfile>,
    pub link: DistanceLinkModel,
    pub energy: LinearEnergyModel,
    pub faults: FaultConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            horizon_ticks: 1000,
            tick_duration_ms: 1000.0,
            area: Area::default(),
            edge: EdgeConfig::default(),
            cloud: CloudConfig::default(),
            devices: DeviceConfig::default(),
            app_profiles: APP_PROFILES.to_vec(),
            link: DistanceLinkModel::default(),
            energy: LinearEnergyModel::default(),
            faults: FaultConfig::default(),
        }
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(SimulationError::config(format!("{} must be in [0, 1], got {}", name, p)))
    }
}

fn check_positive(name: &str, v: f64) -> Result<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(SimulationError::config(format!("{} must be positive, got {}", name, v)))
    }
}

impl SimulationConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_positive("tick_duration_ms", self.tick_duration_ms)?;
        check_positive("area.width", self.area.width)?;
        check_positive("area.height", self.area.height)?;
        check_positive("edge.low_tier_mips", self.edge.low_tier_mips)?;
        check_positive("edge.high_tier_mips", self.edge.high_tier_mips)?;
        check_positive("cloud.capacity_mips", self.cloud.capacity_mips)?;

        if self.cloud.wan_latency_ms < 0.0 {
            return Err(SimulationError::config("cloud.wan_latency_ms must not be negative"));
        }
        if self.devices.mobility_speed < 0.0 {
            return Err(SimulationError::config("devices.mobility_speed must not be negative"));
        }

        check_probability("devices.task_probability", self.devices.task_probability)?;
        check_probability("devices.battery_min", self.devices.battery_min)?;
        check_probability("devices.battery_max", self.devices.battery_max)?;
        if self.devices.battery_min > self.devices.battery_max {
            return Err(SimulationError::config(format!(
                "devices.battery_min ({}) exceeds battery_max ({})",
                self.devices.battery_min, self.devices.battery_max
            )));
        }

        check_probability("faults.migration_failure_rate", self.faults.migration_failure_rate)?;
        check_probability("faults.node_failure_rate", self.faults.node_failure_rate)?;
        check_probability("faults.tamper_rate", self.faults.tamper_rate)?;
        for failure in &self.faults.scheduled_failures {
            if failure.node_index >= self.edge.count {
                return Err(SimulationError::config(format!(
                    "scheduled failure targets edge node {} but only {} exist",
                    failure.node_index, self.edge.count
                )));
            }
        }

        if self.app_profiles.is_empty() {
            return Err(SimulationError::config("app_profiles must not be empty"));
        }
        for (i, profile) in self.app_profiles.iter().enumerate() {
            check_positive(&format!("app_profiles[{}].cpu_demand", i), profile.cpu_demand)?;
            check_probability(
                &format!("app_profiles[{}].delay_sensitivity", i),
                profile.delay_sensitivity,
            )?;
            if profile.network_demand < 0.0 {
                return Err(SimulationError::config(format!(
                    "app_profiles[{}].network_demand must not be negative",
                    i
                )));
            }
        }

        Ok(())
    }
}
